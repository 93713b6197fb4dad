//! Error types for share-link resolution.

use std::fmt;

use thiserror::Error;

/// One backend's failure, kept in attempt order for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    /// Backend display name.
    pub backend: String,
    /// Why the backend could not extract.
    pub reason: String,
}

impl BackendFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.reason)
    }
}

/// Errors surfaced by the resolver chain or by backend construction.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The chain has no backends registered.
    #[error("no extraction backends configured for '{input}'")]
    NoBackends {
        /// The input that could not be attempted
        input: String,
    },

    /// Every backend in the chain failed.
    #[error("all backends failed for '{input}': {}", join_failures(.failures))]
    ResolutionFailed {
        /// The input that failed resolution
        input: String,
        /// Per-backend reasons in attempt order
        failures: Vec<BackendFailure>,
    },

    /// A backend's HTTP client could not be built.
    #[error("backend '{backend}' unavailable: {reason}")]
    BackendUnavailable {
        /// Backend display name
        backend: String,
        /// Construction failure
        reason: String,
    },
}

impl ResolveError {
    /// Creates a `NoBackends` error.
    #[must_use]
    pub fn no_backends(input: &str) -> Self {
        Self::NoBackends {
            input: input.to_string(),
        }
    }

    /// Creates a `ResolutionFailed` error from the collected failures.
    #[must_use]
    pub fn resolution_failed(input: &str, failures: Vec<BackendFailure>) -> Self {
        Self::ResolutionFailed {
            input: input.to_string(),
            failures,
        }
    }

    /// Creates a `BackendUnavailable` error.
    #[must_use]
    pub fn backend_unavailable(backend: &str, reason: &str) -> Self {
        Self::BackendUnavailable {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns the per-backend failures for a `ResolutionFailed` error.
    #[must_use]
    pub fn failures(&self) -> &[BackendFailure] {
        match self {
            Self::ResolutionFailed { failures, .. } => failures,
            _ => &[],
        }
    }
}

fn join_failures(failures: &[BackendFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
