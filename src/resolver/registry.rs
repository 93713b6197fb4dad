//! Priority-ordered backend chain with the fallback loop.
//!
//! The [`Resolver`] owns the registered backends and tries them one after the
//! other until one produces a record with media.

use tracing::{debug, info, warn};

use super::normalize::annotate_description;
use super::{AttemptOutcome, Backend, BackendFailure, ResolveError, Resolution};

/// A priority-ordered chain of extraction backends.
///
/// Backends are kept sorted by [`super::BackendPriority`]; within the same
/// priority level, registration order is preserved. Order is fixed once
/// registration is done, so repeated calls with the same input follow the same
/// attempt sequence.
pub struct Resolver {
    backends: Vec<Box<dyn Backend>>,
}

impl Resolver {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    /// Registers a backend and re-establishes priority order.
    #[tracing::instrument(skip(self, backend), fields(backend_name))]
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        tracing::Span::current().record("backend_name", backend.name());
        debug!(
            name = backend.name(),
            priority = ?backend.priority(),
            "Registering backend"
        );
        self.backends.push(backend);
        // Stable sort keeps registration order within a priority level.
        self.backends.sort_by_key(|b| b.priority());
    }

    /// Returns the number of registered backends.
    #[must_use]
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Returns true if no backends are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Backend names in the order they are attempted.
    #[must_use]
    pub fn methods_tried(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    /// Resolves a share URL through the chain.
    ///
    /// 1. Attempts each backend in priority order, strictly one at a time
    /// 2. On `Success` with a downloadable record, stops and returns it
    /// 3. On `Failure`, or a `Success` carrying neither video nor images,
    ///    records the reason and moves on
    /// 4. Fails with every collected reason once the chain is exhausted
    ///
    /// The winning backend's name is returned on [`Resolution::backend`] and
    /// appended to the record's description as a `(<name>)` suffix.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NoBackends` if the chain is empty.
    /// Returns `ResolveError::ResolutionFailed` if every backend fails.
    #[tracing::instrument(skip(self), fields(backends = self.backends.len()))]
    pub async fn download_video(&self, url: &str) -> Result<Resolution, ResolveError> {
        if self.backends.is_empty() {
            return Err(ResolveError::no_backends(url));
        }

        let mut failures = Vec::new();

        for backend in &self.backends {
            debug!(backend = backend.name(), "Trying backend");

            match backend.attempt(url).await {
                AttemptOutcome::Success(mut record) if record.has_media() => {
                    info!(
                        backend = backend.name(),
                        id = %record.id,
                        slideshow = record.is_slideshow(),
                        "Resolution successful"
                    );
                    record.description = annotate_description(&record.description, backend.name());
                    return Ok(Resolution {
                        record,
                        backend: backend.name().to_string(),
                    });
                }
                AttemptOutcome::Success(_) => {
                    debug!(
                        backend = backend.name(),
                        "Backend returned a record without video or images, trying next"
                    );
                    failures.push(BackendFailure::new(
                        backend.name(),
                        "response contained no video or images",
                    ));
                }
                AttemptOutcome::Failure(reason) => {
                    debug!(
                        backend = backend.name(),
                        reason = %reason,
                        "Backend failed, trying next"
                    );
                    failures.push(BackendFailure::new(backend.name(), reason));
                }
            }
        }

        warn!(tried = failures.len(), "All backends failed");
        Err(ResolveError::resolution_failed(url, failures))
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("backend_count", &self.backends.len())
            .field("backends", &self.methods_tried())
            .finish()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}
