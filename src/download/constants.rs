//! Timeouts and buffer limits for media transfers.

/// Default connect timeout for media fetches.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default read timeout; videos can be large.
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Upper bound on the up-front buffer reserved from a `Content-Length` hint.
/// Larger bodies still arrive; the buffer just grows as chunks come in.
pub const MAX_PREALLOC_BYTES: usize = 8 * 1024 * 1024;
