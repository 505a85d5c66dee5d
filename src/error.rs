use std::io;

use thiserror::Error;

/// The error taxonomy for the sandbox mediation core.
///
/// Every fallible boundary in this crate returns one of these variants
/// rather than `anyhow::Error`, so callers (and tests) can match on the
/// exact failure instead of parsing a message. Wrapper functions never
/// leak these across the guest boundary: they log the variant, then
/// collapse it to the `-1`/`0` convention of the syscall surface.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// A guest pointer, or a `[gptr, gptr+n)` range derived from one,
    /// falls outside `[0, memlen)`.
    #[error("guest pointer {gptr:#x} with length {len} escapes the memory region of size {memlen:#x}")]
    InvalidPointer {
        /// the offending guest offset
        gptr: u64,
        /// the length of the access that was attempted
        len: u64,
        /// the size of the guest's linear memory
        memlen: u64,
    },

    /// The guest-supplied path had no NUL terminator within `PATH_MAX`
    /// bytes, or contained a byte the resolver refuses to accept.
    #[error("path is not valid: {0}")]
    InvalidPath(String),

    /// The path, once normalized, would have left the authorized root.
    #[error("path {0:?} escapes the authorized root")]
    PathEscape(String),

    /// A virtual fd argument was out of `[0, MAX_V)` or unsealed.
    #[error("bad virtual fd {0}")]
    BadFd(i32),

    /// `create_seal` was called with every virtual fd slot occupied.
    #[error("no free virtual fd slots (max {0})")]
    TooManyFds(usize),

    /// The host could not satisfy a resource request, e.g. allocating
    /// the guest's linear memory.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A host primitive (`open`, `read`, ...) itself returned an error.
    #[error("host primitive failed: {0}")]
    HostError(#[from] io::Error),

    /// A value could not be converted between the guest and host
    /// numeric representations (e.g. `i64` offset overflowing `usize`).
    #[error("numeric conversion failed: {0}")]
    Conversion(#[from] std::num::TryFromIntError),

    /// Catch-all for conditions that do not fit the taxonomy above, such
    /// as a misconfigured sandbox (`SandboxConfig` values out of range).
    #[error("{0}")]
    Other(String),
}

/// The `Result` alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Construct a [`SandboxError::Other`] from a format string, the way
/// `anyhow!` would, for conditions that don't warrant a dedicated variant.
macro_rules! new_error {
    ($msg:literal $(,)?) => {
        $crate::error::SandboxError::Other(format!($msg))
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::SandboxError::Other(format!($fmt, $($arg)*))
    };
}
pub(crate) use new_error;

/// Log an error at `warn` level, then return it from the current function.
macro_rules! log_then_return {
    ($err:expr) => {{
        let err: $crate::error::SandboxError = ::std::convert::From::from($err);
        tracing::warn!(error = %err, "wrapper returning error");
        return Err(err);
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        let err = $crate::error::new_error!($fmt $(, $arg)*);
        tracing::warn!(error = %err, "wrapper returning error");
        return Err(err);
    }};
}
pub(crate) use log_then_return;
