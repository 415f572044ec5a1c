//! Rasterization failure taxonomy.
//!
//! Every variant means "this path did not paint anything, pick another one".
//! Degenerate geometry is not an error: it is reported as
//! [`Outcome::Nothing`](crate::composite::Outcome::Nothing).

use thiserror::Error;

/// Why a rasterization call declined or aborted before painting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RasterError {
    /// Reserving an arena (edges, buckets, cells, mask storage) failed.
    #[error("out of memory reserving {requested} {what}")]
    OutOfMemory {
        what: &'static str,
        requested: usize,
    },

    /// The vertical extent, in sample rows, does not fit the bucket index.
    #[error("vertical extent of {height} sample rows is too large")]
    ExtentTooLarge { height: i64 },

    /// The sample grid density is outside the supported range.
    #[error("unsupported sample grid {samples_x}x{samples_y}")]
    InvalidGrid { samples_x: i32, samples_y: i32 },

    /// The operator, format or source is not handled by this backend.
    #[error("not handled here: {0}")]
    Unsupported(&'static str),

    /// The precise path was switched off in the configuration.
    #[error("precise rasterization disabled")]
    Disabled,
}

impl RasterError {
    /// All failures ask the caller to fall back to a general path.
    #[inline]
    pub fn is_fallback(&self) -> bool {
        match self {
            RasterError::OutOfMemory { .. }
            | RasterError::ExtentTooLarge { .. }
            | RasterError::InvalidGrid { .. }
            | RasterError::Unsupported(_)
            | RasterError::Disabled => true,
        }
    }

    pub(crate) fn oom(what: &'static str, requested: usize) -> Self {
        RasterError::OutOfMemory { what, requested }
    }
}
