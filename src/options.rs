//! Per-request options.
//!
//! [`GenerateOptions`] is a builder that threads progress callbacks,
//! cancellation tokens, and reporting cadence through pipeline calls without
//! widening every function signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use thumbsheet::{CancellationToken, GenerateOptions, ProgressCallback, ProgressInfo};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {:.0}%", info.stage, info.percentage);
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let options = GenerateOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Options for one thumbnail request.
///
/// A default-constructed value reports nothing and is never cancelled.
#[derive(Clone)]
pub struct GenerateOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) has_progress: bool,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) batch_size: u64,
}

impl Debug for GenerateOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GenerateOptions")
            .field("has_progress", &self.has_progress)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerateOptions {
    /// Create options with no progress callback, no cancellation, and a
    /// report after every frame.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            has_progress: false,
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self.has_progress = true;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled the pipeline stops before the next frame
    /// or before export and returns
    /// [`ThumbnailError::Cancelled`](crate::ThumbnailError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Report extraction progress every `size` frames instead of every
    /// frame. Clamped to a minimum of 1. The last frame always reports.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// The attached cancellation token, if any.
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
