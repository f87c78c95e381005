//! Options for chunk encoding, decoding, and multi-chunk operations.

use crate::config::global_config;

/// Per-request options for array store and retrieve operations.
///
/// The default options target a single worker (see
/// [`Config::concurrent_target`](crate::config::Config)); multi-chunk operations then process
/// chunks sequentially. Raise the concurrent target to fan chunk work out over a bounded worker
/// pool.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    concurrent_target: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            concurrent_target: global_config().concurrent_target(),
        }
    }
}

impl CodecOptions {
    /// Create a new [`CodecOptionsBuilder`].
    #[must_use]
    pub fn builder() -> CodecOptionsBuilder {
        CodecOptionsBuilder::new()
    }

    /// Return the concurrent target (the number of workers targeted by multi-chunk operations).
    #[must_use]
    pub fn concurrent_target(&self) -> usize {
        self.concurrent_target
    }

    /// Set the concurrent target.
    pub fn set_concurrent_target(&mut self, concurrent_target: usize) -> &mut Self {
        self.concurrent_target = concurrent_target;
        self
    }
}

/// A builder for [`CodecOptions`].
#[derive(Debug, Clone, Default)]
pub struct CodecOptionsBuilder {
    concurrent_target: Option<usize>,
}

impl CodecOptionsBuilder {
    /// Create a new [`CodecOptionsBuilder`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrent target.
    #[must_use]
    pub fn concurrent_target(mut self, concurrent_target: usize) -> Self {
        self.concurrent_target = Some(concurrent_target);
        self
    }

    /// Build the [`CodecOptions`].
    #[must_use]
    pub fn build(self) -> CodecOptions {
        CodecOptions {
            concurrent_target: self
                .concurrent_target
                .unwrap_or_else(|| global_config().concurrent_target()),
        }
    }
}
