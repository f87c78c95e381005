//! Global configuration options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(doc)]
use crate::array::codec::CodecOptions;

/// Global configuration options for the z5 crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Concurrent Target
/// > default: `1`
///
/// [`CodecOptions::concurrent_target()`] defaults to [`Config::concurrent_target()`].
///
/// The number of workers targeted by array operations spanning multiple chunks.
/// Chunk I/O is sequential with the default of one worker; raise the target globally here or per
/// request through the `_opt` method variants.
///
/// ## Chunk Concurrent Minimum
/// > default: `4`
///
/// For array operations involving multiple chunks, this is the preferred minimum chunk
/// concurrency once a concurrent target above one is in force.
#[derive(Debug)]
pub struct Config {
    concurrent_target: usize,
    chunk_concurrent_minimum: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrent_target: 1,
            chunk_concurrent_minimum: 4,
        }
    }
}

impl Config {
    /// Get the [concurrent target](#concurrent-target) configuration.
    #[must_use]
    pub fn concurrent_target(&self) -> usize {
        self.concurrent_target
    }

    /// Set the [concurrent target](#concurrent-target) configuration.
    pub fn set_concurrent_target(&mut self, concurrent_target: usize) {
        self.concurrent_target = concurrent_target;
    }

    /// Get the [chunk concurrent minimum](#chunk-concurrent-minimum) configuration.
    #[must_use]
    pub fn chunk_concurrent_minimum(&self) -> usize {
        self.chunk_concurrent_minimum
    }

    /// Set the [chunk concurrent minimum](#chunk-concurrent-minimum) configuration.
    pub fn set_chunk_concurrent_minimum(&mut self, concurrent_minimum: usize) {
        self.chunk_concurrent_minimum = concurrent_minimum;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global z5 configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global z5 configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.concurrent_target(), 1);
        assert_eq!(config.chunk_concurrent_minimum(), 4);
    }
}
