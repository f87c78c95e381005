//! Concurrency utilities for multi-chunk operations.

use crate::config::global_config;

/// Calculate the chunk concurrency limit for an operation over `num_chunks` chunks given a
/// `concurrent_target`.
///
/// A target of one (the default) keeps chunk processing sequential. Above one, the limit is at
/// least the configured chunk concurrent minimum and never exceeds the number of chunks.
#[must_use]
pub fn concurrency_chunks(concurrent_target: usize, num_chunks: usize) -> usize {
    if concurrent_target <= 1 || num_chunks <= 1 {
        1
    } else {
        let chunk_concurrent_minimum =
            std::cmp::min(global_config().chunk_concurrent_minimum(), num_chunks);
        std::cmp::max(
            chunk_concurrent_minimum,
            std::cmp::min(concurrent_target, num_chunks),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_limits() {
        assert_eq!(concurrency_chunks(1, 100), 1);
        assert_eq!(concurrency_chunks(8, 1), 1);
        assert_eq!(concurrency_chunks(8, 100), 8);
        assert_eq!(concurrency_chunks(2, 100), 4); // chunk concurrent minimum
        assert_eq!(concurrency_chunks(200, 10), 10);
    }
}
