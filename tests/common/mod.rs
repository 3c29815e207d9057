//! Common test utilities, fixtures, and mocks
//! This module contains shared functionality used across different test categories

pub mod fixtures;
pub mod mocks;

use std::path::PathBuf;

/// A scratch directory under the system temp dir, unique to one test.
pub fn scratch_dir(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("cadenza-tests-{}-{}", name, std::process::id()));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_dir_is_unique_per_name() {
        assert_ne!(scratch_dir("a"), scratch_dir("b"));
        assert!(scratch_dir("a").starts_with(std::env::temp_dir()));
    }
}
