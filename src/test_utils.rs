//! Shared test fixtures.

use crate::paths::BasePaths;
use tempfile::TempDir;

/// A `BasePaths` rooted in a temporary directory, mimicking the real
/// per-application layout without touching the user's home.
pub fn setup_test_paths(temp_dir: &TempDir) -> BasePaths {
    BasePaths {
        firefox: temp_dir.path().join("firefox"),
        thunderbird: temp_dir.path().join("thunderbird"),
        home: temp_dir.path().to_path_buf(),
        lock_file: temp_dir.path().join("mozmover.lock"),
    }
}
