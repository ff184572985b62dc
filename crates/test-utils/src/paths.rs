//! Recorded provider responses.
//!
//! Fixtures live in `crates/providers/testdata/`. `TEST_DATA_DIR` overrides
//! the location for recordings kept outside the tree.

use std::path::PathBuf;

const FIXTURE_CRATE: &str = "providers";

fn workspace_root() -> PathBuf {
    // crates/test-utils -> workspace
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest.ancestors().nth(2).map(PathBuf::from).unwrap_or(manifest)
}

/// Directory holding recorded responses.
pub fn testdata_dir() -> PathBuf {
    match std::env::var("TEST_DATA_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => workspace_root().join("crates").join(FIXTURE_CRATE).join("testdata"),
    }
}

/// Path of a fixture if it has been recorded.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    Some(testdata_dir().join(name)).filter(|p| p.is_file())
}

/// Body of a recorded response. Panics naming the fixture when absent.
pub fn load_fixture(name: &str) -> String {
    let path = find_test_file(name).unwrap_or_else(|| panic!("fixture '{}' not found in {:?}", name, testdata_dir()));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {:?}: {}", path, e))
}

/// Scratch directory for config and input files, removed on drop.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}
