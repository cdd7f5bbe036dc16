//! Locations of files shipped in the workspace `config/` directory.

use std::path::{Path, PathBuf};

/// The workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .unwrap_or(manifest_dir)
        .to_path_buf()
}

/// A file under `config/`.
pub fn config_file(name: &str) -> PathBuf {
    workspace_root().join("config").join(name)
}

/// The HLS v2 band map, `config/bandmap.json`.
pub fn bandmap_path() -> PathBuf {
    config_file("bandmap.json")
}
