#![allow(dead_code)]

use std::path::Path;

use pipewright::fs::mock::MockFileSystem;

pub use pipewright_test_utils::{init_tracing, with_timeout};

/// An in-memory project rooted at `.`; `files` are given relative to it.
pub fn mock_project(files: &[(&str, &str)]) -> MockFileSystem {
    let fs = MockFileSystem::new();
    for (path, contents) in files {
        fs.add_file(Path::new(".").join(path), contents.as_bytes());
    }
    fs
}

/// Write `files` below `root` on the real filesystem.
pub fn write_project(root: &Path, files: &[(&str, &str)]) -> std::io::Result<()> {
    for (path, contents) in files {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
    }
    Ok(())
}
