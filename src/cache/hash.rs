// src/cache/hash.rs

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Hash of a file's contents (blake3, hex).
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash of an in-memory string, comparable with [`compute_file_hash`].
pub fn content_hash(contents: &str) -> String {
    blake3::hash(contents.as_bytes()).to_hex().to_string()
}
