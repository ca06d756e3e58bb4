use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feed::SeenKeys;

/// SEC-014: Refuse to load seen files larger than this (16 MB).
const MAX_SEEN_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Errors raised while reading or writing a persisted seen set.
#[derive(Debug, Error)]
pub enum SeenStoreError {
    #[error("seen store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt seen file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("seen file {path} is {size} bytes (max {max} bytes)")]
    TooLarge { path: String, size: u64, max: u64 },
}

/// Directory of seen sets, one JSON file per feed source.
///
/// Files are named by the SHA-256 of the source identifier so any string
/// (URL, path) maps to a safe file name.
#[derive(Debug, Clone)]
pub struct SeenStore {
    dir: PathBuf,
}

impl SeenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `source`'s seen set.
    pub fn path_for(&self, source: &str) -> PathBuf {
        let hash = Sha256::digest(source.as_bytes());
        self.dir.join(format!("{:x}.json", hash))
    }

    /// Loads the seen set for `source`. A missing file is an empty set.
    pub fn load(&self, source: &str) -> Result<SeenKeys, SeenStoreError> {
        let path = self.path_for(source);

        match std::fs::metadata(&path) {
            Ok(meta) if meta.len() > MAX_SEEN_FILE_SIZE => {
                return Err(SeenStoreError::TooLarge {
                    path: path.display().to_string(),
                    size: meta.len(),
                    max: MAX_SEEN_FILE_SIZE,
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(source = %source, "No seen file, starting empty");
                return Ok(SeenKeys::new());
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }

        let content = std::fs::read(&path)?;
        let keys: Vec<String> = serde_json::from_slice(&content)?;
        tracing::debug!(source = %source, keys = keys.len(), "Loaded seen set");
        Ok(keys.into_iter().collect())
    }

    /// Writes the seen set for `source` atomically.
    ///
    /// Keys are stored sorted so repeated saves of the same set are
    /// byte-identical.
    pub fn save(&self, source: &str, seen: &SeenKeys) -> Result<(), SeenStoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let mut keys: Vec<&str> = seen.iter().map(String::as_str).collect();
        keys.sort_unstable();
        let content = serde_json::to_vec_pretty(&keys)?;

        let path = self.path_for(source);
        write_atomic(&path, &content)?;
        tracing::debug!(source = %source, keys = keys.len(), "Saved seen set");
        Ok(())
    }
}

/// Write-to-temp-then-rename so a crash never leaves a half-written file.
fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};

    // SEC-009: Randomized temp filename to prevent TOCTOU race conditions
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)?;

    let written = file.write_all(content).and_then(|()| file.sync_all());
    drop(file);

    if let Err(e) = written.and_then(|()| std::fs::rename(&temp_path, path)) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}
