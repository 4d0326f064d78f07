use crate::error::{AnalysisError, Result};
use crate::extract::event_files;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rewrites `\r\n` and lone `\r` as `\n`.
///
/// Every line, the last one included, ends with `\n` afterwards. Empty input
/// stays empty.
pub fn normalize_line_endings(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 1);
    let mut bytes = content.iter().copied().peekable();
    let mut line_open = false;
    while let Some(b) = bytes.next() {
        match b {
            b'\r' => {
                bytes.next_if_eq(&b'\n');
                out.push(b'\n');
                line_open = false;
            }
            b'\n' => {
                out.push(b'\n');
                line_open = false;
            }
            other => {
                out.push(other);
                line_open = true;
            }
        }
    }
    if line_open {
        out.push(b'\n');
    }
    out
}

/// Normalizes one file in place. Returns whether its content changed.
pub fn normalize_file(path: &Path) -> Result<bool> {
    let content = std::fs::read(path).map_err(AnalysisError::io(path))?;
    let normalized = normalize_line_endings(&content);
    if normalized == content {
        debug!(path = %path.display(), "already normalized");
        return Ok(false);
    }
    std::fs::write(path, &normalized).map_err(AnalysisError::io(path))?;
    info!(path = %path.display(), "line endings normalized");
    Ok(true)
}

/// Normalizes every event file in `dir`; returns the files that changed.
pub fn normalize_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut changed = Vec::new();
    for path in event_files(dir)? {
        if normalize_file(&path)? {
            changed.push(path);
        }
    }
    Ok(changed)
}
