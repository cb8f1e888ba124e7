//! Writing rendered maps to disk.
//!
//! Output is written to a hidden temporary file next to the target and then
//! renamed over it, so a failed run leaves either the previous artifact or
//! the new one, never a truncated page.

use std::fs::{self, File};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use crate::MapDocument;
use crate::html;

/// Errors that can occur while persisting a map.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The output directory could not be created.
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: io::Error,
    },

    /// The temporary file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: io::Error,
    },

    /// The temporary file could not be moved into place.
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// The map data could not be serialized.
    #[error("failed to serialize map data: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Renders `document` and writes it to `path`, replacing any previous file.
///
/// # Errors
///
/// Returns [`WriteError`] if rendering or any filesystem step fails.
pub fn save_document(document: &MapDocument, path: &Path) -> Result<(), WriteError> {
    let page = html::render(document)?;
    write_atomic(path, page.as_bytes())?;
    log::info!(
        "Saved map '{}' ({} layers) to {}",
        document.options().title,
        document.layers().len(),
        path.display()
    );
    Ok(())
}

/// Writes `contents` to `path` via write-then-rename, creating the parent
/// directory if needed.
///
/// # Errors
///
/// * [`WriteError::CreateDir`] if the parent directory cannot be created
/// * [`WriteError::Write`] if the temporary file cannot be written
/// * [`WriteError::Rename`] if the temporary file cannot replace `path`
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), WriteError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let tmp = temp_path(path);
    if let Err(source) = write_synced(&tmp, contents) {
        let _ = fs::remove_file(&tmp);
        return Err(WriteError::Write { path: tmp, source });
    }

    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(WriteError::Rename {
            from: tmp,
            to: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}

fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "map".into(), |n| n.to_string_lossy());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}
