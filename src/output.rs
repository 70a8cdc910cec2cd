//! Output file naming and writing. One file per exported entry, flat in the output folder.

use crate::model::Entry;
use crate::wallabag::ExportFormat;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to create output file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Can't write file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Last `/`-separated segment of `title`, ignoring trailing separators.
fn last_segment(title: &str) -> &str {
    let trimmed = title.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// File stem for an entry: last path segment of the title with every `:` removed.
/// Titles that reduce to nothing usable fall back to `entry-{id}`.
pub fn file_stem(entry: &Entry) -> String {
    let stem = last_segment(entry.title_or_empty()).replace(':', "");
    match stem.as_str() {
        "" | "." | ".." => format!("entry-{}", entry.id),
        _ => stem,
    }
}

/// `<out_dir>/<stem>.<ext>` for one entry.
pub fn output_path(out_dir: &Path, entry: &Entry, format: ExportFormat) -> PathBuf {
    out_dir.join(format!("{}.{}", file_stem(entry), format.extension()))
}

/// Create or truncate `path` and write `bytes`. The file is closed before returning.
/// A partially written file is left in place on error.
pub fn write_export(path: &Path, bytes: &[u8]) -> Result<usize, OutputError> {
    let mut file = File::create(path).map_err(|e| OutputError::Create {
        path: path.to_path_buf(),
        source: e,
    })?;
    file.write_all(bytes)
        .and_then(|()| file.flush())
        .map_err(|e| OutputError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(bytes.len())
}
