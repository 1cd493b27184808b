//! Read a unified diff from a file.

use std::path::Path;

use super::DiffError;

/// Read a unified diff from a file path.
///
/// Invalid UTF-8 (e.g. a Latin-1 encoded source file in the diff) is
/// replaced rather than rejected.
pub async fn read_diff_file(path: &Path) -> Result<String, DiffError> {
    if !path.exists() {
        return Err(DiffError::PathNotFound(path.display().to_string()));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(DiffError::FileReadError)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
