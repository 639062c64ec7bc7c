use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What to do when the destination directory already holds a file with
/// the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Replace the existing file.
    #[default]
    Overwrite,
    /// Pick a free `stem (N).ext` name.
    Rename,
    /// Leave the source where it is.
    Skip,
}

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Io {
        source: io::Error,
        from: PathBuf,
        to: PathBuf,
    },
    #[error("file name not found for {}", .0.display())]
    MissingFileName(PathBuf),
}

/// Computes where `source` would land, or `None` when the policy skips it.
pub fn resolve_destination(
    target_directory: &Path,
    source: &Path,
    policy: CollisionPolicy,
) -> Result<Option<PathBuf>, MoveError> {
    let candidate = target_directory.join(file_name_of(source)?);
    if !candidate.exists() {
        return Ok(Some(candidate));
    }

    match policy {
        CollisionPolicy::Overwrite => Ok(Some(candidate)),
        CollisionPolicy::Skip => Ok(None),
        CollisionPolicy::Rename => Ok(Some(unique_name(target_directory, source))),
    }
}

/// Renames `source` to `destination`, falling back to copy and delete when
/// the two live on different filesystems.
pub fn move_file(source: &Path, destination: &Path) -> Result<(), MoveError> {
    let io_error = |source_error: io::Error| MoveError::Io {
        source: source_error,
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
    };

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(
                from = %source.display(),
                to = %destination.display(),
                "rename crosses devices, copying instead"
            );
            fs::copy(source, destination).map_err(io_error)?;
            fs::remove_file(source).map_err(io_error)
        }
        Err(error) => Err(io_error(error)),
    }
}

fn file_name_of(source: &Path) -> Result<&std::ffi::OsStr, MoveError> {
    source
        .file_name()
        .ok_or_else(|| MoveError::MissingFileName(source.to_path_buf()))
}

fn unique_name(target_directory: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
        .unwrap_or_else(|| String::from("file"));
    let extension = source.extension().and_then(|ext| ext.to_str());
    let mut index = 1;

    loop {
        let mut name = format!("{} ({})", stem, index);
        if let Some(ext) = extension {
            name.push('.');
            name.push_str(ext);
        }
        let candidate = target_directory.join(name);
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}
