use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions considered by the quarantine pass.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

pub fn default_extensions() -> Vec<String> {
    IMAGE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

/// Lists the regular files directly inside `dir`, ordered by file name.
///
/// Subdirectories are neither returned nor descended into.
pub fn list_regular_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Case-insensitive extension match against a lowercase list.
pub fn has_image_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_lowercase();
            extensions.iter().any(|candidate| candidate == &lower)
        })
        .unwrap_or(false)
}
