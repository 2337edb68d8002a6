//! Header tree copy for the package's `include/` directory.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::types::PackError;

/// File extensions shipped in `include/`.
pub const HEADER_EXTENSIONS: [&str; 2] = ["h", "hpp"];

/// Recursively copies `source` to `target`, keeping only header files.
///
/// Directories are always recreated, even when they contain no header, so the
/// nested layout of the source tree is preserved.
///
/// # Returns
/// The number of header files copied.
pub fn copy_headers(source: &Path, target: &Path) -> Result<usize, PackError> {
    if !source.is_dir() {
        return Err(PackError::Build(format!(
            "Header source directory not found: {}\n\n\
             Check --source-dir or the [source] section of bulletpack.toml.",
            source.display()
        )));
    }

    let mut copied = 0;
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| PackError::Build(format!("Failed to compute relative path: {}", e)))?;
        let dest = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(PackError::fs("create directory", &dest))?;
        } else if is_header(entry.path()) {
            fs::copy(entry.path(), &dest).map_err(PackError::fs("copy header to", &dest))?;
            copied += 1;
        }
    }

    tracing::debug!(count = copied, target = %target.display(), "copied headers");
    Ok(copied)
}

/// Whether the file has one of [`HEADER_EXTENSIONS`].
pub fn is_header(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| HEADER_EXTENSIONS.contains(&ext))
}
