//! Static library discovery in xcodebuild output.
//!
//! xcodebuild lays its output out differently depending on how many
//! architectures a build covers:
//!
//! - With several architectures (the iOS device build), each thin slice is
//!   written next to the object files in a directory named after the
//!   architecture (`.../Objects-normal/arm64/libLinearMath.a`). A fat library
//!   also lands in `Release-iphoneos`, but the slices are already on disk so
//!   they are taken from the per-architecture directories.
//! - With a single architecture (each simulator build, the macOS build) the
//!   libraries are only found in the `Release-iphonesimulator` (or `Release`)
//!   folder, and the sole expected label is applied to them.
//!
//! Every match is copied into the staging directory with the label appended
//! to its file name (`libLinearMath.aarm64`) so that same-named libraries of
//! different architectures do not collide.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::types::PackError;

/// Extension of the files collected from the build output.
pub const STATIC_LIB_EXTENSION: &str = "a";

/// Copies the static libraries of one build into `staging_dir`.
///
/// # Arguments
/// * `build_dir` - cmake/xcodebuild output root to scan
/// * `archs` - architecture labels expected from this build
/// * `release_dir` - output folder name matched when only one label is expected
/// * `staging_dir` - destination of the suffixed copies
///
/// # Returns
/// The distinct library file names found. A build that produced nothing
/// yields an empty set, not an error.
pub fn extract_libs(
    build_dir: &Path,
    archs: &[&str],
    release_dir: &str,
    staging_dir: &Path,
) -> Result<BTreeSet<String>, PackError> {
    fs::create_dir_all(staging_dir).map_err(PackError::fs("create directory", staging_dir))?;

    let mut lib_names = BTreeSet::new();
    for entry in WalkDir::new(build_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(dir_name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(arch) = match_arch_dir(dir_name, archs, release_dir) else {
            continue;
        };

        for lib in fs::read_dir(entry.path()).map_err(PackError::fs("read directory", entry.path()))? {
            let lib = lib.map_err(PackError::fs("read directory", entry.path()))?;
            let path = lib.path();
            if !path.is_file() || !is_static_lib(&path) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let dest = staging_dir.join(format!("{}{}", file_name, arch));
            tracing::debug!(arch, from = %path.display(), to = %dest.display(), "extracting library");
            fs::copy(&path, &dest).map_err(PackError::fs("copy library to", &dest))?;
            lib_names.insert(file_name.to_string());
        }
    }

    if lib_names.is_empty() {
        tracing::warn!(
            build_dir = %build_dir.display(),
            archs = ?archs,
            "no static libraries found in build output"
        );
    }

    Ok(lib_names)
}

/// Returns the label to apply to libraries in a directory called `dir_name`,
/// or `None` if the directory is not an output folder for `archs`.
///
/// ```
/// use bulletpack_sdk::extract::match_arch_dir;
///
/// let device = ["armv7", "armv7s", "arm64"];
/// assert_eq!(match_arch_dir("arm64", &device, "Release-iphonesimulator"), Some("arm64"));
/// assert_eq!(match_arch_dir("Release-iphoneos", &device, "Release-iphonesimulator"), None);
///
/// let sim64 = ["x86_64"];
/// assert_eq!(match_arch_dir("Release-iphonesimulator", &sim64, "Release-iphonesimulator"), Some("x86_64"));
/// assert_eq!(match_arch_dir("x86_64", &sim64, "Release-iphonesimulator"), None);
/// ```
pub fn match_arch_dir<'a>(dir_name: &str, archs: &[&'a str], release_dir: &str) -> Option<&'a str> {
    match archs {
        [] => None,
        [only] => (dir_name == release_dir).then_some(*only),
        _ => archs.iter().find(|arch| **arch == dir_name).copied(),
    }
}

fn is_static_lib(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(STATIC_LIB_EXTENSION)
}
