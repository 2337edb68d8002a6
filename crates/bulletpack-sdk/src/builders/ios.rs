//! iOS build automation
//!
//! Builds the device target and both simulator targets, then merges every
//! library's five thin slices into one fat library with `lipo`.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use super::common::BuildContext;
use crate::extract::extract_libs;
use crate::tools::{Invocation, ToolRunner};
use crate::types::{BuildTarget, PackError, Platform};

/// Device build: three slices in one xcodebuild pass.
pub const IOS_DEVICE: BuildTarget = BuildTarget {
    name: "OS",
    sdk: Some("iphoneos"),
    archs: &["armv7", "armv7s", "arm64"],
};

/// 32-bit simulator build.
pub const IOS_SIMULATOR: BuildTarget = BuildTarget {
    name: "SIMULATOR",
    sdk: Some("iphonesimulator"),
    archs: &["i386"],
};

/// 64-bit simulator build.
pub const IOS_SIMULATOR64: BuildTarget = BuildTarget {
    name: "SIMULATOR64",
    sdk: Some("iphonesimulator"),
    archs: &["x86_64"],
};

/// iOS targets, in build order.
pub const IOS_TARGETS: [BuildTarget; 3] = [IOS_DEVICE, IOS_SIMULATOR, IOS_SIMULATOR64];

/// Slices merged into every fat library, in lipo argument order.
pub const FAT_LIB_ARCHS: [&str; 5] = ["armv7", "armv7s", "arm64", "i386", "x86_64"];

/// iOS builder that handles the build, extraction and merge stages.
#[derive(Debug)]
pub struct IosBuilder<'a> {
    ctx: BuildContext<'a>,
}

impl<'a> IosBuilder<'a> {
    /// Creates an iOS builder over the given context.
    pub fn new(ctx: BuildContext<'a>) -> Self {
        Self { ctx }
    }

    /// Builds every iOS target and leaves fat libraries in the staging dir.
    ///
    /// This performs the following steps:
    /// 1. cmake + xcodebuild for `OS` (armv7, armv7s, arm64)
    /// 2. cmake + xcodebuild for `SIMULATOR` (i386)
    /// 3. cmake + xcodebuild for `SIMULATOR64` (x86_64)
    /// 4. lipo every library's slices into one fat library
    ///
    /// # Returns
    /// The library file names discovered across all three builds.
    pub fn build(&self) -> Result<BTreeSet<String>, PackError> {
        let mut lib_names = BTreeSet::new();
        for target in &IOS_TARGETS {
            let build_dir = self.ctx.build_target(target)?;
            let found = extract_libs(
                &build_dir,
                target.archs,
                Platform::Ios.release_dir(),
                self.ctx.staging_dir,
            )?;
            tracing::info!(target = target.name, libraries = found.len(), "extracted libraries");
            lib_names.extend(found);
        }

        println!("Creating fat libs...");
        create_fat_libs(
            self.ctx.runner,
            &self.ctx.config.tools.lipo,
            self.ctx.staging_dir,
            &lib_names,
            &FAT_LIB_ARCHS,
        )?;

        Ok(lib_names)
    }
}

/// Merges per-architecture slices into fat libraries.
///
/// Everything in `staging_dir` at the time of the call is treated as a thin
/// slice named `<lib_name><arch>`. For each name one `lipo -create` produces
/// `staging_dir/<lib_name>`; once all merges succeed, the thin slices are
/// deleted.
///
/// # Errors
/// [`PackError::MissingSlice`] if any expected slice is absent (nothing is
/// merged for that library), or the lipo failure.
pub fn create_fat_libs(
    runner: &dyn ToolRunner,
    lipo: &str,
    staging_dir: &Path,
    lib_names: &BTreeSet<String>,
    archs: &[&str],
) -> Result<(), PackError> {
    let thin_libs = list_files(staging_dir)?;

    for lib_name in lib_names {
        let inputs: Vec<String> = archs.iter().map(|arch| format!("{}{}", lib_name, arch)).collect();

        for (arch, input) in archs.iter().zip(&inputs) {
            let path = staging_dir.join(input);
            if !path.is_file() {
                return Err(PackError::MissingSlice {
                    library: lib_name.clone(),
                    arch: (*arch).to_string(),
                    path,
                });
            }
        }

        let inv = Invocation::new(lipo, staging_dir)
            .arg("-create")
            .args(&inputs)
            .arg("-output")
            .arg(lib_name);
        runner.run(&inv)?;
    }

    for thin in thin_libs {
        let path = staging_dir.join(&thin);
        fs::remove_file(&path).map_err(PackError::fs("remove thin library", &path))?;
    }

    Ok(())
}

fn list_files(dir: &Path) -> Result<Vec<String>, PackError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(PackError::fs("read directory", dir))? {
        let entry = entry.map_err(PackError::fs("read directory", dir))?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}
