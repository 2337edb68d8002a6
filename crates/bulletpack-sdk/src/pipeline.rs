//! The packaging pipeline.
//!
//! [`Packager`] runs the stages strictly in order: build every target,
//! extract (and on iOS merge) the libraries, copy headers, zip the package,
//! write the manifest, copy both to the output directory. The first failure
//! aborts the run and leaves the working directory in place.

use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::{BuildContext, IosBuilder, MacosBuilder};
use crate::headers::copy_headers;
use crate::package::{
    PackageLayout, copy_to_output_dir, create_archive, install_libs, manifest_mismatches,
    validate_third_party_name, write_manifest,
};
use crate::tools::{SystemRunner, ToolRunner};
use crate::types::{PackConfig, PackError, PackageResult, Platform};

/// Prefix of the working directory created under the system temp dir.
pub const WORKING_DIR_PREFIX: &str = "bulletpack-";

/// Drives a complete packaging run.
///
/// # Example
///
/// ```no_run
/// use bulletpack_sdk::{PackConfig, Packager, Platform};
///
/// let mut config = PackConfig::new(Platform::Ios, "../bullet3", "dist", "Bullet-2.86.1-iOS");
/// config.size_optimized = true;
///
/// let result = Packager::new(config).build()?;
/// println!("Archive: {}", result.archive_path.display());
/// # Ok::<(), bulletpack_sdk::PackError>(())
/// ```
pub struct Packager {
    config: PackConfig,
    runner: Box<dyn ToolRunner>,
}

impl std::fmt::Debug for Packager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Packager {
    /// Creates a packager that runs the real external tools.
    pub fn new(config: PackConfig) -> Self {
        Self {
            config,
            runner: Box::new(SystemRunner),
        }
    }

    /// Replaces the tool runner.
    pub fn with_runner(mut self, runner: impl ToolRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    /// Runs the pipeline in a fresh working directory under the system temp dir.
    ///
    /// The working directory is removed after a successful run unless
    /// `keep_working_dir` is set, and always left behind on failure.
    pub fn build(&self) -> Result<PackageResult, PackError> {
        let working_dir = tempfile::Builder::new()
            .prefix(WORKING_DIR_PREFIX)
            .keep(true)
            .tempdir()
            .map_err(|e| PackError::Build(format!("Failed to create working directory: {}", e)))?
            .path()
            .to_path_buf();

        println!("Platform: {}", self.config.platform);
        println!("Source directory: {}", self.config.source_dir.display());
        println!("Output directory: {}", self.config.output_dir.display());
        println!("Working directory: {}", working_dir.display());

        match self.build_in(&working_dir) {
            Ok(mut result) => {
                if self.config.keep_working_dir {
                    result.working_dir = Some(working_dir);
                } else {
                    fs::remove_dir_all(&working_dir)
                        .map_err(PackError::fs("remove working directory", &working_dir))?;
                }
                Ok(result)
            }
            Err(err) => {
                tracing::error!(
                    working_dir = %working_dir.display(),
                    "packaging failed; working directory left for inspection"
                );
                Err(err)
            }
        }
    }

    /// Runs the pipeline inside an existing, empty `working_dir`.
    ///
    /// Nothing is cleaned up; the caller owns `working_dir`.
    pub fn build_in(&self, working_dir: &Path) -> Result<PackageResult, PackError> {
        let config = &self.config;
        validate_third_party_name(&config.third_party_name)?;
        validate_source_dir(&config.source_dir)?;

        let layout = PackageLayout::new(working_dir, &config.third_party_name);
        for dir in [&layout.package_dir, &layout.staging_dir] {
            fs::create_dir_all(dir).map_err(PackError::fs("create directory", dir))?;
        }

        let ctx = BuildContext {
            config,
            runner: self.runner.as_ref(),
            working_dir,
            staging_dir: &layout.staging_dir,
        };
        let discovered = match config.platform {
            Platform::Ios => IosBuilder::new(ctx).build()?,
            Platform::Macos => MacosBuilder::new(ctx).build()?,
        };

        for missing in manifest_mismatches(&discovered) {
            tracing::warn!(library = missing, "manifest lists a library the build did not produce");
        }

        let installed = install_libs(&layout.staging_dir, &layout.lib_dir)?;
        tracing::debug!(libraries = ?installed, "installed libraries");

        println!("Copying headers...");
        copy_headers(&config.headers_dir, &layout.include_dir)?;

        println!("Zipping third party directory...");
        create_archive(&layout.package_dir, &layout.archive_path)?;

        println!("Writing third party xml...");
        write_manifest(&layout.manifest_path, &config.third_party_name)?;

        println!("Copying third party files to output directory...");
        let (archive_path, manifest_path) = copy_to_output_dir(&layout, &config.output_dir)?;

        Ok(PackageResult {
            archive_path,
            manifest_path,
            libraries: discovered.into_iter().collect(),
            working_dir: None,
        })
    }
}

/// Validates that `source_dir` is a Bullet source tree cmake can configure.
///
/// # Returns
/// `Ok(())` if the directory exists and contains a `CMakeLists.txt`.
pub fn validate_source_dir(source_dir: &Path) -> Result<(), PackError> {
    if !source_dir.is_dir() {
        return Err(PackError::Config(format!(
            "Source directory does not exist: {}\n\n\
             Run from the Bullet checkout or pass --source-dir.",
            source_dir.display()
        )));
    }

    let cmake_lists: PathBuf = source_dir.join("CMakeLists.txt");
    if !cmake_lists.is_file() {
        return Err(PackError::Config(format!(
            "No CMakeLists.txt found in source directory {}\n\n\
             Expected the root of a Bullet checkout.",
            source_dir.display()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeRunner;
    use tempfile::TempDir;

    fn bullet_checkout(root: &Path) -> PathBuf {
        let source = root.join("bullet3");
        fs::create_dir_all(source.join("src/LinearMath")).unwrap();
        fs::write(source.join("CMakeLists.txt"), "project(BULLET_PHYSICS)").unwrap();
        fs::write(source.join("src/LinearMath/btScalar.h"), "#pragma once").unwrap();
        fs::write(source.join("src/LinearMath/btScalar.cpp"), "").unwrap();
        source
    }

    #[test]
    fn test_validate_source_dir() {
        let temp = TempDir::new().unwrap();
        assert!(validate_source_dir(&temp.path().join("missing")).is_err());

        let err = validate_source_dir(temp.path()).unwrap_err();
        assert!(err.to_string().contains("No CMakeLists.txt"));

        let source = bullet_checkout(temp.path());
        assert!(validate_source_dir(&source).is_ok());
    }

    #[test]
    fn test_build_in_macos() {
        let temp = TempDir::new().unwrap();
        let source = bullet_checkout(temp.path());
        let work = temp.path().join("work");
        fs::create_dir_all(&work).unwrap();
        let config = PackConfig::new(Platform::Macos, &source, temp.path().join("out"), "Foo");
        let packager = Packager::new(config)
            .with_runner(FakeRunner::with_xcode_output(&["libLinearMath.a"]));

        let result = packager.build_in(&work).unwrap();

        assert_eq!(result.libraries, vec!["libLinearMath.a"]);
        assert!(result.archive_path.is_file());
        assert!(result.manifest_path.is_file());
        assert!(work.join("package/Foo/lib/libLinearMath.a").is_file());
        assert!(work.join("package/Foo/include/LinearMath/btScalar.h").is_file());
        assert!(!work.join("package/Foo/include/LinearMath/btScalar.cpp").exists());
        assert!(work.join("build/OSX").is_dir());
    }

    fn archive_entries(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        archive.file_names().map(String::from).collect()
    }

    #[test]
    fn test_names_of_working_subdirs_package_cleanly() {
        for name in ["staging", "OSX", "OS", "SIMULATOR64", "build", "package"] {
            let temp = TempDir::new().unwrap();
            let source = bullet_checkout(temp.path());
            let work = temp.path().join("work");
            fs::create_dir_all(&work).unwrap();
            let config = PackConfig::new(Platform::Macos, &source, temp.path().join("out"), name);
            let packager = Packager::new(config)
                .with_runner(FakeRunner::with_xcode_output(&["libLinearMath.a"]));

            let result = packager.build_in(&work).unwrap();

            let mut entries = archive_entries(&result.archive_path);
            entries.sort();
            let root = format!("{}/", name);
            let include = format!("{}/include/", name);
            let lib = format!("{}/lib/", name);
            assert!(
                entries
                    .iter()
                    .all(|e| *e == root || e.starts_with(&include) || e.starts_with(&lib)),
                "{name}: unexpected entries {entries:?}"
            );
            assert_eq!(
                entries.iter().filter(|e| e.ends_with(".a")).collect::<Vec<_>>(),
                vec![&format!("{}/lib/libLinearMath.a", name)],
                "{name}"
            );
        }
    }

    #[test]
    fn test_build_in_rejects_unusable_names() {
        for name in ["", ".", "..", "a/b", "/abs", "Foo/"] {
            let temp = TempDir::new().unwrap();
            let source = bullet_checkout(temp.path());
            let out = temp.path().join("out");
            let config = PackConfig::new(Platform::Macos, &source, &out, name);
            let runner = FakeRunner::default();
            let packager = Packager::new(config).with_runner(runner);

            let err = packager.build_in(temp.path()).unwrap_err();

            assert!(matches!(err, PackError::Config(ref msg) if msg.contains("invalid third party name")), "{name:?}: {err}");
            assert!(!out.exists(), "{name:?}");
            assert!(!temp.path().join("build").exists(), "{name:?}");
        }
    }

    #[test]
    fn test_build_in_rejects_missing_source() {
        let temp = TempDir::new().unwrap();
        let config = PackConfig::new(Platform::Ios, temp.path().join("nope"), temp.path().join("out"), "Foo");
        let runner = FakeRunner::default();
        let packager = Packager::new(config).with_runner(runner);

        let err = packager.build_in(temp.path()).unwrap_err();
        assert!(matches!(err, PackError::Config(_)));
        assert!(!temp.path().join("out").exists());
    }
}
