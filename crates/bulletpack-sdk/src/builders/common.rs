//! Build invocation shared by the iOS and macOS builders.
//!
//! Both platforms generate an Xcode project with cmake and build its
//! `install` scheme in Release. The cmake command always disables the demo,
//! extras and unit-test sub-builds, and pins deployment targets to the lowest
//! versions the consumers link against.

use std::fs;
use std::path::{Path, PathBuf};

use crate::package::BUILD_SUBDIR;
use crate::tools::{Invocation, ToolRunner};
use crate::types::{BuildTarget, PackConfig, PackError, Platform};

/// Project generated by cmake inside each build directory.
pub const XCODE_PROJECT: &str = "BULLET_PHYSICS.xcodeproj";

/// Scheme built by xcodebuild.
pub const XCODE_SCHEME: &str = "install";

/// Configuration built by xcodebuild.
pub const XCODE_CONFIGURATION: &str = "Release";

/// Sub-builds switched off in every cmake run.
const EXCLUDED_FEATURES: [&str; 5] = [
    "BUILD_EXTRAS",
    "BUILD_OPENGL3_DEMOS",
    "BUILD_BULLET2_DEMOS",
    "BUILD_CPU_DEMOS",
    "BUILD_UNIT_TESTS",
];

/// Everything a builder needs for one run.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    /// Run configuration.
    pub config: &'a PackConfig,
    /// Executes cmake, xcodebuild and lipo.
    pub runner: &'a dyn ToolRunner,
    /// Root of the ephemeral working tree.
    pub working_dir: &'a Path,
    /// Where extracted libraries are collected.
    pub staging_dir: &'a Path,
}

impl std::fmt::Debug for BuildContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("config", self.config)
            .field("working_dir", &self.working_dir)
            .field("staging_dir", &self.staging_dir)
            .finish_non_exhaustive()
    }
}

impl BuildContext<'_> {
    /// Build directory of a target: `<working>/build/<target>`.
    pub fn build_dir(&self, target: &BuildTarget) -> PathBuf {
        self.working_dir.join(BUILD_SUBDIR).join(target.name)
    }

    /// Generates and builds one target.
    ///
    /// # Returns
    /// The build directory, ready to be scanned for libraries.
    pub fn build_target(&self, target: &BuildTarget) -> Result<PathBuf, PackError> {
        let build_dir = self.build_dir(target);
        fs::create_dir_all(&build_dir).map_err(PackError::fs("create directory", &build_dir))?;

        println!("Running cmake for {}...", target.name);
        self.runner
            .run(&cmake_invocation(self.config, target, &build_dir))?;

        println!("Running xcodebuild for {}...", target.name);
        self.runner
            .run(&xcodebuild_invocation(self.config, target, &build_dir))?;

        Ok(build_dir)
    }
}

/// Builds the cmake command line for `target`, run inside `build_dir`.
///
/// # Example
///
/// ```
/// use bulletpack_sdk::builders::{cmake_invocation, MACOS_TARGET};
/// use bulletpack_sdk::{PackConfig, Platform};
/// use std::path::Path;
///
/// let config = PackConfig::new(Platform::Macos, "/src/bullet3", "/out", "Bullet");
/// let inv = cmake_invocation(&config, &MACOS_TARGET, Path::new("/tmp/work/OSX"));
/// let args = inv.args_lossy();
/// assert_eq!(&args[..2], ["-G", "Xcode"]);
/// assert!(args.contains(&"-DCMAKE_OSX_DEPLOYMENT_TARGET=10.12".to_string()));
/// assert_eq!(args.last().unwrap(), "/src/bullet3");
/// ```
pub fn cmake_invocation(config: &PackConfig, target: &BuildTarget, build_dir: &Path) -> Invocation {
    let mut inv = Invocation::new(&config.tools.cmake, build_dir).args(["-G", "Xcode"]);

    if config.platform == Platform::Ios {
        let mut toolchain = std::ffi::OsString::from("-DCMAKE_TOOLCHAIN_FILE=");
        toolchain.push(&config.toolchain_file);
        inv = inv.arg(toolchain);
    }

    for feature in EXCLUDED_FEATURES {
        inv = inv.arg(format!("-D{}=0", feature));
    }

    if config.size_optimized {
        inv = inv
            .arg("-DCMAKE_C_FLAGS_RELEASE=-Oz -DNDEBUG")
            .arg("-DCMAKE_CXX_FLAGS_RELEASE=-Oz -DNDEBUG");
    }

    match config.platform {
        Platform::Ios => {
            inv = inv
                .arg(format!("-DENABLE_BITCODE={}", u8::from(config.enable_bitcode)))
                .arg(format!("-DIOS_DEPLOYMENT_TARGET={}", config.ios_deployment_target))
                .arg(format!("-DIOS_PLATFORM={}", target.name));
        }
        Platform::Macos => {
            inv = inv.arg(format!(
                "-DCMAKE_OSX_DEPLOYMENT_TARGET={}",
                config.macos_deployment_target
            ));
        }
    }

    inv.arg(&config.source_dir)
}

/// Builds the xcodebuild command line for the project cmake generated in `build_dir`.
pub fn xcodebuild_invocation(config: &PackConfig, target: &BuildTarget, build_dir: &Path) -> Invocation {
    let mut inv = Invocation::new(&config.tools.xcodebuild, build_dir)
        .arg("-project")
        .arg(build_dir.join(XCODE_PROJECT))
        .args(["-scheme", XCODE_SCHEME, "-configuration", XCODE_CONFIGURATION]);

    if config.platform == Platform::Ios
        && let Some(sdk) = target.sdk
    {
        inv = inv.args(["-sdk", sdk]);
    }

    inv.arg("build")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{IOS_TARGETS, MACOS_TARGET};

    fn ios_config() -> PackConfig {
        PackConfig::new(Platform::Ios, "/src/bullet3", "/out", "Bullet")
    }

    #[test]
    fn test_cmake_ios_device_args() {
        let inv = cmake_invocation(&ios_config(), &IOS_TARGETS[0], Path::new("/work/OS"));
        assert_eq!(inv.program, "cmake");
        assert_eq!(inv.cwd, PathBuf::from("/work/OS"));
        assert_eq!(
            inv.args_lossy(),
            vec![
                "-G",
                "Xcode",
                "-DCMAKE_TOOLCHAIN_FILE=/src/bullet3/ios.toolchain.cmake",
                "-DBUILD_EXTRAS=0",
                "-DBUILD_OPENGL3_DEMOS=0",
                "-DBUILD_BULLET2_DEMOS=0",
                "-DBUILD_CPU_DEMOS=0",
                "-DBUILD_UNIT_TESTS=0",
                "-DENABLE_BITCODE=0",
                "-DIOS_DEPLOYMENT_TARGET=8.0",
                "-DIOS_PLATFORM=OS",
                "/src/bullet3",
            ]
        );
    }

    #[test]
    fn test_cmake_size_optimized_and_bitcode() {
        let mut config = ios_config();
        config.size_optimized = true;
        config.enable_bitcode = true;
        let inv = cmake_invocation(&config, &IOS_TARGETS[2], Path::new("/work/SIMULATOR64"));
        let args = inv.args_lossy();

        assert!(args.contains(&"-DCMAKE_C_FLAGS_RELEASE=-Oz -DNDEBUG".to_string()));
        assert!(args.contains(&"-DCMAKE_CXX_FLAGS_RELEASE=-Oz -DNDEBUG".to_string()));
        assert!(args.contains(&"-DENABLE_BITCODE=1".to_string()));
        assert!(args.contains(&"-DIOS_PLATFORM=SIMULATOR64".to_string()));
    }

    #[test]
    fn test_cmake_macos_has_no_ios_flags() {
        let mut config = PackConfig::new(Platform::Macos, "/src/bullet3", "/out", "Bullet");
        config.enable_bitcode = true;
        let inv = cmake_invocation(&config, &MACOS_TARGET, Path::new("/work/OSX"));
        let args = inv.args_lossy();

        assert!(!args.iter().any(|a| a.starts_with("-DCMAKE_TOOLCHAIN_FILE")));
        assert!(!args.iter().any(|a| a.starts_with("-DENABLE_BITCODE")));
        assert!(!args.iter().any(|a| a.starts_with("-DIOS_")));
        assert!(args.contains(&"-DCMAKE_OSX_DEPLOYMENT_TARGET=10.12".to_string()));
    }

    #[test]
    fn test_xcodebuild_ios_uses_sdk() {
        let inv = xcodebuild_invocation(&ios_config(), &IOS_TARGETS[1], Path::new("/work/SIMULATOR"));
        assert_eq!(
            inv.args_lossy(),
            vec![
                "-project",
                "/work/SIMULATOR/BULLET_PHYSICS.xcodeproj",
                "-scheme",
                "install",
                "-configuration",
                "Release",
                "-sdk",
                "iphonesimulator",
                "build",
            ]
        );
    }

    #[test]
    fn test_xcodebuild_macos_has_no_sdk() {
        let config = PackConfig::new(Platform::Macos, "/src", "/out", "Bullet");
        let inv = xcodebuild_invocation(&config, &MACOS_TARGET, Path::new("/work/OSX"));
        let args = inv.args_lossy();
        assert!(!args.contains(&"-sdk".to_string()));
        assert_eq!(args.last().unwrap(), "build");
    }

    #[test]
    fn test_custom_tool_paths() {
        let mut config = ios_config();
        config.tools.cmake = "/opt/cmake/bin/cmake".into();
        config.tools.xcodebuild = "/usr/bin/xcodebuild".into();
        let cmake = cmake_invocation(&config, &IOS_TARGETS[0], Path::new("/work/OS"));
        let xcode = xcodebuild_invocation(&config, &IOS_TARGETS[0], Path::new("/work/OS"));
        assert_eq!(cmake.tool_name(), "cmake");
        assert_eq!(xcode.program, "/usr/bin/xcodebuild");
    }
}
