//! Core types for bulletpack-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`PackError`] - Error types for build and packaging operations
//! - [`Platform`] - Target platform selection (iOS or macOS)
//! - [`BuildTarget`] - One cmake/xcodebuild pass and the architectures it produces
//! - [`PackConfig`] / [`ToolPaths`] - Immutable run configuration
//! - [`PackageResult`] - Output from a successful packaging run

use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Error types for bulletpack-sdk operations.
///
/// Every external tool failure is fatal: the pipeline stops at the first
/// error and leaves its working directory behind for inspection.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// An I/O error without further context.
    #[error("I/O error: {0}. Check file paths and permissions")]
    Io(#[from] std::io::Error),

    /// A filesystem operation on a known path failed.
    #[error("Failed to {action} {}: {source}", .path.display())]
    Fs {
        /// What was being attempted (e.g. "create directory").
        action: &'static str,
        /// The path the operation was applied to.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An external tool could not be started.
    #[error("Failed to start {tool}.\n\nError: {source}\n\nEnsure {tool} is installed and available on PATH.")]
    ToolSpawn {
        /// Program name of the tool.
        tool: String,
        /// The spawn error.
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully.
    #[error("{tool} failed.\n\nExit status: {status}\n\nStdout:\n{stdout}\n\nStderr:\n{stderr}")]
    Tool {
        /// Program name of the tool.
        tool: String,
        /// Rendered exit status.
        status: String,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// A per-architecture copy of a library is missing at merge time.
    ///
    /// This happens when one of the builds produced no file for a library
    /// that another build did produce.
    #[error(
        "Cannot create fat library {library}: the {arch} slice {} does not exist.\n\n\
         The {arch} build did not produce this library; check its xcodebuild output.",
        .path.display()
    )]
    MissingSlice {
        /// Library base name (e.g. `libLinearMath.a`).
        library: String,
        /// Architecture whose slice is missing.
        arch: String,
        /// Expected path of the slice.
        path: PathBuf,
    },

    /// Walking a directory tree failed.
    #[error("Failed to walk directory tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// Writing the zip archive failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Any other build failure.
    #[error("build error: {0}")]
    Build(String),
}

impl PackError {
    /// Returns a closure that wraps an [`std::io::Error`] with the action and path.
    ///
    /// ```
    /// use bulletpack_sdk::PackError;
    /// use std::path::Path;
    ///
    /// let path = Path::new("/nonexistent/dir/file");
    /// let err = std::fs::read(path).map_err(PackError::fs("read", path)).unwrap_err();
    /// assert!(err.to_string().starts_with("Failed to read /nonexistent/dir/file"));
    /// ```
    pub fn fs(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> PackError {
        let path = path.to_path_buf();
        move |source| PackError::Fs {
            action,
            path,
            source,
        }
    }
}

/// Target platform for the third party package.
///
/// # Example
///
/// ```
/// use bulletpack_sdk::Platform;
///
/// let platform: Platform = "iOS".parse().unwrap();
/// assert_eq!(platform, Platform::Ios);
/// assert_eq!(platform.as_str(), "ios");
///
/// assert_eq!("osx".parse::<Platform>().unwrap(), Platform::Macos);
/// assert!("android".parse::<Platform>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// iOS device and simulator slices merged into fat libraries.
    Ios,
    /// A single macOS slice, libraries shipped as built.
    Macos,
}

impl Platform {
    /// Returns the command-line spelling of the platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Macos => "osx",
        }
    }

    /// Name of the xcodebuild output folder that holds the libraries of a
    /// single-architecture build.
    pub fn release_dir(&self) -> &'static str {
        match self {
            Platform::Ios => "Release-iphonesimulator",
            Platform::Macos => "Release",
        }
    }
}

impl FromStr for Platform {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "osx" | "macos" => Ok(Platform::Macos),
            other => Err(PackError::Config(format!(
                "unknown platform '{}'; expected 'ios' or 'osx'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cmake + xcodebuild pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTarget {
    /// Platform name handed to the toolchain (`IOS_PLATFORM`), also used
    /// as the build directory name.
    pub name: &'static str,
    /// SDK passed to xcodebuild on iOS.
    pub sdk: Option<&'static str>,
    /// Architecture labels the build produces. The label is appended to
    /// every extracted library file name.
    pub archs: &'static [&'static str],
}

/// Program names (or paths) of the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// Build-file generator.
    pub cmake: String,
    /// IDE build tool.
    pub xcodebuild: String,
    /// Multi-architecture merge utility.
    pub lipo: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            cmake: "cmake".to_string(),
            xcodebuild: "xcodebuild".to_string(),
            lipo: "lipo".to_string(),
        }
    }
}

/// Lowest iOS version the libraries are built for.
pub const DEFAULT_IOS_DEPLOYMENT_TARGET: &str = "8.0";

/// Lowest macOS version the libraries are built for.
pub const DEFAULT_MACOS_DEPLOYMENT_TARGET: &str = "10.12";

/// Toolchain file, relative to the source directory.
pub const DEFAULT_TOOLCHAIN_FILE: &str = "ios.toolchain.cmake";

/// Header root, relative to the source directory.
pub const DEFAULT_HEADERS_DIR: &str = "src";

/// Run configuration. Built once at startup and read-only afterwards.
///
/// # Example
///
/// ```
/// use bulletpack_sdk::{PackConfig, Platform};
///
/// let config = PackConfig::new(Platform::Ios, "/src/bullet3", "/out", "Bullet-2.86.1-iOS");
/// assert_eq!(config.headers_dir, std::path::Path::new("/src/bullet3/src"));
/// assert_eq!(config.ios_deployment_target, "8.0");
/// assert!(!config.enable_bitcode);
/// ```
#[derive(Debug, Clone)]
pub struct PackConfig {
    /// Platform to build for.
    pub platform: Platform,
    /// Root of the Bullet source tree (contains `CMakeLists.txt`).
    pub source_dir: PathBuf,
    /// Where the zip and manifest are copied at the end.
    pub output_dir: PathBuf,
    /// Archive base name; also the top-level directory inside the zip.
    pub third_party_name: String,
    /// Embed bitcode (iOS only).
    pub enable_bitcode: bool,
    /// Build Release with `-Oz`.
    pub size_optimized: bool,
    /// `IOS_DEPLOYMENT_TARGET` passed to the toolchain.
    pub ios_deployment_target: String,
    /// `CMAKE_OSX_DEPLOYMENT_TARGET` for macOS builds.
    pub macos_deployment_target: String,
    /// cmake toolchain file used for iOS builds.
    pub toolchain_file: PathBuf,
    /// Header tree copied into `include/`.
    pub headers_dir: PathBuf,
    /// External tool programs.
    pub tools: ToolPaths,
    /// Keep the working directory after a successful run.
    pub keep_working_dir: bool,
}

impl PackConfig {
    /// Creates a configuration with default deployment targets and tool names.
    pub fn new(
        platform: Platform,
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        third_party_name: impl Into<String>,
    ) -> Self {
        let source_dir = source_dir.into();
        Self {
            platform,
            toolchain_file: source_dir.join(DEFAULT_TOOLCHAIN_FILE),
            headers_dir: source_dir.join(DEFAULT_HEADERS_DIR),
            source_dir,
            output_dir: output_dir.into(),
            third_party_name: third_party_name.into(),
            enable_bitcode: false,
            size_optimized: false,
            ios_deployment_target: DEFAULT_IOS_DEPLOYMENT_TARGET.to_string(),
            macos_deployment_target: DEFAULT_MACOS_DEPLOYMENT_TARGET.to_string(),
            tools: ToolPaths::default(),
            keep_working_dir: false,
        }
    }
}

/// Result of a successful packaging run.
#[derive(Debug, Clone)]
pub struct PackageResult {
    /// `<output_dir>/<name>.zip`
    pub archive_path: PathBuf,
    /// `<output_dir>/<name>.ThirdParty.xml`
    pub manifest_path: PathBuf,
    /// Distinct library file names found in the build output.
    pub libraries: Vec<String>,
    /// Working directory, when it was kept.
    pub working_dir: Option<PathBuf>,
}
