//! Bullet Physics third-party packager
//!
//! `bulletpack-sdk` builds the Bullet Physics static libraries for iOS or
//! macOS with cmake and xcodebuild and packages them, together with the
//! public headers, as a zip archive plus a `.ThirdParty.xml` manifest that a
//! downstream build system consumes.
//!
//! # Quick Start
//!
//! ```no_run
//! use bulletpack_sdk::{PackConfig, Packager, Platform};
//!
//! let config = PackConfig::new(Platform::Ios, "bullet3", "dist", "Bullet-2.86.1-iOS");
//! let result = Packager::new(config).build()?;
//!
//! println!("Archive: {}", result.archive_path.display());
//! println!("Manifest: {}", result.manifest_path.display());
//! # Ok::<(), bulletpack_sdk::PackError>(())
//! ```
//!
//! # Architecture
//!
//! A run is a fixed sequence of stages, each failing fast:
//!
//! - **Builders**: cmake + xcodebuild per target; on iOS, lipo merges the
//!   five slices of every library into one fat library
//! - **Extract**: finds the `.a` files in xcodebuild's output tree
//! - **Headers**: copies `.h`/`.hpp` files preserving directory structure
//! - **Package**: zip archive, manifest, and the copy to the output directory
//!
//! External tools run through the [`ToolRunner`] trait so the whole
//! pipeline can be driven without Xcode installed.

pub mod builders;
pub mod extract;
pub mod headers;
pub mod package;
pub mod pipeline;
pub mod tools;
pub mod types;

#[cfg(test)]
mod test_support;

pub use pipeline::{Packager, validate_source_dir};
pub use tools::{Invocation, SystemRunner, ToolRunner};
pub use types::{BuildTarget, PackConfig, PackError, PackageResult, Platform, ToolPaths};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
