//! Build automation for Apple platforms.
//!
//! The builders run cmake and xcodebuild for every target of a platform and
//! leave the resulting static libraries in the staging directory:
//!
//! | Builder | Platform | Targets | Staging output |
//! |---------|----------|---------|----------------|
//! | [`IosBuilder`] | iOS | `OS`, `SIMULATOR`, `SIMULATOR64` | fat libraries merged with lipo |
//! | [`MacosBuilder`] | macOS | `OSX` | libraries as built |
//!
//! The `common` module holds the cmake/xcodebuild command construction shared
//! by both builders.

pub mod common;
pub mod ios;
pub mod macos;

pub use common::{BuildContext, cmake_invocation, xcodebuild_invocation};
pub use ios::{FAT_LIB_ARCHS, IOS_TARGETS, IosBuilder, create_fat_libs};
pub use macos::{MACOS_TARGET, MacosBuilder};
