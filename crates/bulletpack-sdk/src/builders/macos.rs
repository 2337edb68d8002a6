//! macOS build automation
//!
//! macOS has a single slice, so the libraries are taken from the `Release`
//! output folder as built, without lipo.

use std::collections::BTreeSet;

use super::common::BuildContext;
use crate::extract::extract_libs;
use crate::types::{BuildTarget, PackError, Platform};

/// The only macOS target. Its empty label leaves library names unchanged.
pub const MACOS_TARGET: BuildTarget = BuildTarget {
    name: "OSX",
    sdk: None,
    archs: &[""],
};

/// macOS builder.
#[derive(Debug)]
pub struct MacosBuilder<'a> {
    ctx: BuildContext<'a>,
}

impl<'a> MacosBuilder<'a> {
    /// Creates a macOS builder over the given context.
    pub fn new(ctx: BuildContext<'a>) -> Self {
        Self { ctx }
    }

    /// Builds the macOS target and copies its libraries into the staging dir.
    pub fn build(&self) -> Result<BTreeSet<String>, PackError> {
        let build_dir = self.ctx.build_target(&MACOS_TARGET)?;
        let lib_names = extract_libs(
            &build_dir,
            MACOS_TARGET.archs,
            Platform::Macos.release_dir(),
            self.ctx.staging_dir,
        )?;
        tracing::info!(libraries = lib_names.len(), "extracted libraries");
        Ok(lib_names)
    }
}
