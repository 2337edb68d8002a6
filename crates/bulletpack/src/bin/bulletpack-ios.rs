//! iOS-only front end: `bulletpack-ios output_dir third_party_name`.
//!
//! Unlike `bulletpack`, the output directory is deleted and recreated before
//! the build starts.

use std::process::ExitCode;

use bulletpack::Variant;

fn main() -> ExitCode {
    bulletpack::main_with(Variant::MobileOnly)
}
