use std::process::ExitCode;

use bulletpack::Variant;

fn main() -> ExitCode {
    bulletpack::main_with(Variant::PlatformAware)
}
