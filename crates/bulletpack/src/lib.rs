//! # bulletpack
//!
//! Command-line tool that builds Bullet Physics for iOS or macOS and packages
//! it as a third-party archive (`<name>.zip`) plus manifest
//! (`<name>.ThirdParty.xml`).
//!
//! ## Usage
//!
//! ```bash
//! # From the root of a Bullet checkout
//! bulletpack ios ../ThirdParty Bullet-2.86.1-iOS --size_optimized
//! bulletpack osx ../ThirdParty Bullet-2.86.1-OSX
//!
//! # iOS only; wipes and recreates the output directory first
//! bulletpack-ios ../ThirdParty/ios Bullet-2.86.1-iOS -b
//! ```
//!
//! | Flag | Effect |
//! |------|--------|
//! | `-b`, `--bitcode` | Embed bitcode (iOS) |
//! | `-s`, `--size_optimized` | Build Release with `-Oz` |
//! | `--source-dir <DIR>` | Bullet source root (default: config, `BULLETPACK_SOURCE_DIR`, cwd) |
//! | `--config <FILE>` | Explicit config file instead of `bulletpack.toml` discovery |
//! | `--keep-working-dir` | Keep the temporary build tree after success |
//! | `-v`, `--verbose` | Debug logging, including every external command |
//!
//! A wrong number of positional arguments, or an unknown platform, prints an
//! error and the usage line and exits with status 1.

use anyhow::{Context, Result};
use bulletpack_sdk::package::validate_third_party_name;
use bulletpack_sdk::{PackConfig, PackError, Packager, Platform};
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

pub mod config;

use config::{ConfigResolver, SOURCE_DIR_ENV};

#[derive(Parser, Debug)]
#[command(
    name = "bulletpack",
    author,
    version,
    about = "Build and package Bullet Physics as an iOS/macOS third party",
    long_about = None
)]
pub struct Cli {
    /// [ios|osx] output_dir third_party_name
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,

    #[command(flatten)]
    pub options: BuildOptions,
}

/// Flags shared by both binaries.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Enable bitcode (iOS only)
    #[arg(short = 'b', long)]
    pub bitcode: bool,

    /// Build the Release configuration optimized for size (-Oz)
    #[arg(short = 's', long = "size_optimized", alias = "size-optimized")]
    pub size_optimized: bool,

    /// Root of the Bullet source tree
    #[arg(long, value_name = "DIR")]
    pub source_dir: Option<PathBuf>,

    /// Config file to use instead of discovering bulletpack.toml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keep the temporary working directory after a successful run
    #[arg(long)]
    pub keep_working_dir: bool,

    /// Log every external command
    #[arg(short, long)]
    pub verbose: bool,
}

/// The two command-line front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// `bulletpack [ios|osx] output_dir third_party_name`
    PlatformAware,
    /// `bulletpack-ios output_dir third_party_name`; recreates `output_dir`.
    MobileOnly,
}

impl Variant {
    pub fn bin_name(&self) -> &'static str {
        match self {
            Variant::PlatformAware => "bulletpack",
            Variant::MobileOnly => "bulletpack-ios",
        }
    }

    fn expected_args(&self) -> usize {
        match self {
            Variant::PlatformAware => 3,
            Variant::MobileOnly => 2,
        }
    }

    /// Message printed when the positional argument count is wrong.
    pub fn usage_error(&self) -> &'static str {
        match self {
            Variant::PlatformAware => {
                "ERROR: Three arguments required: [ios|osx] output_dir third_party_name"
            }
            Variant::MobileOnly => "ERROR: Two arguments required: output_dir third_party_name",
        }
    }

    /// The clap command with this variant's name and positional help.
    pub fn command(&self) -> clap::Command {
        let positional = match self {
            Variant::PlatformAware => "[ios|osx] output_dir third_party_name",
            Variant::MobileOnly => "output_dir third_party_name",
        };
        Cli::command()
            .name(self.bin_name())
            .bin_name(self.bin_name())
            .mut_arg("args", |arg| arg.help(positional))
    }
}

/// A validated invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub platform: Platform,
    pub output_dir: PathBuf,
    pub third_party_name: String,
    pub options: BuildOptions,
}

/// Why an invocation was rejected before any work started.
#[derive(Debug)]
pub enum UsageError {
    /// clap rejected the flags, or help/version was requested.
    Clap(clap::Error),
    /// Wrong number of positional arguments.
    ArgumentCount,
    /// The platform argument is neither `ios` nor `osx`.
    Platform(String),
    /// The third party name is not a single path component.
    Name(String),
}

/// Parses `args` (including the program name) for `variant`.
pub fn parse_request<I, T>(variant: Variant, args: I) -> Result<RunRequest, UsageError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = variant
        .command()
        .try_get_matches_from(args)
        .map_err(UsageError::Clap)?;
    let cli = Cli::from_arg_matches(&matches).map_err(UsageError::Clap)?;

    if cli.args.len() != variant.expected_args() {
        return Err(UsageError::ArgumentCount);
    }

    let mut positional = cli.args.into_iter();
    let platform = match variant {
        Variant::MobileOnly => Platform::Ios,
        Variant::PlatformAware => {
            let raw = positional.next().unwrap_or_default();
            raw.parse::<Platform>().map_err(|err| match err {
                PackError::Config(msg) => UsageError::Platform(msg),
                other => UsageError::Platform(other.to_string()),
            })?
        }
    };
    let output_dir = PathBuf::from(positional.next().unwrap_or_default());
    let third_party_name = positional.next().unwrap_or_default();
    validate_third_party_name(&third_party_name).map_err(|err| match err {
        PackError::Config(msg) => UsageError::Name(msg),
        other => UsageError::Name(other.to_string()),
    })?;

    Ok(RunRequest {
        platform,
        output_dir,
        third_party_name,
        options: cli.options,
    })
}

/// Entry point shared by both binaries.
pub fn main_with(variant: Variant) -> ExitCode {
    let request = match parse_request(variant, std::env::args_os()) {
        Ok(request) => request,
        Err(UsageError::Clap(err)) => {
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                err.exit();
            }
            let _ = err.print();
            return ExitCode::from(1);
        }
        Err(UsageError::ArgumentCount) => {
            eprintln!("{}", variant.usage_error());
            eprintln!("{}", variant.command().render_usage());
            return ExitCode::from(1);
        }
        Err(UsageError::Platform(msg) | UsageError::Name(msg)) => {
            eprintln!("ERROR: {}", msg);
            eprintln!("{}", variant.command().render_usage());
            return ExitCode::from(1);
        }
    };

    load_dotenv();
    init_tracing(request.options.verbose);

    match run(variant, &request) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Resolves configuration and runs the packaging pipeline.
pub fn run(variant: Variant, request: &RunRequest) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let pack = resolve_pack_config(request, &cwd)?;

    if variant == Variant::MobileOnly {
        recreate_dir(&pack.output_dir)?;
    }

    let result = Packager::new(pack)
        .build()
        .context("Failed to package third party")?;

    println!("\n✓ Third party packaged!");
    println!("  Archive: {}", result.archive_path.display());
    println!("  Manifest: {}", result.manifest_path.display());
    println!("  Libraries: {}", result.libraries.len());
    if let Some(dir) = &result.working_dir {
        println!("  Working directory kept at {}", dir.display());
    }
    Ok(())
}

/// Builds the [`PackConfig`] for `request`: command line over config file
/// over defaults.
pub fn resolve_pack_config(request: &RunRequest, cwd: &Path) -> Result<PackConfig> {
    let resolver = ConfigResolver::load(request.options.config.as_deref(), cwd)?;
    if let Some(path) = &resolver.config_path {
        tracing::info!(config = %path.display(), "loaded configuration");
    }

    let env_source = std::env::var_os(SOURCE_DIR_ENV).map(PathBuf::from);
    let source_dir = resolver.source_dir(request.options.source_dir.as_deref(), env_source, cwd);

    let mut pack = PackConfig::new(
        request.platform,
        source_dir,
        cwd.join(&request.output_dir),
        request.third_party_name.clone(),
    );
    pack.enable_bitcode = request.options.bitcode;
    pack.size_optimized = request.options.size_optimized;
    pack.keep_working_dir = request.options.keep_working_dir;
    resolver.apply(&mut pack);

    Ok(pack)
}

/// Deletes `dir` if present and creates it empty.
fn recreate_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        tracing::warn!(output_dir = %dir.display(), "removing existing output directory");
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to remove output directory {:?}", dir))?;
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    Ok(())
}

fn load_dotenv() {
    if let Ok(cwd) = std::env::current_dir() {
        let _ = dotenvy::from_path(cwd.join(".env.local"));
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
