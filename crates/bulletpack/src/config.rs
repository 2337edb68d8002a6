//! Configuration file support for bulletpack.
//!
//! A `bulletpack.toml` file lets a checkout pin the Bullet source location,
//! deployment targets and tool programs instead of passing them on every run.
//!
//! ## Configuration File Location
//!
//! The configuration file is searched for in the following order:
//! 1. The path given with `--config`
//! 2. Current working directory (`./bulletpack.toml`)
//! 3. Parent directories (up to the repository root or filesystem root)
//!
//! ## Example Configuration
//!
//! ```toml
//! [source]
//! dir = "../bullet3"
//! headers = "src"
//! toolchain_file = "ios.toolchain.cmake"
//!
//! [ios]
//! deployment_target = "8.0"
//! bitcode = false
//!
//! [macos]
//! deployment_target = "10.12"
//!
//! [tools]
//! cmake = "/opt/homebrew/bin/cmake"
//!
//! [build]
//! size_optimized = true
//! keep_working_dir = false
//! ```

use anyhow::{Context, Result};
use bulletpack_sdk::types::{
    DEFAULT_HEADERS_DIR, DEFAULT_IOS_DEPLOYMENT_TARGET, DEFAULT_MACOS_DEPLOYMENT_TARGET,
    DEFAULT_TOOLCHAIN_FILE,
};
use bulletpack_sdk::{PackConfig, ToolPaths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "bulletpack.toml";

/// Environment variable consulted for the source directory when neither the
/// command line nor the config file names one.
pub const SOURCE_DIR_ENV: &str = "BULLETPACK_SOURCE_DIR";

/// Root configuration structure for `bulletpack.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletpackConfig {
    /// Bullet source tree layout.
    pub source: SourceConfig,

    /// iOS build settings.
    pub ios: IosConfig,

    /// macOS build settings.
    pub macos: MacosConfig,

    /// External tool programs.
    pub tools: ToolsConfig,

    /// Build defaults.
    pub build: BuildConfig,
}

/// Bullet source tree layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Bullet source root. Relative paths are resolved against the directory
    /// holding the config file.
    pub dir: Option<PathBuf>,

    /// Header root, relative to the source root.
    ///
    /// Defaults to "src".
    pub headers: PathBuf,

    /// cmake toolchain file for iOS, relative to the source root.
    ///
    /// Defaults to "ios.toolchain.cmake".
    pub toolchain_file: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: None,
            headers: PathBuf::from(DEFAULT_HEADERS_DIR),
            toolchain_file: PathBuf::from(DEFAULT_TOOLCHAIN_FILE),
        }
    }
}

/// iOS build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IosConfig {
    /// Defaults to "8.0".
    pub deployment_target: String,

    /// Embed bitcode. `--bitcode` turns it on regardless.
    pub bitcode: bool,
}

impl Default for IosConfig {
    fn default() -> Self {
        Self {
            deployment_target: DEFAULT_IOS_DEPLOYMENT_TARGET.to_string(),
            bitcode: false,
        }
    }
}

/// macOS build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacosConfig {
    /// Defaults to "10.12".
    pub deployment_target: String,
}

impl Default for MacosConfig {
    fn default() -> Self {
        Self {
            deployment_target: DEFAULT_MACOS_DEPLOYMENT_TARGET.to_string(),
        }
    }
}

/// External tool programs. Unset entries are looked up on PATH.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub cmake: Option<String>,
    pub xcodebuild: Option<String>,
    pub lipo: Option<String>,
}

/// Build defaults. Command-line flags can only turn these on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub size_optimized: bool,
    pub keep_working_dir: bool,
}

impl BulletpackConfig {
    /// Loads configuration from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(BulletpackConfig)` - Successfully loaded configuration
    /// * `Err` - If the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: BulletpackConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Attempts to find and load configuration starting from the specified directory.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }
}

/// Merges config file values with command-line arguments.
///
/// Command-line arguments always take precedence over config file values,
/// which take precedence over built-in defaults.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Loaded configuration, if any.
    pub config: Option<BulletpackConfig>,

    /// Path to the loaded config file, if any.
    pub config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Loads `explicit` if given, otherwise discovers a config file upward
    /// from `cwd`. No file is not an error.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        let found = match explicit {
            Some(path) => Some((BulletpackConfig::load_from_file(path)?, path.to_path_buf())),
            None => BulletpackConfig::discover_from(cwd)?,
        };
        Ok(match found {
            Some((config, path)) => Self {
                config: Some(config),
                config_path: Some(path),
            },
            None => Self::default(),
        })
    }

    /// Returns the loaded configuration or the defaults.
    pub fn settings(&self) -> BulletpackConfig {
        self.config.clone().unwrap_or_default()
    }

    /// Resolves the Bullet source root.
    ///
    /// Order: `cli_value`, `[source] dir` (relative to the config file),
    /// `env_value`, then `cwd`. Relative command-line and environment paths
    /// are resolved against `cwd`.
    pub fn source_dir(&self, cli_value: Option<&Path>, env_value: Option<PathBuf>, cwd: &Path) -> PathBuf {
        if let Some(dir) = cli_value {
            return cwd.join(dir);
        }
        if let Some(dir) = self.config.as_ref().and_then(|c| c.source.dir.as_deref()) {
            let base = self
                .config_path
                .as_deref()
                .and_then(Path::parent)
                .unwrap_or(cwd);
            return base.join(dir);
        }
        match env_value {
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        }
    }

    /// Applies the config file's settings to a freshly created [`PackConfig`].
    pub fn apply(&self, pack: &mut PackConfig) {
        let settings = self.settings();

        pack.headers_dir = pack.source_dir.join(&settings.source.headers);
        pack.toolchain_file = pack.source_dir.join(&settings.source.toolchain_file);
        pack.ios_deployment_target = settings.ios.deployment_target;
        pack.macos_deployment_target = settings.macos.deployment_target;
        pack.enable_bitcode |= settings.ios.bitcode;
        pack.size_optimized |= settings.build.size_optimized;
        pack.keep_working_dir |= settings.build.keep_working_dir;

        let defaults = ToolPaths::default();
        pack.tools = ToolPaths {
            cmake: settings.tools.cmake.unwrap_or(defaults.cmake),
            xcodebuild: settings.tools.xcodebuild.unwrap_or(defaults.xcodebuild),
            lipo: settings.tools.lipo.unwrap_or(defaults.lipo),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulletpack_sdk::Platform;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BulletpackConfig::default();
        assert_eq!(config.ios.deployment_target, "8.0");
        assert_eq!(config.macos.deployment_target, "10.12");
        assert_eq!(config.source.headers, PathBuf::from("src"));
        assert!(!config.build.size_optimized);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);

        let toml_content = r#"
[source]
dir = "../bullet3"

[ios]
deployment_target = "9.0"
bitcode = true

[tools]
lipo = "/usr/bin/lipo"

[build]
size_optimized = true
"#;
        std::fs::write(&config_path, toml_content).unwrap();

        let config = BulletpackConfig::load_from_file(&config_path).unwrap();

        assert_eq!(config.source.dir, Some(PathBuf::from("../bullet3")));
        assert_eq!(config.source.toolchain_file, PathBuf::from("ios.toolchain.cmake"));
        assert_eq!(config.ios.deployment_target, "9.0");
        assert!(config.ios.bitcode);
        assert_eq!(config.macos.deployment_target, "10.12");
        assert_eq!(config.tools.lipo.as_deref(), Some("/usr/bin/lipo"));
        assert_eq!(config.tools.cmake, None);
        assert!(config.build.size_optimized);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[ios]\ndeployment_target = 8").unwrap();

        let err = BulletpackConfig::load_from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_discover_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[macos]\ndeployment_target = \"10.14\"\n").unwrap();
        let nested = temp_dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, path) = BulletpackConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.macos.deployment_target, "10.14");
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_stops_at_git_root() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "").unwrap();
        let repo = temp_dir.path().join("repo");
        std::fs::create_dir_all(repo.join(".git")).unwrap();

        let result = BulletpackConfig::discover_from(&repo).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_source_dir_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let cwd = Path::new("/work");
        let resolver = ConfigResolver {
            config: Some(BulletpackConfig {
                source: SourceConfig {
                    dir: Some(PathBuf::from("bullet3")),
                    ..SourceConfig::default()
                },
                ..BulletpackConfig::default()
            }),
            config_path: Some(temp_dir.path().join(CONFIG_FILE_NAME)),
        };

        // CLI value takes precedence
        assert_eq!(
            resolver.source_dir(Some(Path::new("cli")), Some(PathBuf::from("env")), cwd),
            PathBuf::from("/work/cli")
        );
        // Config value is relative to the config file
        assert_eq!(
            resolver.source_dir(None, Some(PathBuf::from("env")), cwd),
            temp_dir.path().join("bullet3")
        );

        let empty = ConfigResolver::default();
        assert_eq!(empty.source_dir(None, Some(PathBuf::from("/env/bullet")), cwd), PathBuf::from("/env/bullet"));
        assert_eq!(empty.source_dir(None, None, cwd), PathBuf::from("/work"));
    }

    #[test]
    fn test_apply_overrides_pack_config() {
        let resolver = ConfigResolver {
            config: Some(BulletpackConfig {
                source: SourceConfig {
                    dir: None,
                    headers: PathBuf::from("include"),
                    toolchain_file: PathBuf::from("cmake/ios.cmake"),
                },
                ios: IosConfig {
                    deployment_target: "11.0".to_string(),
                    bitcode: false,
                },
                tools: ToolsConfig {
                    cmake: Some("/opt/cmake".to_string()),
                    ..ToolsConfig::default()
                },
                build: BuildConfig {
                    size_optimized: true,
                    keep_working_dir: false,
                },
                ..BulletpackConfig::default()
            }),
            config_path: None,
        };

        let mut pack = PackConfig::new(Platform::Ios, "/src/bullet3", "/out", "Bullet");
        pack.enable_bitcode = true;
        resolver.apply(&mut pack);

        assert_eq!(pack.headers_dir, PathBuf::from("/src/bullet3/include"));
        assert_eq!(pack.toolchain_file, PathBuf::from("/src/bullet3/cmake/ios.cmake"));
        assert_eq!(pack.ios_deployment_target, "11.0");
        assert!(pack.enable_bitcode, "a flag is not turned off by the config file");
        assert!(pack.size_optimized);
        assert_eq!(pack.tools.cmake, "/opt/cmake");
        assert_eq!(pack.tools.lipo, "lipo");
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = ConfigResolver::load(Some(&temp_dir.path().join("nope.toml")), temp_dir.path());
        assert!(result.is_err());
    }
}
