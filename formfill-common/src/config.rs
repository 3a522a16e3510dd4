//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `FORMFILL_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal: a warning is logged
//! and compiled defaults are used.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::catalog::HostProfile;
use crate::{Error, Result};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "FORMFILL_ROOT_FOLDER";

/// Default HTTP port for formfill-web
pub const DEFAULT_PORT: u16 = 5740;

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    /// Directory holding the fillable templates (default `<root>/templates_pdf`)
    pub template_dir: Option<PathBuf>,
    /// Directory receiving per-run output folders (default `<root>/outputs`)
    pub output_dir: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    /// Fail a run when a fan-out group matches no template field
    pub strict_template_audit: bool,
    pub logging: LoggingConfig,
    pub host: HostProfile,
}

/// Platform defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub bind_address: String,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/formfill
        dirs::data_local_dir()
            .map(|d| d.join("formfill"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/formfill"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/formfill
        dirs::data_dir()
            .map(|d| d.join("formfill"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/formfill"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\formfill
        dirs::data_local_dir()
            .map(|d| d.join("formfill"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\formfill"))
    } else {
        PathBuf::from("./formfill_data")
    }
}

/// Default configuration file path for the platform, if one exists
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("formfill").join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/formfill/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file at `path` (or the platform default), falling back to
/// defaults with a warning
pub fn load_config_or_default(path: Option<&Path>) -> TomlConfig {
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => {
            info!("No config file found; using compiled defaults");
            return TomlConfig::default();
        }
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using compiled defaults", e);
            TomlConfig::default()
        }
    }
}

/// Resolves the root folder following the documented priority order
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            info!(module = %self.module_name, "Root folder from command line: {}", path.display());
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!(module = %self.module_name, "Root folder from {}: {}", ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_root {
            info!(module = %self.module_name, "Root folder from config file: {}", path.display());
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        let path = CompiledDefaults::for_current_platform().root_folder;
        info!(module = %self.module_name, "Root folder from compiled default: {}", path.display());
        path
    }
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub root_folder: PathBuf,
    pub template_dir: PathBuf,
    pub output_dir: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub strict_template_audit: bool,
    pub log_level: String,
    pub host: HostProfile,
}

impl Settings {
    /// Merge a resolved root folder with the TOML config and defaults
    ///
    /// Relative template/output directories are taken relative to the root.
    pub fn from_parts(root_folder: PathBuf, config: TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let under_root = |dir: Option<PathBuf>, fallback: &str| match dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => root_folder.join(dir),
            None => root_folder.join(fallback),
        };

        Self {
            template_dir: under_root(config.template_dir, "templates_pdf"),
            output_dir: under_root(config.output_dir, "outputs"),
            bind_address: config.bind_address.unwrap_or(defaults.bind_address),
            port: config.port.unwrap_or(defaults.port),
            strict_template_audit: config.strict_template_audit,
            log_level: config.logging.level,
            host: config.host,
            root_folder,
        }
    }

    /// Resolve settings for `module_name` from CLI, environment and config
    pub fn resolve(module_name: &str, cli_root: Option<PathBuf>, config_path: Option<&Path>) -> Self {
        let config = load_config_or_default(config_path);
        let root_folder = RootFolderResolver::new(module_name)
            .with_cli_arg(cli_root)
            .with_toml(&config)
            .resolve();
        Self::from_parts(root_folder, config)
    }

    /// Create the root, template and output directories if missing
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.root_folder, &self.template_dir, &self.output_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                Error::Config(format!("Cannot create directory {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_config_parses_partial_file() {
        let config: TomlConfig = toml::from_str(
            r#"
            port = 8080
            strict_template_audit = true

            [logging]
            level = "debug"

            [host]
            organization = "Town of Example"
            facility_name = "Example Pool"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(8080));
        assert!(config.strict_template_audit);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.host.organization, "Town of Example");
        assert_eq!(config.host.facility_name, "Example Pool");
        // Unset host keys keep their defaults
        assert_eq!(config.host.area_code, "905");
        assert!(config.root_folder.is_none());
    }

    #[test]
    fn test_settings_from_parts_defaults() {
        let root = PathBuf::from("/srv/formfill");
        let settings = Settings::from_parts(root.clone(), TomlConfig::default());
        assert_eq!(settings.template_dir, root.join("templates_pdf"));
        assert_eq!(settings.output_dir, root.join("outputs"));
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.bind_address, "127.0.0.1");
        assert_eq!(settings.log_level, "info");
        assert!(!settings.strict_template_audit);
    }

    #[test]
    fn test_settings_relative_and_absolute_dirs() {
        let config = TomlConfig {
            template_dir: Some(PathBuf::from("forms")),
            output_dir: Some(PathBuf::from("/tmp/formfill-out")),
            ..TomlConfig::default()
        };
        let settings = Settings::from_parts(PathBuf::from("/srv/formfill"), config);
        assert_eq!(settings.template_dir, PathBuf::from("/srv/formfill/forms"));
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/formfill-out"));
    }
}
