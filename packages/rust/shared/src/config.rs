//! Configuration loading for doku.
//!
//! Three JSON inputs live with the package being documented:
//! `package.json` (required), `Documentation~/config.json` (optional) and a
//! custom template's `template.json`. The user-level tool config lives at
//! `~/.doku/doku.toml`. CLI flags override package files, which override the
//! tool config, which overrides built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DokuError, Result};
use crate::log::LogLevel;
use crate::types::{BuildConfiguration, PackageDescriptor, TemplateDescriptor};

/// Package manifest file name.
pub const PACKAGE_MANIFEST_FILE: &str = "package.json";

/// Directory holding the package's prose documentation.
pub const DOCUMENTATION_DIR: &str = "Documentation~";

/// Build configuration file name inside [`DOCUMENTATION_DIR`].
pub const BUILD_CONFIG_FILE: &str = "config.json";

/// Descriptor file name inside a custom template directory.
pub const TEMPLATE_DESCRIPTOR_FILE: &str = "template.json";

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "doku.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".doku";

// ---------------------------------------------------------------------------
// Package inputs
// ---------------------------------------------------------------------------

/// Load and validate `package.json` from the package root.
pub fn load_package_descriptor(package_root: &Path) -> Result<PackageDescriptor> {
    let path = package_root.join(PACKAGE_MANIFEST_FILE);
    if !path.is_file() {
        return Err(DokuError::config(format!(
            "File {} does not exist.",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| DokuError::io(&path, e))?;
    let descriptor: PackageDescriptor =
        serde_json::from_str(&content).map_err(|e| DokuError::json(&path, e))?;

    if !descriptor.is_valid() {
        return Err(DokuError::config(format!(
            "Invalid {}: `displayName` and `version` are required.",
            path.display()
        )));
    }

    Ok(descriptor)
}

/// Load the build configuration, falling back to defaults when the file is absent.
pub fn load_build_configuration(path: &Path) -> Result<BuildConfiguration> {
    if !path.exists() {
        tracing::debug!(?path, "build configuration not found, using defaults");
        return Ok(BuildConfiguration::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| DokuError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| DokuError::json(path, e))
}

/// Load `template.json` from a custom template directory.
pub fn load_template_descriptor(template_dir: &Path) -> Result<TemplateDescriptor> {
    if !template_dir.is_dir() {
        return Err(DokuError::config(format!(
            "{} does not exist.",
            template_dir.display()
        )));
    }

    let path = template_dir.join(TEMPLATE_DESCRIPTOR_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| DokuError::io(&path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| DokuError::config(format!("Failed to load {}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Tool config (matching doku.toml schema)
// ---------------------------------------------------------------------------

/// Top-level user tool config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Site generator installation (binary or directory); `PATH` lookup when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docfx_path: Option<String>,

    /// Default output directory for `doku build`.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Default log level.
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            docfx_path: None,
            output_dir: default_output_dir(),
            log_level: LogLevel::default(),
        }
    }
}

fn default_output_dir() -> String {
    "docs".into()
}

/// Get the path to the config directory (`~/.doku/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DokuError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.doku/doku.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the tool config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<ToolConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(ToolConfig::default());
    }

    load_config_from(&path)
}

/// Load the tool config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<ToolConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DokuError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DokuError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DokuError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&ToolConfig::default())
        .map_err(|e| DokuError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DokuError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_manifest_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_package_descriptor(tmp.path()).unwrap_err();
        assert!(matches!(err, DokuError::Config { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn manifest_without_version_is_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(PACKAGE_MANIFEST_FILE),
            r#"{"displayName": "Tools"}"#,
        )
        .unwrap();
        let err = load_package_descriptor(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("displayName"));
    }

    #[test]
    fn manifest_loads() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(PACKAGE_MANIFEST_FILE),
            r#"{"displayName": "Tools", "version": "0.3.0"}"#,
        )
        .unwrap();
        let pkg = load_package_descriptor(tmp.path()).unwrap();
        assert_eq!(pkg.version, "0.3.0");
        assert_eq!(pkg.target, None);
    }

    #[test]
    fn absent_build_configuration_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_build_configuration(&tmp.path().join("config.json")).unwrap();
        assert_eq!(config, BuildConfiguration::default());
    }

    #[test]
    fn malformed_build_configuration_is_json_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_build_configuration(&path).unwrap_err();
        assert!(matches!(err, DokuError::Json { .. }));
    }

    #[test]
    fn template_descriptor_requires_directory() {
        let tmp = TempDir::new().unwrap();
        let err = load_template_descriptor(&tmp.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        std::fs::write(tmp.path().join(TEMPLATE_DESCRIPTOR_FILE), r#"{"type": "Full"}"#).unwrap();
        assert!(load_template_descriptor(tmp.path()).unwrap().is_full());
    }

    #[test]
    fn default_config_roundtrip() {
        let toml_str = toml::to_string_pretty(&ToolConfig::default()).expect("serialize");
        let parsed: ToolConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.output_dir, "docs");
        assert_eq!(parsed.defaults.log_level, LogLevel::Info);
        assert!(parsed.defaults.docfx_path.is_none());
    }

    #[test]
    fn config_with_docfx_path() {
        let toml_str = r#"
[defaults]
docfx_path = "/opt/docfx"
log_level = "verbose"
"#;
        let config: ToolConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.docfx_path.as_deref(), Some("/opt/docfx"));
        assert_eq!(config.defaults.log_level, LogLevel::Verbose);
        assert_eq!(config.defaults.output_dir, "docs");
    }
}
