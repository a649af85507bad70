//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// TOML configuration file contents (`~/.config/caselink/config.toml`)
///
/// All fields optional; missing values fall back to environment variables or
/// compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Data root folder (holds caselink.db)
    pub root_folder: Option<String>,
    /// Per-registry base URL overrides, e.g. for a local capture proxy
    #[serde(default)]
    pub registry_urls: RegistryUrls,
}

/// Registry portal base URL overrides
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryUrls {
    pub wake: Option<String>,
    pub durham: Option<String>,
    pub johnston: Option<String>,
}

impl TomlConfig {
    /// Load configuration from the default path, or return defaults when no
    /// config file exists. A present-but-malformed file is an error.
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// Default configuration file path for the platform
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("caselink").join("config.toml"))
}

/// Root folder resolution priority order:
/// 1. Environment variable (CASELINK_ROOT)
/// 2. TOML config file `root_folder` key
/// 3. OS-dependent compiled default
pub fn resolve_root_folder(toml_config: &TomlConfig) -> PathBuf {
    if let Ok(path) = std::env::var("CASELINK_ROOT") {
        return PathBuf::from(path);
    }

    if let Some(root) = &toml_config.root_folder {
        return PathBuf::from(root);
    }

    get_default_root_folder()
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/caselink (or /var/lib/caselink for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("caselink"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/caselink"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("caselink"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/caselink"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("caselink"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\caselink"))
    } else {
        PathBuf::from("./caselink_data")
    }
}

/// Ensure the root folder exists, creating it if missing
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root)?;
    Ok(())
}

/// Database file path within the root folder
pub fn database_path(root: &Path) -> PathBuf {
    root.join("caselink.db")
}

/// Standard user-agent string for outbound HTTP clients
///
/// County portals see each request; identifying ourselves keeps support
/// conversations short when a portal operator asks who is querying.
pub fn get_user_agent() -> String {
    format!("CaseLink/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
root_folder = "/tmp/caselink-test"

[registry_urls]
wake = "http://localhost:9910"
"#
        )
        .unwrap();

        let config = TomlConfig::load_from(file.path()).unwrap();
        assert_eq!(config.root_folder.as_deref(), Some("/tmp/caselink-test"));
        assert_eq!(
            config.registry_urls.wake.as_deref(),
            Some("http://localhost:9910")
        );
        assert!(config.registry_urls.durham.is_none());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "root_folder = [not valid").unwrap();

        let result = TomlConfig::load_from(file.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_toml_root_folder_used_when_env_unset() {
        // CASELINK_ROOT is not set in the test environment
        let config = TomlConfig {
            root_folder: Some("/data/caselink".to_string()),
            ..Default::default()
        };
        if std::env::var("CASELINK_ROOT").is_err() {
            assert_eq!(resolve_root_folder(&config), PathBuf::from("/data/caselink"));
        }
    }

    #[test]
    fn test_user_agent_format() {
        let ua = get_user_agent();
        assert!(ua.starts_with("CaseLink/"));
    }
}
