//! Server configuration — loaded once at startup from a TOML file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Server configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,
    pub controller: ControllerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite database.
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// Policy definition endpoint on the remote controller.
    pub url: String,

    /// Accept the controller's TLS certificate without verification.
    /// Off unless an operator turns it on in the configuration file.
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl ServerConfig {
    /// Resolve a context name to `/etc/polsnap/<name>.toml`.
    /// A value containing `/` or `.` is used as a literal path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/polsnap/{name_or_path}.toml"))
        }
    }

    /// Load configuration from disk.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Refuse to start with incomplete configuration.
    pub fn verify(&self) -> anyhow::Result<()> {
        if self.storage.data_dir.is_empty() {
            anyhow::bail!("Storage data_dir is empty in configuration.");
        }
        if self.controller.url.is_empty() {
            anyhow::bail!("Controller url is empty in configuration.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
[storage]
data_dir = "/var/lib/polsnap"

[controller]
url = "https://controller.example.com/dataservice/policy/definition"
"#;

    #[test]
    fn parses_minimal_config() {
        let config: ServerConfig = toml::from_str(EXAMPLE).unwrap();
        assert_eq!(config.storage.data_dir, "/var/lib/polsnap");
        assert!(config.controller.url.starts_with("https://"));
        // Certificate verification stays on unless explicitly disabled.
        assert!(!config.controller.insecure_skip_verify);
    }

    #[test]
    fn parses_insecure_flag() {
        let toml_str = format!("{EXAMPLE}insecure_skip_verify = true\n");
        let config: ServerConfig = toml::from_str(&toml_str).unwrap();
        assert!(config.controller.insecure_skip_verify);
    }

    #[test]
    fn verify_rejects_empty_fields() {
        let mut config: ServerConfig = toml::from_str(EXAMPLE).unwrap();
        config.controller.url.clear();
        assert!(config.verify().is_err());

        let mut config: ServerConfig = toml::from_str(EXAMPLE).unwrap();
        config.storage.data_dir.clear();
        assert!(config.verify().is_err());
    }

    #[test]
    fn resolve_path_handles_names_and_paths() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/polsnap/prod.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./local.toml"),
            PathBuf::from("./local.toml")
        );
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.toml");
        std::fs::write(&path, EXAMPLE).unwrap();
        let config = ServerConfig::load(&path).unwrap();
        assert!(config.verify().is_ok());
    }
}
