//! CLI settings: command-line flags over an optional TOML file over defaults

use crate::LogFormat;
use fcsmeta_core::logging_facility::{init, Profile};
use fcsmeta_engine::{GatewayOptions, MetadataGateway};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_PATH: &str = ".fcsmeta/fcs.db";

/// Contents of the `--config` TOML file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub db: Option<PathBuf>,
    pub log_format: Option<LogFormat>,
    pub gateway: GatewayOptions,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
        let config = toml::from_str(&text)
            .map_err(|e| format!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub db: PathBuf,
    pub log_format: LogFormat,
    pub gateway: GatewayOptions,
}

impl Settings {
    pub fn resolve(
        db: Option<PathBuf>,
        config: Option<&Path>,
        log_format: Option<LogFormat>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let file = match config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self {
            db: db
                .or(file.db)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            log_format: log_format.or(file.log_format).unwrap_or(LogFormat::Pretty),
            gateway: file.gateway,
        })
    }

    pub fn init_logging(&self) {
        match self.log_format {
            LogFormat::Pretty => init(Profile::Development),
            LogFormat::Json => init(Profile::Production),
        }
    }

    /// Open the gateway, creating the database directory when needed.
    pub fn open_gateway(&self) -> Result<MetadataGateway, Box<dyn std::error::Error>> {
        self.open_gateway_with(&self.gateway)
    }

    pub fn open_gateway_with(
        &self,
        options: &GatewayOptions,
    ) -> Result<MetadataGateway, Box<dyn std::error::Error>> {
        if let Some(parent) = self.db.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(MetadataGateway::open(&self.db, options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcsmeta_store::JournalMode;

    #[test]
    fn test_file_config_parses_nested_store_options() {
        let config: FileConfig = toml::from_str(
            r#"
            db = "lab.db"
            log_format = "json"

            [gateway.store]
            journal_mode = "delete"
            "#,
        )
        .unwrap();
        assert_eq!(config.db, Some(PathBuf::from("lab.db")));
        assert_eq!(config.log_format, Some(LogFormat::Json));
        assert!(!config.gateway.rebuild);
        assert!(config.gateway.store.enforce_foreign_keys);
        assert_eq!(config.gateway.store.journal_mode, JournalMode::Delete);
    }

    #[test]
    fn test_config_file_cannot_request_rebuild() {
        let config: FileConfig = toml::from_str(
            r#"
            [gateway]
            rebuild = true
            "#,
        )
        .unwrap();
        assert!(!config.gateway.rebuild);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fcsmeta.toml");
        std::fs::write(&path, "db = \"from_file.db\"\nlog_format = \"json\"\n").unwrap();

        let settings =
            Settings::resolve(Some(PathBuf::from("flag.db")), Some(&path), None).unwrap();
        assert_eq!(settings.db, PathBuf::from("flag.db"));
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_defaults_without_config() {
        let settings = Settings::resolve(None, None, None).unwrap();
        assert_eq!(settings.db, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(settings.log_format, LogFormat::Pretty);
    }
}
