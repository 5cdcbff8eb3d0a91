//! Manager configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which backend a [`Manager`](crate::Manager) should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pick the backend for the current target.
    #[default]
    Auto,
    /// Objects are directories, properties are files.
    Filesystem,
    /// Objects are emulated on a flat key-value medium.
    Flat,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Auto => "auto",
            BackendKind::Filesystem => "filesystem",
            BackendKind::Flat => "flat",
        }
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "filesystem" | "fs" => Ok(BackendKind::Filesystem),
            "flat" | "kv" => Ok(BackendKind::Flat),
            other => Err(Error::Config(format!("unknown backend: {other}"))),
        }
    }
}

/// Configuration for [`Manager::open`](crate::Manager::open).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Namespace for the stored data.
    ///
    /// It doesn't have to match the real application name, but it has to stay
    /// the same between runs for old saves to be found. Use suffixes like
    /// "app" and "app2" to keep data sets apart. Must not be empty.
    pub app_name: String,

    /// Backend selection.
    #[serde(default)]
    pub backend: BackendKind,

    /// Base directory replacing the platform default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            backend: BackendKind::default(),
            data_dir: None,
        }
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Check the configuration before any backend is touched.
    pub fn validate(&self) -> Result<()> {
        if self.app_name.is_empty() {
            return Err(Error::Config("app name can't be empty".to_string()));
        }
        Ok(())
    }

    /// Parse a JSON configuration.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_validate_rejects_empty_app_name() {
        assert!(matches!(Config::new("").validate(), Err(Error::Config(_))));
        assert!(Config::new("game").validate().is_ok());
    }

    #[test]
    fn test_parse_defaults() {
        let config = Config::parse(r#"{ "appName": "game" }"#).unwrap();
        assert_eq!(config, Config::new("game"));
        assert_eq!(config.backend, BackendKind::Auto);
    }

    #[test]
    fn test_parse_full() {
        let config =
            Config::parse(r#"{ "appName": "game", "backend": "flat", "dataDir": "/tmp/saves" }"#)
                .unwrap();
        assert_eq!(config.backend, BackendKind::Flat);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/saves")));
    }

    #[test]
    fn test_parse_rejects_empty_app_name() {
        assert!(matches!(
            Config::parse(r#"{ "appName": "" }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(Config::parse("{}"), Err(Error::Config(_))));
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("FS".parse::<BackendKind>().unwrap(), BackendKind::Filesystem);
        assert_eq!("flat".parse::<BackendKind>().unwrap(), BackendKind::Flat);
        assert!("sqlite".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gamedata.json");
        let config = Config::new("game")
            .with_backend(BackendKind::Filesystem)
            .with_data_dir(dir.path());
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        assert_eq!(Config::load_file(&path).unwrap(), config);
        assert!(Config::load_file(&dir.path().join("missing.json")).is_err());
    }
}
