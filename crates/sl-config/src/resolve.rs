//! Configuration resolution.
//!
//! Each path is resolved independently with the precedence:
//! 1. explicit CLI flag
//! 2. environment variable (`SIGHTLINE_CONFIG`, `SIGHTLINE_SECRETS`, `SIGHTLINE_DATA`)
//! 3. `XDG_CONFIG_HOME` / `XDG_DATA_HOME`
//! 4. platform default from `dirs`
//!
//! A missing settings file means defaults. A missing secrets file is fatal.

use crate::error::ConfigError;
use crate::secrets::Secrets;
use crate::settings::Settings;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DIR_NAME: &str = "sightline";
const SETTINGS_FILE: &str = "settings.json";
const SECRETS_FILE: &str = "secrets.json";
const STORE_FILE: &str = "observations.sqlite3";
const AUDIT_FILE: &str = "audit.log";

const ENV_CONFIG: &str = "SIGHTLINE_CONFIG";
const ENV_SECRETS: &str = "SIGHTLINE_SECRETS";
const ENV_DATA_DIR: &str = "SIGHTLINE_DATA";

/// Resolved locations of the configuration inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub settings_file: PathBuf,
    pub secrets_file: PathBuf,
    pub data_dir: PathBuf,
}

impl ConfigPaths {
    /// Resolve paths from CLI overrides and the process environment.
    pub fn resolve(
        cli_settings: Option<&Path>,
        cli_secrets: Option<&Path>,
        cli_data_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with(cli_settings, cli_secrets, cli_data_dir, |key| {
            std::env::var(key).ok()
        })
    }

    /// Resolve paths with an injectable environment lookup.
    pub fn resolve_with<F>(
        cli_settings: Option<&Path>,
        cli_secrets: Option<&Path>,
        cli_data_dir: Option<&Path>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_dir = || -> Result<PathBuf, ConfigError> {
            if let Some(xdg) = env("XDG_CONFIG_HOME") {
                return Ok(PathBuf::from(xdg).join(DIR_NAME));
            }
            dirs::config_dir()
                .map(|base| base.join(DIR_NAME))
                .ok_or(ConfigError::DirUnavailable("config"))
        };

        let settings_file = match cli_settings {
            Some(path) => path.to_path_buf(),
            None => match env(ENV_CONFIG) {
                Some(path) => PathBuf::from(path),
                None => config_dir()?.join(SETTINGS_FILE),
            },
        };

        let secrets_file = match cli_secrets {
            Some(path) => path.to_path_buf(),
            None => match env(ENV_SECRETS) {
                Some(path) => PathBuf::from(path),
                None => config_dir()?.join(SECRETS_FILE),
            },
        };

        let data_dir = match cli_data_dir {
            Some(path) => path.to_path_buf(),
            None => match (env(ENV_DATA_DIR), env("XDG_DATA_HOME")) {
                (Some(dir), _) => PathBuf::from(dir),
                (None, Some(xdg)) => PathBuf::from(xdg).join(DIR_NAME),
                (None, None) => dirs::data_dir()
                    .map(|base| base.join(DIR_NAME))
                    .ok_or(ConfigError::DirUnavailable("data"))?,
            },
        };

        Ok(Self {
            settings_file,
            secrets_file,
            data_dir,
        })
    }
}

/// Immutable configuration handed to every component at startup.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub settings: Settings,
    pub secrets: Secrets,
    pub store_path: PathBuf,
    pub audit_path: PathBuf,
    /// True when no settings file was found and defaults were used.
    pub using_defaults: bool,
}

impl IngestConfig {
    /// Assemble a configuration, filling unset paths from `data_dir`.
    pub fn from_parts(
        settings: Settings,
        secrets: Secrets,
        data_dir: &Path,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let store_path = settings
            .store
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join(STORE_FILE));
        let audit_path = settings
            .audit
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join(AUDIT_FILE));

        Ok(Self {
            settings,
            secrets,
            store_path,
            audit_path,
            using_defaults: false,
        })
    }

    /// Apply listener overrides from the command line and re-validate.
    pub fn with_server_overrides(
        mut self,
        bind: Option<String>,
        workers: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if let Some(bind) = bind {
            self.settings.server.bind = bind;
        }
        if let Some(workers) = workers {
            self.settings.server.workers = workers;
        }
        self.settings.validate()?;
        Ok(self)
    }
}

/// Load and validate the full configuration from resolved paths.
pub fn resolve_config(paths: &ConfigPaths) -> Result<IngestConfig, ConfigError> {
    let (settings, using_defaults) = if paths.settings_file.exists() {
        debug!(path = %paths.settings_file.display(), "loading settings");
        (Settings::load(&paths.settings_file)?, false)
    } else {
        info!(
            path = %paths.settings_file.display(),
            "settings file not found; using defaults"
        );
        (Settings::default(), true)
    };

    let secrets = Secrets::load(&paths.secrets_file)?;
    debug!(fingerprint = %secrets.fingerprint(), "loaded shared secret");

    let mut config = IngestConfig::from_parts(settings, secrets, &paths.data_dir)?;
    config.using_defaults = using_defaults;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_cli_beats_env() {
        let paths = ConfigPaths::resolve_with(
            Some(Path::new("/cli/settings.json")),
            None,
            None,
            env_from(&[
                (ENV_CONFIG, "/env/settings.json"),
                (ENV_SECRETS, "/env/secrets.json"),
                (ENV_DATA_DIR, "/env/data"),
            ]),
        )
        .unwrap();

        assert_eq!(paths.settings_file, PathBuf::from("/cli/settings.json"));
        assert_eq!(paths.secrets_file, PathBuf::from("/env/secrets.json"));
        assert_eq!(paths.data_dir, PathBuf::from("/env/data"));
    }

    #[test]
    fn test_xdg_fallback() {
        let paths = ConfigPaths::resolve_with(
            None,
            None,
            None,
            env_from(&[("XDG_CONFIG_HOME", "/xdg/config"), ("XDG_DATA_HOME", "/xdg/data")]),
        )
        .unwrap();

        assert_eq!(
            paths.settings_file,
            PathBuf::from("/xdg/config/sightline/settings.json")
        );
        assert_eq!(
            paths.secrets_file,
            PathBuf::from("/xdg/config/sightline/secrets.json")
        );
        assert_eq!(paths.data_dir, PathBuf::from("/xdg/data/sightline"));
    }

    fn paths_in(tmp: &TempDir) -> ConfigPaths {
        ConfigPaths {
            settings_file: tmp.path().join("settings.json"),
            secrets_file: tmp.path().join("secrets.json"),
            data_dir: tmp.path().join("data"),
        }
    }

    #[test]
    fn test_resolve_defaults_when_settings_missing() {
        let tmp = TempDir::new().unwrap();
        let paths = paths_in(&tmp);
        std::fs::write(&paths.secrets_file, r#"{"validator":"v","secret":"S"}"#).unwrap();

        let config = resolve_config(&paths).unwrap();
        assert!(config.using_defaults);
        assert_eq!(config.store_path, tmp.path().join("data").join(STORE_FILE));
        assert_eq!(config.audit_path, tmp.path().join("data").join(AUDIT_FILE));
        assert_eq!(config.secrets.secret(), "S");
    }

    #[test]
    fn test_resolve_explicit_store_path() {
        let tmp = TempDir::new().unwrap();
        let paths = paths_in(&tmp);
        let store = tmp.path().join("custom.sqlite3");
        std::fs::write(
            &paths.settings_file,
            serde_json::json!({"store": {"path": store}}).to_string(),
        )
        .unwrap();
        std::fs::write(&paths.secrets_file, r#"{"validator":"v","secret":"S"}"#).unwrap();

        let config = resolve_config(&paths).unwrap();
        assert!(!config.using_defaults);
        assert_eq!(config.store_path, store);
    }

    #[test]
    fn test_resolve_requires_secrets() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_config(&paths_in(&tmp)).unwrap_err();
        assert!(matches!(err, ConfigError::SecretsMissing(_)));
    }

    #[test]
    fn test_server_overrides_revalidate() {
        let tmp = TempDir::new().unwrap();
        let config = IngestConfig::from_parts(
            Settings::default(),
            Secrets::new("v", "S").unwrap(),
            tmp.path(),
        )
        .unwrap();

        let config = config
            .with_server_overrides(Some("0.0.0.0:9000".to_string()), Some(2))
            .unwrap();
        assert_eq!(config.settings.server.bind, "0.0.0.0:9000");
        assert_eq!(config.settings.server.workers, 2);

        let err = config.with_server_overrides(None, Some(0)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { field: "server.workers", .. }));
    }

    #[test]
    fn test_resolve_rejects_invalid_settings() {
        let tmp = TempDir::new().unwrap();
        let paths = paths_in(&tmp);
        std::fs::write(&paths.settings_file, r#"{"server": {"workers": 0}}"#).unwrap();
        std::fs::write(&paths.secrets_file, r#"{"validator":"v","secret":"S"}"#).unwrap();

        let err = resolve_config(&paths).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { .. }));
    }
}
