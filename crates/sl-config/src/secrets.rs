//! Validator token and shared secret.
//!
//! Both values live in a separate, protected JSON file so the settings file
//! can be shared freely:
//!
//! ```json
//! { "validator": "da6a17c407bb11dfeec7392a5042be0a4cc034b6", "secret": "..." }
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Credentials the ingestion endpoint checks against.
#[derive(Clone, Deserialize)]
pub struct Secrets {
    /// Returned verbatim on probe requests.
    validator: String,
    /// Shared secret every envelope must carry.
    secret: String,
}

impl Secrets {
    /// Build secrets directly, enforcing the same rules as [`Secrets::load`].
    pub fn new(
        validator: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let secrets = Self {
            validator: validator.into(),
            secret: secret.into(),
        };
        secrets.validate()?;
        Ok(secrets)
    }

    /// Load secrets from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::SecretsMissing(path.to_path_buf()));
        }
        warn_if_exposed(path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let secrets: Secrets = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        secrets.validate()?;
        Ok(secrets)
    }

    pub fn validator(&self) -> &str {
        &self.validator
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Short digest of the shared secret, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.secret.as_bytes());
        hex::encode(&digest[..4])
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.validator.trim().is_empty() {
            return Err(ConfigError::InvalidSecrets(
                "validator must not be empty".to_string(),
            ));
        }
        if self.secret.is_empty() {
            return Err(ConfigError::InvalidSecrets(
                "secret must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("validator", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

#[cfg(unix)]
fn warn_if_exposed(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(meta) = std::fs::metadata(path) {
        let mode = meta.permissions().mode();
        if mode & 0o077 != 0 {
            tracing::warn!(
                path = %path.display(),
                mode = format!("{:o}", mode & 0o777),
                "secrets file is readable by group or others"
            );
        }
    }
}

#[cfg(not(unix))]
fn warn_if_exposed(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_secrets(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", body).unwrap();
        file
    }

    #[test]
    fn test_load_valid() {
        let file = write_secrets(r#"{"validator": "abc123", "secret": "S"}"#);
        let secrets = Secrets::load(file.path()).unwrap();
        assert_eq!(secrets.validator(), "abc123");
        assert_eq!(secrets.secret(), "S");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Secrets::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::SecretsMissing(_)));
    }

    #[test]
    fn test_missing_field_is_parse_error() {
        let file = write_secrets(r#"{"validator": "abc123"}"#);
        let err = Secrets::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let file = write_secrets(r#"{"validator": "abc123", "secret": ""}"#);
        let err = Secrets::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSecrets(_)));
        assert!(Secrets::new("", "S").is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let secrets = Secrets::new("validator-token", "hunter2").unwrap();
        let rendered = format!("{:?}", secrets);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("validator-token"));
        assert!(rendered.contains(&secrets.fingerprint()));
        assert_eq!(secrets.fingerprint().len(), 8);
    }
}
