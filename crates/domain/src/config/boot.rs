//! Process-wide secrets required at boot.
//!
//! These never live in the TOML config file — they are read from the
//! environment once, at startup, and frozen into `BootSecrets` for the
//! lifetime of the process. Absence or malformed values are boot errors,
//! not runtime errors: the process exits before binding a listener.

use std::fmt;

#[derive(Clone)]
pub struct BootSecrets {
    pub database_url: String,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub jwt_signing_secret: String,
    /// 32 raw bytes, parsed from a 64-hex-character environment value.
    pub encryption_key: [u8; 32],
    pub public_base_url: String,
}

impl fmt::Debug for BootSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret material, even in Debug output.
        f.debug_struct("BootSecrets")
            .field("database_url", &"<redacted>")
            .field("oauth_client_id", &"<redacted>")
            .field("oauth_client_secret", &"<redacted>")
            .field("jwt_signing_secret", &"<redacted>")
            .field("encryption_key", &"<redacted>")
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BootSecretsError {
    #[error("environment variable {0} is required but not set")]
    Missing(&'static str),
    #[error("{0} must be a 64-hex-character string (32 raw bytes), got {1} characters")]
    BadEncryptionKeyLength(&'static str, usize),
    #[error("{0} must be valid hex: {1}")]
    BadEncryptionKeyHex(&'static str, String),
}

impl BootSecrets {
    /// Read all required boot secrets from the process environment.
    /// Absence is fatal rather than falling back to a dev mode.
    pub fn from_env() -> Result<Self, BootSecretsError> {
        let database_url = required_env("DATABASE_URL")?;
        let oauth_client_id = required_env("OAUTH_CLIENT_ID")?;
        let oauth_client_secret = required_env("OAUTH_CLIENT_SECRET")?;
        let jwt_signing_secret = required_env("JWT_SIGNING_SECRET")?;
        let public_base_url = required_env("PUBLIC_BASE_URL")?;
        let encryption_key = parse_encryption_key(&required_env("ENCRYPTION_KEY")?)?;

        Ok(Self {
            database_url,
            oauth_client_id,
            oauth_client_secret,
            jwt_signing_secret,
            encryption_key,
            public_base_url,
        })
    }
}

fn required_env(name: &'static str) -> Result<String, BootSecretsError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(BootSecretsError::Missing(name))
}

fn parse_encryption_key(raw: &str) -> Result<[u8; 32], BootSecretsError> {
    if raw.len() != 64 {
        return Err(BootSecretsError::BadEncryptionKeyLength(
            "ENCRYPTION_KEY",
            raw.len(),
        ));
    }
    let bytes = hex::decode(raw)
        .map_err(|e| BootSecretsError::BadEncryptionKeyHex("ENCRYPTION_KEY", e.to_string()))?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_key() {
        assert!(matches!(
            parse_encryption_key("abcd"),
            Err(BootSecretsError::BadEncryptionKeyLength(_, 4))
        ));
    }

    #[test]
    fn rejects_non_hex_key() {
        let raw = "z".repeat(64);
        assert!(matches!(
            parse_encryption_key(&raw),
            Err(BootSecretsError::BadEncryptionKeyHex(_, _))
        ));
    }

    #[test]
    fn accepts_valid_key() {
        let raw = "11".repeat(32);
        let key = parse_encryption_key(&raw).unwrap();
        assert_eq!(key, [0x11u8; 32]);
    }
}
