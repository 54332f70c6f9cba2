use std::fs;

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use brandhub_auth::config::AuthConfig;
use brandhub_db::DbConfig;

/// Longest accepted token lifetime: one year.
const MAX_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

// Server configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = DbConfig::default();
        let db = DbConfig {
            url: var("BRANDHUB_DB_URL").unwrap_or(defaults.url),
            namespace: var("BRANDHUB_DB_NS").unwrap_or(defaults.namespace),
            database: var("BRANDHUB_DB_NAME").unwrap_or(defaults.database),
            username: var("BRANDHUB_DB_USER").unwrap_or(defaults.username),
            password: var("BRANDHUB_DB_PASS").unwrap_or(defaults.password),
        };

        let mut auth = AuthConfig::default();
        if let Some(path) = var("BRANDHUB_JWT_PRIVATE_KEY_FILE") {
            auth.jwt_private_key_pem = fs::read_to_string(&path)
                .with_context(|| format!("read BRANDHUB_JWT_PRIVATE_KEY_FILE: {path}"))?;
        }
        if let Some(path) = var("BRANDHUB_JWT_PUBLIC_KEY_FILE") {
            auth.jwt_public_key_pem = fs::read_to_string(&path)
                .with_context(|| format!("read BRANDHUB_JWT_PUBLIC_KEY_FILE: {path}"))?;
        }
        if let Some(issuer) = var("BRANDHUB_JWT_ISSUER") {
            auth.jwt_issuer = issuer;
        }
        if let Some(ttl) = var("BRANDHUB_TOKEN_TTL_SECS") {
            auth.token_lifetime_secs = ttl
                .parse()
                .with_context(|| "parse BRANDHUB_TOKEN_TTL_SECS")?;
        }
        auth.pepper = var("BRANDHUB_PEPPER").filter(|p| !p.is_empty());
        if let Some(key) = var("BRANDHUB_CREDENTIAL_KEY") {
            auth.credential_encryption_key =
                parse_key(&key).with_context(|| "parse BRANDHUB_CREDENTIAL_KEY")?;
        }

        Ok(Self { db, auth })
    }

    /// Refuse to start with key material that was never configured.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_private_key_pem.is_empty() || self.auth.jwt_public_key_pem.is_empty() {
            bail!("JWT key files are not configured");
        }
        if self.auth.credential_encryption_key == [0u8; 32] {
            bail!("BRANDHUB_CREDENTIAL_KEY is not configured");
        }
        let ttl = self.auth.token_lifetime_secs;
        if ttl == 0 || ttl > MAX_TOKEN_LIFETIME_SECS {
            bail!("BRANDHUB_TOKEN_TTL_SECS must be between 1 and {MAX_TOKEN_LIFETIME_SECS}, got {ttl}");
        }
        Ok(())
    }
}

/// 64 hex characters, or base64 of exactly 32 bytes.
fn parse_key(value: &str) -> Result<[u8; 32]> {
    let value = value.trim();
    let bytes = if value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit()) {
        hex::decode(value).with_context(|| "decode hex key")?
    } else {
        STANDARD.decode(value).with_context(|| "decode base64 key")?
    };
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("key must be 32 bytes, got {}", b.len()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db.namespace, "brandhub");
        assert_eq!(config.db.database, "catalog");
        assert_eq!(config.auth.token_lifetime_secs, 86_400);
        assert!(config.auth.pepper.is_none());
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_are_read() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BRANDHUB_DB_URL", "db.internal:8000"),
            ("BRANDHUB_DB_NS", "prod"),
            ("BRANDHUB_TOKEN_TTL_SECS", "3600"),
            ("BRANDHUB_PEPPER", "pepper"),
            ("BRANDHUB_CREDENTIAL_KEY", &"ab".repeat(32)),
        ]))
        .unwrap();
        assert_eq!(config.db.url, "db.internal:8000");
        assert_eq!(config.db.namespace, "prod");
        assert_eq!(config.auth.token_lifetime_secs, 3600);
        assert_eq!(config.auth.pepper.as_deref(), Some("pepper"));
        assert_eq!(config.auth.credential_encryption_key, [0xab; 32]);
    }

    #[test]
    fn key_accepts_hex_and_base64() {
        assert_eq!(parse_key(&"01".repeat(32)).unwrap(), [1u8; 32]);
        assert_eq!(parse_key(&STANDARD.encode([7u8; 32])).unwrap(), [7u8; 32]);
        assert!(parse_key(&STANDARD.encode([7u8; 16])).is_err());
        assert!(parse_key("not a key").is_err());
    }

    fn configured(ttl: &str) -> ServerConfig {
        let mut config = ServerConfig::from_lookup(lookup(&[
            ("BRANDHUB_TOKEN_TTL_SECS", ttl),
            ("BRANDHUB_CREDENTIAL_KEY", &"ab".repeat(32)),
        ]))
        .unwrap();
        config.auth.jwt_private_key_pem = "private".into();
        config.auth.jwt_public_key_pem = "public".into();
        config
    }

    #[test]
    fn ttl_must_fit_the_token_clock() {
        assert!(configured("3600").validate().is_ok());
        assert!(configured("0").validate().is_err());

        let err = configured("18446744073709551615").validate().unwrap_err();
        assert!(err.to_string().contains("BRANDHUB_TOKEN_TTL_SECS"), "{err}");
        assert!(configured(&(i64::MAX as u64 + 1).to_string()).validate().is_err());
    }

    #[test]
    fn bad_ttl_is_an_error() {
        assert!(ServerConfig::from_lookup(lookup(&[("BRANDHUB_TOKEN_TTL_SECS", "soon")])).is_err());
    }
}
