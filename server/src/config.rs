use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::auth::config::AuthConfig;
use crate::engine::validation::MIN_JOIN_CODE_LENGTH;

/// Top-level server configuration, loaded from classhall.toml.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub auth: AuthSection,
    pub communities: CommunitySection,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub web_address: String,
    /// Upper bound on JSON request bodies, in kilobytes.
    pub max_body_kb: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            web_address: "0.0.0.0:8080".into(),
            max_body_kb: 64,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite:classhall.db?mode=rwc".into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub jwt_secret: String,
    pub session_expiry_hours: i64,
    pub public_url: String,
}

impl Default for AuthSection {
    fn default() -> Self {
        let defaults = AuthConfig::default();
        Self {
            jwt_secret: defaults.jwt_secret,
            session_expiry_hours: defaults.session_expiry_hours,
            public_url: defaults.public_url,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct CommunitySection {
    pub join_code_length: usize,
}

impl Default for CommunitySection {
    fn default() -> Self {
        Self {
            join_code_length: 8,
        }
    }
}

impl ServerConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> Result<Self, String> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read config file {}: {}", path, e))?;
            Self::from_toml(&contents)
                .map_err(|e| format!("failed to parse config file {}: {}", path, e))?
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("WEB_ADDRESS") {
            self.server.web_address = v;
        }
        if let Ok(v) = std::env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Ok(v) = std::env::var("SESSION_EXPIRY_HOURS")
            && let Ok(hours) = v.parse()
        {
            self.auth.session_expiry_hours = hours;
        }
        if let Ok(v) = std::env::var("PUBLIC_URL") {
            self.auth.public_url = v;
        }
        if let Ok(v) = std::env::var("JOIN_CODE_LENGTH")
            && let Ok(len) = v.parse()
        {
            self.communities.join_code_length = len;
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.communities.join_code_length < MIN_JOIN_CODE_LENGTH {
            return Err(format!(
                "join_code_length must be at least {}",
                MIN_JOIN_CODE_LENGTH
            ));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err("jwt_secret must not be empty".into());
        }
        Ok(())
    }

    /// Convert into an AuthConfig for the auth layer.
    pub fn to_auth_config(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.auth.jwt_secret.clone(),
            session_expiry_hours: self.auth.session_expiry_hours,
            public_url: self.auth.public_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.server.web_address, "0.0.0.0:8080");
        assert_eq!(config.database.url, "sqlite:classhall.db?mode=rwc");
        assert_eq!(config.communities.join_code_length, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            [database]
            url = "sqlite::memory:"

            [communities]
            join_code_length = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.communities.join_code_length, 10);
        assert_eq!(config.auth.session_expiry_hours, 720);
    }

    #[test]
    fn test_short_join_code_rejected() {
        let config = ServerConfig::from_toml("[communities]\njoin_code_length = 3\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_auth_config() {
        let config = ServerConfig::from_toml("[auth]\njwt_secret = \"s3cret\"\n").unwrap();
        let auth = config.to_auth_config();
        assert_eq!(auth.jwt_secret, "s3cret");
        assert_eq!(auth.public_url, "http://localhost:8080");
    }
}
