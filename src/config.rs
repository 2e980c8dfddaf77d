//! Application configuration loaded from environment variables.
//!
//! The backend URL and public API key are required; a missing value is a
//! startup error and the server never binds its listener.

use std::env;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Supabase project URL (no trailing slash)
    pub supabase_url: String,
    /// Supabase public ("anon") API key
    pub supabase_anon_key: String,
    /// Public URL of this site, used for confirmation links and cookie security
    pub site_url: String,
    /// Server port
    pub port: u16,
    /// Timeout for calls to the backend
    pub backend_timeout: Duration,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            site_url: "http://localhost:3000".to_string(),
            port: 3000,
            backend_timeout: Duration::from_secs(10),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let supabase_url = required("SUPABASE_URL")?;
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "SUPABASE_URL",
                reason: "must be an http(s) URL".to_string(),
            });
        }

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key: required("SUPABASE_ANON_KEY")?,
            site_url: env::var("SITE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            backend_timeout: Duration::from_secs(
                env::var("BACKEND_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        })
    }

    /// Cookies are marked `Secure` whenever the site is served over HTTPS.
    pub fn secure_cookies(&self) -> bool {
        self.site_url.starts_with("https://")
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Single test so the env mutations do not race each other.
        env::set_var("SUPABASE_URL", "https://project.supabase.co/");
        env::set_var("SUPABASE_ANON_KEY", " anon ");
        env::set_var("SITE_URL", "https://fitforge.example.com");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.supabase_url, "https://project.supabase.co");
        assert_eq!(config.supabase_anon_key, "anon");
        assert_eq!(config.port, 3000);
        assert!(config.secure_cookies());

        env::set_var("SUPABASE_ANON_KEY", "");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("SUPABASE_ANON_KEY"))
        ));

        env::set_var("SUPABASE_ANON_KEY", "anon");
        env::set_var("SUPABASE_URL", "project.supabase.co");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid {
                name: "SUPABASE_URL",
                ..
            })
        ));

        env::remove_var("SUPABASE_URL");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("SUPABASE_URL"))
        ));
        env::remove_var("SUPABASE_ANON_KEY");
        env::remove_var("SITE_URL");
    }

    #[test]
    fn test_default_site_is_not_secure() {
        assert!(!Config::test_default().secure_cookies());
    }
}
