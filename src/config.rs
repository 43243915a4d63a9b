use std::net::SocketAddr;

use anyhow::Context;

#[derive(Debug, Clone, PartialEq)]
pub struct OAuthKeys {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// sqlx connection string for the SQLite database
    pub database_url: String,
    pub max_db_connections: u32,

    pub bind_address: SocketAddr,
    /// Externally visible base URL, used to build OAuth redirect URLs
    pub public_url: String,

    pub session_inactivity_minutes: i64,

    pub google: Option<OAuthKeys>,
    pub github: Option<OAuthKeys>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://chat.db".to_owned(),
            max_db_connections: 16,
            bind_address: ([0, 0, 0, 0], 8080).into(),
            public_url: "http://localhost:8080".to_owned(),
            session_inactivity_minutes: 60,
            google: None,
            github: None,
        }
    }
}

impl AppConfig {
    /// Reads the process environment, honouring a `.env` file if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(max) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.max_db_connections = max
                .parse()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS={max} is not a number"))?;
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            config.bind_address = addr
                .parse()
                .with_context(|| format!("BIND_ADDRESS={addr} is not a socket address"))?;
        }
        if let Some(url) = lookup("PUBLIC_URL") {
            config.public_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(minutes) = lookup("SESSION_INACTIVITY_MINUTES") {
            config.session_inactivity_minutes = minutes
                .parse()
                .with_context(|| format!("SESSION_INACTIVITY_MINUTES={minutes} is not a number"))?;
        }

        let keys = |prefix: &str| {
            let client_id = lookup(&format!("{prefix}_CLIENT_ID"))?;
            let client_secret = lookup(&format!("{prefix}_CLIENT_SECRET"))?;
            Some(OAuthKeys { client_id, client_secret })
        };
        config.google = keys("GOOGLE");
        config.github = keys("GITHUB");

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("BIND_ADDRESS", "127.0.0.1:9000"),
            ("PUBLIC_URL", "https://chat.example.com/"),
            ("GITHUB_CLIENT_ID", "id"),
            ("GITHUB_CLIENT_SECRET", "secret"),
            ("GOOGLE_CLIENT_ID", "only-half"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_address.port(), 9000);
        assert_eq!(config.public_url, "https://chat.example.com");
        assert_eq!(config.github.unwrap().client_secret, "secret");
        assert!(config.google.is_none());
    }

    #[test]
    fn bad_numbers_fail() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_MAX_CONNECTIONS", "lots")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
    }
}
