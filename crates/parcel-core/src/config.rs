//! Process configuration, loaded once from the environment (and `.env`) by
//! each binary and passed down explicitly.

use std::path::PathBuf;

use thiserror::Error;

const PLACEHOLDER_TOKEN: &str = "your_bot_token_here";
const PLACEHOLDER_WEBAPP_URL: &str = "https://your-webapp-url.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Bot API token. Also the root of the WebApp `initData` signing key.
    pub bot_token: String,

    pub database_path: PathBuf,

    /// WebApp URL; `None` when unset or still the sample value.
    pub webapp_url: Option<String>,

    /// Chat that receives operational notifications.
    pub log_group_id: Option<i64>,

    /// Users created with the admin role on first contact.
    pub admin_ids: Vec<i64>,

    /// Static bearer accepted by the admin maintenance endpoints.
    pub test_api_token: Option<String>,

    pub host: String,
    pub port: u16,

    /// Capacity of the outbound notification queue.
    pub notify_queue_capacity: usize,

    /// Mark the session cookie `Secure`.
    pub session_cookie_secure: bool,

    /// Hand new client orders to the longest-registered manager.
    pub auto_assign_orders: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            database_path: PathBuf::from("data/bot_database.db"),
            webapp_url: None,
            log_group_id: None,
            admin_ids: Vec::new(),
            test_api_token: None,
            host: "0.0.0.0".to_string(),
            port: 5000,
            notify_queue_capacity: 256,
            session_cookie_secure: false,
            auto_assign_orders: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let webapp_url = var("WEBAPP_URL").filter(|url| url != PLACEHOLDER_WEBAPP_URL);

        let log_group_id = match var("LOG_GROUP_ID") {
            Some(raw) => Some(parse_value("LOG_GROUP_ID", &raw)?),
            None => None,
        };

        let admin_ids = match var("ADMIN_IDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| parse_value("ADMIN_IDS", id))
                .collect::<Result<Vec<i64>, _>>()?,
            None => Vec::new(),
        };

        let port = match var("PORT") {
            Some(raw) => parse_value("PORT", &raw)?,
            None => defaults.port,
        };

        Ok(Self {
            bot_token: var("BOT_TOKEN").unwrap_or_default(),
            database_path: var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            webapp_url,
            log_group_id,
            admin_ids,
            test_api_token: var("TEST_API_TOKEN"),
            host: var("HOST").unwrap_or(defaults.host),
            port,
            notify_queue_capacity: var("NOTIFY_QUEUE_CAPACITY")
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.notify_queue_capacity),
            session_cookie_secure: flag(var("SESSION_COOKIE_SECURE")),
            auto_assign_orders: flag(var("AUTO_ASSIGN_ORDERS")),
        })
    }

    /// False when the token is empty or still the sample value.
    pub fn has_bot_token(&self) -> bool {
        !self.bot_token.is_empty() && self.bot_token != PLACEHOLDER_TOKEN
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn flag(raw: Option<String>) -> bool {
    matches!(raw.as_deref(), Some("true") | Some("TRUE") | Some("1"))
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("data/bot_database.db"));
        assert_eq!(config.listen_addr(), "0.0.0.0:5000");
        assert_eq!(config.notify_queue_capacity, 256);
        assert!(!config.has_bot_token());
        assert!(config.admin_ids.is_empty());
        assert!(!config.auto_assign_orders);
    }

    #[test]
    fn parses_lists_and_drops_placeholders() {
        let config = config(&[
            ("BOT_TOKEN", "your_bot_token_here"),
            ("WEBAPP_URL", "https://your-webapp-url.com"),
            ("ADMIN_IDS", "1, 2,,3"),
            ("LOG_GROUP_ID", "-100123"),
            ("SESSION_COOKIE_SECURE", "1"),
            ("AUTO_ASSIGN_ORDERS", "true"),
        ])
        .unwrap();
        assert!(!config.has_bot_token());
        assert_eq!(config.webapp_url, None);
        assert_eq!(config.admin_ids, vec![1, 2, 3]);
        assert_eq!(config.log_group_id, Some(-100123));
        assert!(config.session_cookie_secure);
        assert!(config.auto_assign_orders);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = config(&[("ADMIN_IDS", "1,abc")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "ADMIN_IDS",
                value: "abc".to_string()
            }
        );
        assert!(config(&[("PORT", "http")]).is_err());
    }
}
