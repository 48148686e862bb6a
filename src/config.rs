use std::time::Duration;
use tracing::warn;

pub const DEMO_API_KEY: &str = "DEMO_KEY";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub generation_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            gemini_api_key: DEMO_API_KEY.to_string(),
            gemini_api_base: DEFAULT_API_BASE.to_string(),
            gemini_model: DEFAULT_MODEL.to_string(),
            generation_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Reads configuration from the process environment. Call after `dotenv::dotenv()`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: parse_or("PORT", lookup("PORT"), defaults.port),
            gemini_api_key: lookup("GEMINI_API_KEY").unwrap_or(defaults.gemini_api_key),
            gemini_api_base: lookup("GEMINI_API_BASE").unwrap_or(defaults.gemini_api_base),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            generation_timeout: Duration::from_secs(parse_or(
                "GENERATION_TIMEOUT_SECS",
                lookup("GENERATION_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.gemini_api_key == DEMO_API_KEY
    }

    /// Key prefix safe to print in logs.
    pub fn masked_api_key(&self) -> String {
        let prefix: String = self.gemini_api_key.chars().take(10).collect();
        format!("{prefix}...")
    }
}

fn parse_or<T: std::str::FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("⚠️ Ignoring invalid {}={:?}, using default", key, value);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.generation_timeout, Duration::from_secs(30));
        assert!(config.is_demo());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("GEMINI_API_KEY", "abcdefghijklmnop"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("GENERATION_TIMEOUT_SECS", "5"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.generation_timeout, Duration::from_secs(5));
        assert!(!config.is_demo());
        assert_eq!(config.masked_api_key(), "abcdefghij...");
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[("PORT", "not-a-port"), ("GENERATION_TIMEOUT_SECS", "-3")]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.generation_timeout, Duration::from_secs(30));
    }
}
