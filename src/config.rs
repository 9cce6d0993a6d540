use crate::errors::AppError;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_PORT: u16 = 8080;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub model: String,
    pub api_base_url: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests don't touch the environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let api_key = lookup("GOOGLE_GENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(AppError::MissingConfig { name: "GOOGLE_GENAI_API_KEY" })?;

        let model = lookup("GEMINI_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let api_base_url = lookup("GEMINI_API_BASE_URL")
            .filter(|u| !u.trim().is_empty())
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self { api_key, model, api_base_url, port })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn api_key_is_required() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, AppError::MissingConfig { name: "GOOGLE_GENAI_API_KEY" }));

        let err = AppConfig::from_lookup(lookup_from(&[("GOOGLE_GENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, AppError::MissingConfig { .. }));
    }

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_lookup(lookup_from(&[("GOOGLE_GENAI_API_KEY", "k")])).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.api_base_url, "https://generativelanguage.googleapis.com");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn overrides_apply() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_GENAI_API_KEY", "k"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("GEMINI_API_BASE_URL", "http://localhost:9000/"),
            ("PORT", "not-a-port"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.api_base_url, "http://localhost:9000");
        assert_eq!(config.port, 8080);
    }
}
