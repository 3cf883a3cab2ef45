use crate::error::{AppError, Result};
use crate::options::{AspectRatio, ModelTier};
use dotenvy::dotenv;
use std::env;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    /// Billing-enabled key selected up front, if any.
    pub paid_api_key: Option<String>,
    pub base_url: Url,
    pub default_model: ModelTier,
    pub default_aspect_ratio: AspectRatio,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let api_key = non_empty_var("GEMINI_API_KEY")
            .or_else(|| non_empty_var("API_KEY"))
            .ok_or_else(|| AppError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let base_url = match non_empty_var("GEMINI_BASE_URL") {
            Some(raw) => parse_base_url(&raw)?,
            None => parse_base_url(DEFAULT_BASE_URL)?,
        };

        let default_model = non_empty_var("LUMINA_DEFAULT_MODEL")
            .map(|m| m.parse::<ModelTier>())
            .transpose()
            .map_err(|e| AppError::config(format!("LUMINA_DEFAULT_MODEL: {}", e)))?
            .unwrap_or_default();

        let default_aspect_ratio = non_empty_var("LUMINA_DEFAULT_ASPECT_RATIO")
            .map(|r| r.parse::<AspectRatio>())
            .transpose()
            .map_err(|e| AppError::config(format!("LUMINA_DEFAULT_ASPECT_RATIO: {}", e)))?
            .unwrap_or_default();

        Ok(Self {
            gemini_api_key: api_key,
            paid_api_key: non_empty_var("GEMINI_PAID_API_KEY"),
            base_url,
            default_model,
            default_aspect_ratio,
        })
    }

    /// Builds a config around a single key with every other setting at its default.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            gemini_api_key: api_key.into(),
            paid_api_key: None,
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            default_model: ModelTier::default(),
            default_aspect_ratio: AspectRatio::default(),
        })
    }
}

/// Parses an endpoint root, making sure it ends with `/` so relative joins keep the path.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|e| AppError::config(format!("Invalid base URL: {}", e)))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = parse_base_url("http://127.0.0.1:8080/v1beta").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/v1beta/");
        let joined = url.join("models/x:generateContent").unwrap();
        assert_eq!(joined.path(), "/v1beta/models/x:generateContent");
    }

    #[test]
    fn garbage_base_url_is_a_config_error() {
        assert!(matches!(parse_base_url("not a url"), Err(AppError::Config(_))));
    }

    #[test]
    fn with_api_key_uses_defaults() {
        let config = Config::with_api_key("k").unwrap();
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.default_model, ModelTier::Flash);
        assert!(config.paid_api_key.is_none());
    }
}
