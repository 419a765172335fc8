//! # Configuration
//!
//! Configuration structures and validation shared by the CLI and any embedding
//! application. Values come from defaults, then the process environment
//! (optionally seeded from a `.env` file), then CLI flags.
//!
//! ## Configuration Parameters
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CONSULT_AI_API_KEY` / `GEMINI_API_KEY` | none | AI service key; without it recommendations degrade to the placeholder |
//! | `CONSULT_AI_BASE_URL` | Google Generative Language v1beta | AI REST endpoint |
//! | `CONSULT_ANALYSIS_MODEL` | `gemini-2.5-flash` | Model used for recommendations |
//! | `CONSULT_IMAGE_MODEL` | `gemini-2.5-flash-image` | Model used for simulations |
//! | `CONSULT_AI_TIMEOUT_SECS` | 60 | Per-request timeout |
//! | `CONSULT_SUPABASE_URL` / `CONSULT_SUPABASE_KEY` | none | Catalog and auth backend; both or neither |
//! | `CONSULT_STORAGE_BUCKET` | `resources` | Bucket for catalog images |
//! | `CONSULT_MAX_IMAGE_DIM` | 1024 | Longest side after preprocessing, 64..=4096 |
//! | `CONSULT_JPEG_QUALITY` | 85 | Re-encode quality, 1..=100 |
//! | `CONSULT_PLACEHOLDER_ON_QUOTA` | true | Substitute demo data when the recommendation quota is exhausted |
//! | `CONSULT_SESSION_FILE` | `<data dir>/implant-consult/session.json` | Where the admin session is persisted |
//!
//! ## Examples
//!
//! ```rust
//! use implant_consult::config::ConsultConfig;
//!
//! let config = ConsultConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.max_image_dim, 1024);
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Default REST endpoint of the Generative Language API.
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for a consultation client.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsultConfig {
    /// AI service key. `None` puts the client in degraded mode.
    pub ai_api_key: Option<String>,
    /// Base URL of the AI REST API, without trailing slash.
    pub ai_base_url: String,
    /// Model answering recommendation requests.
    pub analysis_model: String,
    /// Model generating simulation images.
    pub image_model: String,
    /// Sampling temperature for recommendations.
    pub temperature: f32,
    /// Timeout applied to every AI request.
    pub ai_timeout_secs: u64,
    /// Project URL of the backend-as-a-service.
    pub supabase_url: Option<String>,
    /// Publishable (anon) key of the backend-as-a-service.
    pub supabase_key: Option<String>,
    /// Storage bucket for catalog images.
    pub storage_bucket: String,
    /// Longest side of preprocessed uploads, in pixels.
    pub max_image_dim: u32,
    /// JPEG quality used when re-encoding uploads.
    pub jpeg_quality: u8,
    /// Whether quota exhaustion on the recommendation path yields a placeholder.
    pub placeholder_on_quota: bool,
    /// Override for the persisted admin session location.
    pub session_file: Option<PathBuf>,
}

impl Default for ConsultConfig {
    fn default() -> Self {
        Self {
            ai_api_key: None,
            ai_base_url: DEFAULT_AI_BASE_URL.to_string(),
            analysis_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            temperature: 0.1,
            ai_timeout_secs: 60,
            supabase_url: None,
            supabase_key: None,
            storage_bucket: "resources".to_string(),
            max_image_dim: 1024,
            jpeg_quality: 85,
            placeholder_on_quota: true,
            session_file: None,
        }
    }
}

impl ConsultConfig {
    /// Load from the process environment after seeding it from `.env`, if present.
    pub fn from_env() -> Result<Self, String> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(format!("Failed to read .env: {}", e));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.ai_api_key = get("CONSULT_AI_API_KEY").or_else(|| get("GEMINI_API_KEY"));
        if let Some(url) = get("CONSULT_AI_BASE_URL") {
            config.ai_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("CONSULT_ANALYSIS_MODEL") {
            config.analysis_model = model;
        }
        if let Some(model) = get("CONSULT_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Some(secs) = get("CONSULT_AI_TIMEOUT_SECS") {
            config.ai_timeout_secs = parse_field("CONSULT_AI_TIMEOUT_SECS", &secs)?;
        }
        config.supabase_url = get("CONSULT_SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string());
        config.supabase_key = get("CONSULT_SUPABASE_KEY");
        if let Some(bucket) = get("CONSULT_STORAGE_BUCKET") {
            config.storage_bucket = bucket;
        }
        if let Some(dim) = get("CONSULT_MAX_IMAGE_DIM") {
            config.max_image_dim = parse_field("CONSULT_MAX_IMAGE_DIM", &dim)?;
        }
        if let Some(q) = get("CONSULT_JPEG_QUALITY") {
            config.jpeg_quality = parse_field("CONSULT_JPEG_QUALITY", &q)?;
        }
        if let Some(flag) = get("CONSULT_PLACEHOLDER_ON_QUOTA") {
            config.placeholder_on_quota = parse_bool("CONSULT_PLACEHOLDER_ON_QUOTA", &flag)?;
        }
        config.session_file = get("CONSULT_SESSION_FILE").map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if !(64..=4096).contains(&self.max_image_dim) {
            return Err("Max image dimension must be between 64 and 4096".to_string());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }
        if self.ai_timeout_secs == 0 {
            return Err("AI timeout must be greater than 0 seconds".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 2.0".to_string());
        }
        if !is_http_url(&self.ai_base_url) {
            return Err(format!("AI base URL must be http(s): {}", self.ai_base_url));
        }
        match (&self.supabase_url, &self.supabase_key) {
            (Some(url), Some(_)) if !is_http_url(url) => {
                return Err(format!("Backend URL must be http(s): {}", url));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err("Backend URL and key must be set together".to_string());
            }
            _ => {}
        }
        if self.storage_bucket.is_empty() || self.storage_bucket.contains('/') {
            return Err("Storage bucket must be a single path segment".to_string());
        }
        Ok(())
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }

    /// Whether a catalog/auth backend is configured.
    pub fn has_backend(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_key.is_some()
    }

    /// Resolved location of the persisted admin session.
    pub fn session_path(&self) -> PathBuf {
        self.session_file.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("implant-consult")
                .join("session.json")
        })
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid value for {}: {}", key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("Invalid value for {}: {}", key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ConsultConfig::default();
        assert_eq!(config.max_image_dim, 1024);
        assert_eq!(config.jpeg_quality, 85);
        assert_eq!(config.storage_bucket, "resources");
        assert!(config.placeholder_on_quota);
        assert!(!config.has_backend());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ConsultConfig::default();
        assert!(config.validate().is_ok());

        config.max_image_dim = 10;
        assert!(config.validate().is_err());
        config.max_image_dim = 1024;

        config.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.jpeg_quality = 85;

        config.supabase_url = Some("https://x.supabase.co".into());
        assert!(config.validate().is_err());
        config.supabase_key = Some("anon".into());
        assert!(config.validate().is_ok());

        config.supabase_url = Some("ftp://x".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = ConsultConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k-1"),
            ("CONSULT_AI_BASE_URL", "http://localhost:9000/v1beta/"),
            ("CONSULT_MAX_IMAGE_DIM", "768"),
            ("CONSULT_PLACEHOLDER_ON_QUOTA", "off"),
            ("CONSULT_SUPABASE_URL", "https://demo.supabase.co/"),
            ("CONSULT_SUPABASE_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(config.ai_api_key.as_deref(), Some("k-1"));
        assert_eq!(config.ai_base_url, "http://localhost:9000/v1beta");
        assert_eq!(config.max_image_dim, 768);
        assert!(!config.placeholder_on_quota);
        assert_eq!(config.supabase_url.as_deref(), Some("https://demo.supabase.co"));
    }

    #[test]
    fn primary_key_wins_and_blank_is_unset() {
        let config = ConsultConfig::from_lookup(lookup(&[
            ("CONSULT_AI_API_KEY", "primary"),
            ("GEMINI_API_KEY", "fallback"),
            ("CONSULT_STORAGE_BUCKET", "   "),
        ]))
        .unwrap();
        assert_eq!(config.ai_api_key.as_deref(), Some("primary"));
        assert_eq!(config.storage_bucket, "resources");
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = ConsultConfig::from_lookup(lookup(&[("CONSULT_JPEG_QUALITY", "high")])).unwrap_err();
        assert!(err.contains("CONSULT_JPEG_QUALITY"));
    }

    #[test]
    fn explicit_session_file_is_used() {
        let config = ConsultConfig {
            session_file: Some(PathBuf::from("/tmp/s.json")),
            ..ConsultConfig::default()
        };
        assert_eq!(config.session_path(), PathBuf::from("/tmp/s.json"));
    }
}
