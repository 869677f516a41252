use crate::error::InitError;
use std::time::Duration;
use url::Url;

pub const QDRANT_URL_VAR: &str = "QDRANT_URL";
pub const QDRANT_API_KEY_VAR: &str = "QDRANT_API_KEY";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Unvalidated settings. Credentials stay optional here so a missing value
/// surfaces as [`InitError::ConfigMissing`] on the first readiness check.
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub completion_model: String,
    pub request_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            qdrant_url: None,
            qdrant_api_key: None,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub qdrant_url: Url,
    pub qdrant_api_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub completion_model: String,
    pub request_timeout: Duration,
}

impl RagConfig {
    pub fn validate(&self) -> Result<ResolvedConfig, InitError> {
        let qdrant_url = present(&self.qdrant_url);
        let qdrant_api_key = present(&self.qdrant_api_key);
        let openai_api_key = present(&self.openai_api_key);

        let missing = [
            (QDRANT_URL_VAR, qdrant_url.is_none()),
            (QDRANT_API_KEY_VAR, qdrant_api_key.is_none()),
            (OPENAI_API_KEY_VAR, openai_api_key.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then(|| name.to_string()))
        .collect::<Vec<_>>();

        let (Some(qdrant_url), Some(qdrant_api_key), Some(openai_api_key)) =
            (qdrant_url, qdrant_api_key, openai_api_key)
        else {
            return Err(InitError::ConfigMissing { missing });
        };

        let qdrant_url = Url::parse(qdrant_url)
            .map_err(|error| InitError::InvalidConfig(format!("{QDRANT_URL_VAR}: {error}")))?;
        if !matches!(qdrant_url.scheme(), "http" | "https") {
            return Err(InitError::InvalidConfig(format!(
                "{QDRANT_URL_VAR} must be an http(s) url"
            )));
        }
        if self.embedding_dimensions == 0 {
            return Err(InitError::InvalidConfig(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            qdrant_url,
            qdrant_api_key: qdrant_api_key.to_string(),
            openai_api_key: openai_api_key.to_string(),
            openai_base_url: self.openai_base_url.clone(),
            embedding_model: self.embedding_model.clone(),
            embedding_dimensions: self.embedding_dimensions,
            completion_model: self.completion_model.clone(),
            request_timeout: self.request_timeout,
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
