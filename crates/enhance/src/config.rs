//! Azure OpenAI connection settings.

use std::fmt;

/// API version used when `AZURE_OPENAI_API_VERSION` is unset.
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Deployment used when `AZURE_OPENAI_DEPLOYMENT` is unset.
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4.1-mini";

#[derive(Debug, thiserror::Error)]
pub enum EnhanceConfigError {
    #[error("AZURE_OPENAI_ENDPOINT must be an http(s) URL, got '{0}'")]
    InvalidEndpoint(String),
    #[error("AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY must be set together")]
    IncompleteCredentials,
}

pub type EnhanceConfigResult<T> = std::result::Result<T, EnhanceConfigError>;

#[derive(Clone, PartialEq, Eq)]
pub struct AzureOpenAiConfig {
    endpoint: String,
    api_key: String,
    api_version: String,
    deployment: String,
}

impl fmt::Debug for AzureOpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAiConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .finish()
    }
}

impl AzureOpenAiConfig {
    /// Build a config from optional environment values without reading the environment.
    ///
    /// Returns `Ok(None)` when neither endpoint nor key is set, meaning enhancement is
    /// disabled. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceConfigError`] if only one of endpoint and key is set, or the endpoint
    /// is not an http(s) URL.
    pub fn from_env_values(
        endpoint: Option<String>,
        api_key: Option<String>,
        api_version: Option<String>,
        deployment: Option<String>,
    ) -> EnhanceConfigResult<Option<Self>> {
        let non_blank = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        let (endpoint, api_key) = match (non_blank(endpoint), non_blank(api_key)) {
            (None, None) => return Ok(None),
            (Some(endpoint), Some(key)) => (endpoint, key),
            _ => return Err(EnhanceConfigError::IncompleteCredentials),
        };

        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(EnhanceConfigError::InvalidEndpoint(endpoint));
        }

        Ok(Some(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            api_version: non_blank(api_version).unwrap_or_else(|| DEFAULT_API_VERSION.into()),
            deployment: non_blank(deployment).unwrap_or_else(|| DEFAULT_DEPLOYMENT.into()),
        }))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Chat-completions URL for the configured deployment.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}
