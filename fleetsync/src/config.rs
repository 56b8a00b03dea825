//! Client configuration: service URL and API credentials.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key must have the form consumer:token:secret")]
    MalformedApiKey,

    #[error("invalid API URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// The three-part API key issued by the fleet service.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub consumer_key: String,
    pub token_key: String,
    pub token_secret: String,
}

impl ApiKey {
    /// OAuth 1.0 PLAINTEXT `Authorization` header value.
    ///
    /// The consumer secret is always empty, so the signature is the
    /// percent-encoded `&` followed by the token secret.
    pub fn authorization(&self, nonce: &str, timestamp: i64) -> String {
        format!(
            "OAuth oauth_version=\"1.0\", oauth_signature_method=\"PLAINTEXT\", \
             oauth_consumer_key=\"{}\", oauth_token=\"{}\", oauth_signature=\"%26{}\", \
             oauth_nonce=\"{}\", oauth_timestamp=\"{}\"",
            self.consumer_key, self.token_key, self.token_secret, nonce, timestamp
        )
    }
}

impl FromStr for ApiKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(consumer), Some(token), Some(secret), None)
                if !consumer.is_empty() && !token.is_empty() && !secret.is_empty() =>
            {
                Ok(Self {
                    consumer_key: consumer.to_string(),
                    token_key: token.to_string(),
                    token_secret: secret.to_string(),
                })
            }
            _ => Err(ConfigError::MalformedApiKey),
        }
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("consumer_key", &self.consumer_key)
            .field("token_key", &self.token_key)
            .field("token_secret", &"***")
            .finish()
    }
}

/// Where and how to reach the fleet service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root of the versioned API, always ending in `/`.
    pub api_root: reqwest::Url,
    pub api_key: ApiKey,
}

impl ClientConfig {
    /// Accepts either the service URL (`http://host:5240/MAAS`) or the
    /// versioned API root (`…/api/2.0/`).
    pub fn new(api_url: &str, api_key: ApiKey) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidUrl {
            url: api_url.to_string(),
            reason,
        };

        let mut base = api_url.trim_end_matches('/').to_string();
        if !base.ends_with("/api/2.0") {
            base.push_str("/api/2.0");
        }
        base.push('/');

        let api_root = reqwest::Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        if !matches!(api_root.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", api_root.scheme())));
        }

        Ok(Self { api_root, api_key })
    }
}
