//! HTTP transport for the MAAS REST API.

use std::time::Duration;

use chrono::Utc;
use fleetsync_core::ApiError;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::config::ClientConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Form-encoded request body. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form(Vec<(String, String)>);

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.push((key.into(), value.to_string()));
        self
    }

    /// Adds the field only when a value is present.
    pub fn opt<T: ToString>(self, key: impl Into<String>, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    /// Adds one field per value under the same key.
    pub fn repeat<I>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        for value in values {
            self = self.set(key, value);
        }
        self
    }

    /// Adds the values joined by `separator` unless there are none.
    pub fn joined(self, key: &str, values: &[String], separator: &str) -> Self {
        if values.is_empty() {
            self
        } else {
            self.set(key, values.join(separator))
        }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Client for a MAAS region controller.
pub struct MaasClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl MaasClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str, op: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self
            .config
            .api_root
            .join(path)
            .map_err(|e| ApiError::Request(format!("invalid path {path}: {e}")))?;
        if let Some(op) = op {
            url.query_pairs_mut().append_pair("op", op);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        op: Option<&str>,
        form: Option<&Form>,
    ) -> Result<Response, ApiError> {
        let url = self.url(path, op)?;
        debug!(%method, path, op, "MAAS request");

        let nonce = Uuid::new_v4().to_string();
        let authorization = self
            .config
            .api_key
            .authorization(&nonce, Utc::now().timestamp());
        let mut request = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, "application/json");
        if let Some(form) = form {
            request = request.form(form.pairs());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            debug!(status = status.as_u16(), path, "MAAS request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, None, None).await?;
        Self::decode(response).await
    }

    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        op: Option<&str>,
        form: &Form,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::POST, path, op, Some(form)).await?;
        Self::decode(response).await
    }

    /// POST whose response body is not needed.
    pub async fn post_discard(&self, path: &str, op: &str, form: &Form) -> Result<(), ApiError> {
        self.send(Method::POST, path, Some(op), Some(form)).await?;
        Ok(())
    }

    pub async fn put_form<T: DeserializeOwned>(&self, path: &str, form: &Form) -> Result<T, ApiError> {
        let response = self.send(Method::PUT, path, None, Some(form)).await?;
        Self::decode(response).await
    }

    pub async fn delete_path(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None, None).await?;
        Ok(())
    }
}
