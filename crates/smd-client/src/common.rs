//! Common utilities for the SMD API client
//!
//! Authenticated request plumbing shared by every endpoint.

use crate::error::SmdError;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// HTTP client wrapper with optional bearer authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.get(url).header("Accept", "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Make a GET request and decode the JSON body
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, SmdError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self.request(&url).send().await.map_err(SmdError::Http)?;

        let status = response.status();
        if status == 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(SmdError::NotFound(format!("Resource not found: {path} - {body}")));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmdError::Api(format!("GET {path} failed: {status} - {body}")));
        }

        let text = response.text().await?;
        Self::decode(&text)
    }

    /// Decode a JSON body, keeping the start of it for diagnostics
    pub fn decode<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, SmdError> {
        serde_json::from_str(text).map_err(|source| SmdError::Serialization {
            source,
            body: text.chars().take(500).collect(),
        })
    }

    /// Make a GET request that only checks for a success status
    pub async fn probe(&self, path: &str) -> Result<(), SmdError> {
        let url = self.build_url(path);
        debug!("Probing {}", url);

        let response = self.request(&url).send().await.map_err(SmdError::Http)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmdError::Api(format!("{path} not ready: {status} - {body}")));
        }
        Ok(())
    }

    /// Build query string from filters
    pub fn build_query_string(filters: &[(&str, &str)]) -> String {
        filters
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Append an encoded query string to `path`
    pub fn with_query(path: &str, filters: &[(&str, &str)]) -> String {
        if filters.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, Self::build_query_string(filters))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let http = HttpClient::new(Client::new(), "http://smd:27779/", None);
        assert_eq!(http.base_url(), "http://smd:27779");
        assert_eq!(http.build_url("/hsm/v2/groups"), "http://smd:27779/hsm/v2/groups");
        assert_eq!(http.build_url("http://other/x"), "http://other/x");
    }

    #[test]
    fn test_decode_failure_keeps_body_snippet() {
        let body = format!("<html>{}</html>", "x".repeat(600));
        let err = HttpClient::decode::<Vec<String>>(&body).unwrap_err();
        match err {
            SmdError::Serialization { body: snippet, .. } => {
                assert_eq!(snippet.chars().count(), 500);
                assert!(snippet.starts_with("<html>"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(HttpClient::decode::<Vec<String>>(r#"["a"]"#).unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn test_query_encoding() {
        assert_eq!(HttpClient::with_query("/a", &[]), "/a");
        assert_eq!(
            HttpClient::with_query("/a", &[("type", "Node"), ("role", "Compute Node")]),
            "/a?type=Node&role=Compute%20Node"
        );
    }
}
