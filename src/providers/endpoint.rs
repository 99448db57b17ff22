/*!
 * HTTP clients for the supported translation backends.
 *
 * Each endpoint translates one piece of text per call. Batching, retries and
 * fallbacks are layered on top by the adapters.
 */

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProviderError;

/// A backend that translates a single text
#[async_trait]
pub trait TextEndpoint: Send + Sync + Debug {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Translate one text. The text may contain line breaks.
    async fn translate_text(&self, text: &str, source: &str, target: &str) -> Result<String, ProviderError>;
}

fn build_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_default()
}

fn map_send_error(error: reqwest::Error, timeout: Duration) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(timeout.as_secs())
    } else {
        ProviderError::from(error)
    }
}

async fn check_status(response: reqwest::Response, backend: &str) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    error!("{} API error ({}): {}", backend, status, message);

    if status == StatusCode::TOO_MANY_REQUESTS {
        Err(ProviderError::RateLimitExceeded(message))
    } else {
        Err(ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        })
    }
}

/// Google's public web translation endpoint (`translate_a/single`)
#[derive(Debug, Clone)]
pub struct GoogleWebEndpoint {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl GoogleWebEndpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Concatenate the translated segments of a `translate_a/single` response
    pub fn parse_response(body: &Value) -> Result<String, ProviderError> {
        let segments = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("missing segment array".to_string()))?;

        let text: String = segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(Value::as_str))
            .collect();

        if text.is_empty() {
            return Err(ProviderError::BadResponse("empty translation".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl TextEndpoint for GoogleWebEndpoint {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate_text(&self, text: &str, source: &str, target: &str) -> Result<String, ProviderError> {
        let url = format!("{}/translate_a/single", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let response = check_status(response, "Google").await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Self::parse_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: MyMemoryData,
    #[serde(rename = "responseStatus", default)]
    response_status: Value,
}

#[derive(Debug, Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText", default)]
    translated_text: String,
}

/// MyMemory REST API (`GET /get?q=..&langpair=src|dst`)
#[derive(Debug, Clone)]
pub struct MyMemoryEndpoint {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl MyMemoryEndpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl TextEndpoint for MyMemoryEndpoint {
    fn name(&self) -> &str {
        "mymemory"
    }

    async fn translate_text(&self, text: &str, source: &str, target: &str) -> Result<String, ProviderError> {
        let url = format!("{}/get", self.base_url);
        let langpair = format!("{}|{}", source, target);
        let response = self
            .client
            .get(&url)
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let response = check_status(response, "MyMemory").await?;
        let body: MyMemoryResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        // the status is a number or a numeric string depending on the error path
        let status = match &body.response_status {
            Value::Number(n) => n.as_u64().unwrap_or(200),
            Value::String(s) => s.parse().unwrap_or(200),
            _ => 200,
        };
        if status == 429 {
            return Err(ProviderError::RateLimitExceeded(body.response_data.translated_text));
        }
        if status != 200 {
            return Err(ProviderError::ApiError {
                status_code: status as u16,
                message: body.response_data.translated_text,
            });
        }
        if body.response_data.translated_text.trim().is_empty() {
            return Err(ProviderError::BadResponse("empty translation".to_string()));
        }
        Ok(body.response_data.translated_text)
    }
}

#[derive(Debug, Serialize)]
struct LibreTranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct LibreTranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Self-hosted LibreTranslate server (`POST /translate`)
#[derive(Debug, Clone)]
pub struct LibreTranslateEndpoint {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl LibreTranslateEndpoint {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout,
        }
    }

    /// Whether the server answers `GET /languages` with 200
    pub async fn is_running(&self) -> bool {
        let url = format!("{}/languages", self.base_url);
        match self.client.get(&url).timeout(Duration::from_secs(2)).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("LibreTranslate language list request failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl TextEndpoint for LibreTranslateEndpoint {
    fn name(&self) -> &str {
        "libretranslate"
    }

    async fn translate_text(&self, text: &str, source: &str, target: &str) -> Result<String, ProviderError> {
        let url = format!("{}/translate", self.base_url);
        let request = LibreTranslateRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let response = check_status(response, "LibreTranslate").await?;
        let body: LibreTranslateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(body.translated_text)
    }
}
