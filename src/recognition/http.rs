//! HTTP recognition backend
//!
//! Each request runs as its own task on a tokio runtime and writes its
//! outcome into the request's [`RequestHandle`]. Nothing here blocks the
//! dot-processing thread.

use super::http_retry::{send_with_retry, RetryPolicy};
use super::request::RequestHandle;
use super::service::{HandwritingRequest, OcrRequest, RecognitionService};
use crate::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION: &str = "Operation-Location";

/// Recognition service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Base URL of the recognition service; unset disables recognition
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub max_retries: u32,
    pub request_timeout_ms: u64,
    pub handwriting_poll_attempts: u32,
    pub handwriting_poll_interval_ms: u64,
    /// Force-fail a queue head older than this; unset blocks forever
    pub head_timeout_ms: Option<u64>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            max_retries: 3,
            request_timeout_ms: 10_000,
            handwriting_poll_attempts: 10,
            handwriting_poll_interval_ms: 1000,
            head_timeout_ms: None,
        }
    }
}

impl RecognitionConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_retries == 0 {
            errors.push("recognition.max_retries must be at least 1".to_string());
        }
        if self.request_timeout_ms == 0 {
            errors.push("recognition.request_timeout_ms must be positive".to_string());
        }
        if self.handwriting_poll_attempts == 0 {
            errors.push("recognition.handwriting_poll_attempts must be at least 1".to_string());
        }
        if self.head_timeout_ms == Some(0) {
            errors.push("recognition.head_timeout_ms must be positive when set".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                errors.push(format!("recognition.endpoint is not an http(s) URL: {}", endpoint));
            }
        }
        errors
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            ..RetryPolicy::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    regions: Vec<OcrRegion>,
}

#[derive(Debug, Deserialize)]
struct OcrRegion {
    #[serde(default)]
    lines: Vec<OcrLine>,
}

#[derive(Debug, Deserialize)]
struct OcrLine {
    #[serde(default)]
    words: Vec<OcrWord>,
}

#[derive(Debug, Deserialize)]
struct OcrWord {
    text: String,
}

impl OcrResponse {
    fn text(&self) -> String {
        self.regions
            .iter()
            .flat_map(|r| &r.lines)
            .flat_map(|l| &l.words)
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandwritingOperation {
    status: String,
    #[serde(default)]
    recognition_result: Option<HandwritingResult>,
}

#[derive(Debug, Deserialize)]
struct HandwritingResult {
    #[serde(default)]
    lines: Vec<HandwritingLine>,
}

#[derive(Debug, Deserialize)]
struct HandwritingLine {
    text: String,
}

impl HandwritingOperation {
    fn text(&self) -> String {
        self.recognition_result
            .as_ref()
            .map(|r| {
                r.lines
                    .iter()
                    .map(|l| l.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct HandwritingBody<'a> {
    pattern: String,
    strokes: &'a [Vec<(f64, f64)>],
    page_size: (f64, f64),
    region: Option<crate::geometry::BoundingBox>,
}

/// Recognition over HTTP
pub struct HttpRecognizer {
    client: Client,
    runtime: Handle,
    config: RecognitionConfig,
    endpoint: String,
}

impl HttpRecognizer {
    /// Create a recognizer that spawns its requests on `runtime`
    pub fn new(config: RecognitionConfig, runtime: Handle) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| Error::Config("recognition.endpoint is not set".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::Recognition(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            runtime,
            config,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }
}

async fn run_ocr(
    client: Client,
    url: String,
    api_key: Option<String>,
    policy: RetryPolicy,
    request: OcrRequest,
) -> std::result::Result<String, String> {
    let response = send_with_retry(
        &client,
        |c| {
            let builder = c.post(&url).json(&request);
            match &api_key {
                Some(key) => builder.header(API_KEY_HEADER, key),
                None => builder,
            }
        },
        policy,
        "ocr",
    )
    .await?;

    let body: OcrResponse = response
        .json()
        .await
        .map_err(|e| format!("ocr: malformed response: {}", e))?;
    Ok(body.text())
}

async fn run_handwriting(
    client: Client,
    url: String,
    api_key: Option<String>,
    config: RecognitionConfig,
    request: HandwritingRequest,
) -> std::result::Result<String, String> {
    let policy = config.retry_policy();
    let body = HandwritingBody {
        pattern: request.pattern.to_string(),
        strokes: &request.strokes,
        page_size: request.page_size,
        region: request.region(),
    };
    let with_key = |builder: reqwest::RequestBuilder| match &api_key {
        Some(key) => builder.header(API_KEY_HEADER, key),
        None => builder,
    };

    let response = send_with_retry(&client, |c| with_key(c.post(&url).json(&body)), policy, "handwriting").await?;
    let operation = response
        .headers()
        .get(OPERATION_LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| "handwriting: response has no Operation-Location".to_string())?;

    let interval = Duration::from_millis(config.handwriting_poll_interval_ms);
    for attempt in 0..config.handwriting_poll_attempts {
        tokio::time::sleep(interval).await;
        let response = send_with_retry(&client, |c| with_key(c.get(&operation)), policy, "handwriting poll").await?;
        let state: HandwritingOperation = response
            .json()
            .await
            .map_err(|e| format!("handwriting: malformed operation status: {}", e))?;
        debug!("Handwriting operation status {} (poll {})", state.status, attempt + 1);
        match state.status.as_str() {
            "Succeeded" => return Ok(state.text()),
            "Failed" => return Err("handwriting: operation failed".to_string()),
            _ => {}
        }
    }
    Err("Timeout Error".to_string())
}

fn settle(handle: &RequestHandle, kind: &str, outcome: std::result::Result<String, String>) {
    match outcome {
        Ok(text) => {
            info!("{} recognition finished: {:?}", kind, text);
            handle.complete(text);
        }
        Err(reason) => {
            warn!("{} recognition failed: {}", kind, reason);
            handle.fail(reason);
        }
    }
}

impl RecognitionService for HttpRecognizer {
    fn submit_ocr(&self, request: OcrRequest) -> RequestHandle {
        let handle = RequestHandle::new();
        handle.mark_pending();

        let task_handle = handle.clone();
        let client = self.client.clone();
        let url = self.url("ocr");
        let api_key = self.config.api_key.clone();
        let policy = self.config.retry_policy();
        self.runtime.spawn(async move {
            let outcome = run_ocr(client, url, api_key, policy, request).await;
            settle(&task_handle, "OCR", outcome);
        });
        handle
    }

    fn submit_handwriting(&self, request: HandwritingRequest) -> RequestHandle {
        let handle = RequestHandle::new();
        handle.mark_pending();

        let task_handle = handle.clone();
        let client = self.client.clone();
        let url = self.url("handwriting");
        let api_key = self.config.api_key.clone();
        let config = self.config.clone();
        self.runtime.spawn(async move {
            let outcome = run_handwriting(client, url, api_key, config, request).await;
            settle(&task_handle, "Handwriting", outcome);
        });
        handle
    }

    fn name(&self) -> &str {
        "http"
    }
}
