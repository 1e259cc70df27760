//! Gemini REST implementation of the generation capabilities.
//!
//! | Capability | Endpoint |
//! |---|---|
//! | Image generation | `POST {base}/models/{model}:generateContent` |
//! | Video start | `POST {base}/models/{model}:predictLongRunning` |
//! | Video poll | `GET {base}/{operation name}` |
//! | Result download | `GET {uri}` (authenticated) |
//!
//! All calls authenticate with the `x-goog-api-key` header. Non-2xx responses
//! become a [`CapabilityError`] whose message embeds the HTTP status code and
//! the start of the response body. 5xx responses are flagged as server
//! errors, which is what [`CapabilityError::is_transient`] keys on.

use super::{
    CapabilityError, GenerationResponse, ImageGeneration, OperationHandle, OperationStatus, Part,
    ResultFetcher, VideoGeneration,
};
use crate::types::ImagePayload;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response as HttpResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Longest slice of an error body carried into an error message.
const ERROR_BODY_LIMIT: usize = 512;

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_base: String,
    pub api_key: String,
    pub image_model: String,
    pub video_model: String,
    /// Passed through as the video job's `aspectRatio` when set.
    pub video_aspect_ratio: Option<String>,
    pub request_timeout: Duration,
}

/// Read the API key from `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`.
pub fn api_key_from_env() -> Option<String> {
    non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Blocking HTTP client for the Gemini API.
pub struct GeminiClient {
    settings: GeminiSettings,
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, CapabilityError> {
        let http = HttpClient::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| CapabilityError::new(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { settings, http })
    }

    fn api_base(&self) -> &str {
        self.settings.api_base.trim_end_matches('/')
    }

    fn model_endpoint(&self, model: &str, method: &str) -> String {
        let model = model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        format!("{}/{}:{}", self.api_base(), model_path, method)
    }

    fn operation_endpoint(&self, handle: &OperationHandle) -> String {
        format!(
            "{}/{}",
            self.api_base(),
            handle.name.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.settings.api_key)
    }

    fn send(&self, label: &str, request: RequestBuilder) -> Result<HttpResponse, CapabilityError> {
        let response = self
            .authorized(request)
            .send()
            .map_err(|e| CapabilityError::new(format!("{label} request failed: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(status_error(label, status, &body))
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        label: &str,
        request: RequestBuilder,
    ) -> Result<T, CapabilityError> {
        let response = self.send(label, request)?;
        let body = response
            .text()
            .map_err(|e| CapabilityError::new(format!("{label} response body read failed: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| CapabilityError::new(format!("{label} returned invalid JSON: {e}")))
    }
}

impl ImageGeneration for GeminiClient {
    fn generate(&self, parts: &[Part]) -> Result<GenerationResponse, CapabilityError> {
        let endpoint = self.model_endpoint(&self.settings.image_model, "generateContent");
        let payload = GenerateContentRequest::from_parts(parts);
        debug!(endpoint = %endpoint, parts = parts.len(), "sending image generation request");
        let response: GenerateContentResponse =
            self.send_json("Gemini", self.http.post(&endpoint).json(&payload))?;
        response.into_generation_response()
    }
}

impl VideoGeneration for GeminiClient {
    fn start(
        &self,
        image: &ImagePayload,
        prompt: &str,
    ) -> Result<OperationHandle, CapabilityError> {
        let endpoint = self.model_endpoint(&self.settings.video_model, "predictLongRunning");
        let payload = PredictLongRunningRequest::new(
            image,
            prompt,
            self.settings.video_aspect_ratio.as_deref(),
        );
        debug!(endpoint = %endpoint, "starting video operation");
        let operation: OperationResponse =
            self.send_json("Veo", self.http.post(&endpoint).json(&payload))?;
        if operation.name.trim().is_empty() {
            return Err(CapabilityError::new(
                "Veo start response did not include an operation name",
            ));
        }
        Ok(OperationHandle {
            name: operation.name,
        })
    }

    fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, CapabilityError> {
        let endpoint = self.operation_endpoint(handle);
        let operation: OperationResponse = self.send_json("Veo poll", self.http.get(&endpoint))?;
        Ok(operation.into_status())
    }
}

impl ResultFetcher for GeminiClient {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, CapabilityError> {
        let response = self.send("Download", self.http.get(uri))?;
        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| CapabilityError::new(format!("Download body read failed: {e}")))
    }
}

/// Error for a non-2xx response. 5xx statuses are marked as server errors.
fn status_error(label: &str, status: StatusCode, body: &str) -> CapabilityError {
    let message = format!(
        "{label} request failed ({}): {}",
        status.as_u16(),
        truncate_text(body.trim(), ERROR_BODY_LIMIT)
    );
    if status.is_server_error() {
        CapabilityError::server(message)
    } else {
        CapabilityError::new(message)
    }
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_text(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// ============================================================================
// Wire types: generateContent
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn from_parts(parts: &[Part]) -> Self {
        let parts = parts
            .iter()
            .map(|part| match part {
                Part::Image(image) => RequestPart {
                    inline_data: Some(InlineData {
                        mime_type: image.mime_type.clone(),
                        data: BASE64.encode(&image.bytes),
                    }),
                    text: None,
                },
                Part::Text(text) => RequestPart {
                    inline_data: None,
                    text: Some(text.clone()),
                },
            })
            .collect();
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE", "TEXT"],
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// First image wins; otherwise any prose the model produced.
    fn into_generation_response(self) -> Result<GenerationResponse, CapabilityError> {
        let block_reason = self
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason);
        let mut finish_reason = None;
        let mut texts = Vec::new();

        for candidate in self.candidates {
            if finish_reason.is_none() {
                finish_reason = candidate.finish_reason;
            }
            let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
            for part in parts {
                if let Some(inline) = part.inline_data.filter(|inline| !inline.data.is_empty()) {
                    let bytes = BASE64.decode(inline.data.as_bytes()).map_err(|e| {
                        CapabilityError::new(format!("Gemini image base64 decode failed: {e}"))
                    })?;
                    return Ok(GenerationResponse::Image(ImagePayload::new(
                        bytes,
                        inline.mime_type,
                    )));
                }
                if let Some(text) = part.text.filter(|t| !t.trim().is_empty()) {
                    texts.push(text.trim().to_string());
                }
            }
        }

        if !texts.is_empty() {
            return Ok(GenerationResponse::TextOnly(texts.join("\n")));
        }
        if let Some(reason) = block_reason {
            return Err(CapabilityError::new(format!(
                "Gemini blocked the request ({reason})"
            )));
        }
        Err(CapabilityError::new(match finish_reason {
            Some(reason) => format!("Gemini returned no image (finish reason {reason})"),
            None => "Gemini returned no image".to_string(),
        }))
    }
}

// ============================================================================
// Wire types: predictLongRunning + operations
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoSeedImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
struct VideoInstance {
    prompt: String,
    image: VideoSeedImage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictLongRunningRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

impl PredictLongRunningRequest {
    fn new(image: &ImagePayload, prompt: &str, aspect_ratio: Option<&str>) -> Self {
        Self {
            instances: vec![VideoInstance {
                prompt: prompt.to_string(),
                image: VideoSeedImage {
                    bytes_base64_encoded: BASE64.encode(&image.bytes),
                    mime_type: image.mime_type.clone(),
                },
            }],
            parameters: VideoParameters {
                aspect_ratio: aspect_ratio.map(str::to_string),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct VideoRef {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GeneratedSample {
    #[serde(default)]
    video: Option<VideoRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationPayload {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Default, Deserialize)]
struct OperationResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<OperationPayload>,
}

impl OperationResponse {
    fn into_status(self) -> OperationStatus {
        if let Some(error) = self.error {
            return OperationStatus::Failed {
                code: error.code,
                message: error.message,
            };
        }
        if !self.done {
            return OperationStatus::Running;
        }
        let result_uri = self
            .response
            .and_then(|payload| payload.generate_video_response)
            .and_then(|videos| videos.generated_samples.into_iter().next())
            .and_then(|sample| sample.video)
            .and_then(|video| video.uri)
            .filter(|uri| !uri.trim().is_empty());
        OperationStatus::Done { result_uri }
    }
}
