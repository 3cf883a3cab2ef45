use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::{AppError, GENERIC_FAILURE, Result};
use crate::image_processing::{DEFAULT_IMAGE_MIME, DataUri, ReferenceImage};
use crate::options::{AspectRatio, ModelTier};
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use url::Url;

/// Everything needed for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub model: ModelTier,
    pub reference: Option<ReferenceImage>,
}

/// Something that turns a [`GenerationConfig`] into an image `data:` URI.
pub trait ImageModel: Send + Sync {
    fn generate<'a>(&'a self, config: &'a GenerationConfig) -> BoxFuture<'a, Result<String>>;
}

// --- Wire types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<RequestContent>,
    pub generation_config: RequestGenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct RequestContent {
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(default)]
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestGenerationConfig {
    pub image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: AspectRatio,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<Blob>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl GenerateContentRequest {
    /// Builds the request body: reference image first (if any), then the prompt.
    pub fn from_config(config: &GenerationConfig) -> Self {
        let mut parts = Vec::with_capacity(2);

        if let Some(reference) = &config.reference {
            parts.push(RequestPart::InlineData {
                inline_data: Blob {
                    data: reference.data.clone(),
                    mime_type: Some(reference.mime_type.clone()),
                },
            });
        }

        parts.push(RequestPart::Text {
            text: config.prompt.clone(),
        });

        Self {
            contents: vec![RequestContent { parts }],
            generation_config: RequestGenerationConfig {
                image_config: ImageConfig {
                    aspect_ratio: config.aspect_ratio,
                },
            },
        }
    }
}

impl GenerateContentResponse {
    /// Returns the first inline image of the first candidate as a data URI.
    ///
    /// Later candidates and further image parts are ignored.
    pub fn into_image_uri(self) -> Result<String> {
        let blob = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.inline_data)
                    .find(|blob| !blob.data.is_empty())
            })
            .ok_or(AppError::NoImageData)?;

        let mime_type = blob
            .mime_type
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());

        Ok(DataUri::new(mime_type, blob.data).to_string())
    }
}

/// REST client for the `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl GeminiClient {
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("lumina/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            credentials,
        })
    }

    fn endpoint(&self, model: ModelTier) -> Result<Url> {
        self.base_url
            .join(&format!("models/{}:generateContent", model.api_id()))
            .map_err(|e| AppError::config(format!("Invalid model URL: {}", e)))
    }

    /// Sends one generation request and returns the image as a data URI.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for an empty prompt (no request is made)
    /// - [`AppError::NoImageData`] when the response has no inline image
    /// - [`AppError::RateLimited`] on HTTP 429
    /// - [`AppError::GeminiApi`] for other API failures
    /// - [`AppError::Http`] for transport failures
    pub async fn generate_image(&self, config: &GenerationConfig) -> Result<String> {
        if config.prompt.trim().is_empty() {
            return Err(AppError::validation("Prompt must not be empty."));
        }

        let url = self.endpoint(config.model)?;
        let body = GenerateContentRequest::from_config(config);

        info!(
            model = config.model.api_id(),
            aspect_ratio = %config.aspect_ratio,
            with_reference = config.reference.is_some(),
            "Requesting image generation"
        );

        let result = self.send(url, &body).await;
        if let Err(e) = &result {
            error!(error = %e, "Gemini API error");
        }
        result
    }

    async fn send(&self, url: Url, body: &GenerateContentRequest) -> Result<String> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", self.credentials.active_key())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%status, bytes = text.len(), "Received Gemini response");

        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
        let uri = parsed.into_image_uri()?;
        info!(bytes = uri.len(), "Image received");
        Ok(uri)
    }
}

impl ImageModel for GeminiClient {
    fn generate<'a>(&'a self, config: &'a GenerationConfig) -> BoxFuture<'a, Result<String>> {
        self.generate_image(config).boxed()
    }
}

/// Reduces a non-2xx response to one error, preferring the API's own message.
fn classify_failure(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("{} (HTTP {})", GENERIC_FAILURE, status.as_u16()));

    if status == StatusCode::TOO_MANY_REQUESTS {
        AppError::RateLimited(message)
    } else {
        AppError::GeminiApi(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(reference: Option<ReferenceImage>) -> GenerationConfig {
        GenerationConfig {
            prompt: "a lighthouse at dusk".into(),
            aspect_ratio: AspectRatio::Wide,
            model: ModelTier::Flash,
            reference,
        }
    }

    #[test]
    fn request_without_reference_has_only_text() {
        let body = serde_json::to_value(GenerateContentRequest::from_config(&config(None))).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{ "parts": [{ "text": "a lighthouse at dusk" }] }],
                "generationConfig": { "imageConfig": { "aspectRatio": "16:9" } }
            })
        );
    }

    #[test]
    fn reference_image_precedes_prompt() {
        let reference = ReferenceImage {
            data: "QUJD".into(),
            mime_type: "image/jpeg".into(),
        };
        let body =
            serde_json::to_value(GenerateContentRequest::from_config(&config(Some(reference))))
                .unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(
            parts[0],
            json!({ "inlineData": { "data": "QUJD", "mimeType": "image/jpeg" } })
        );
        assert_eq!(parts[1], json!({ "text": "a lighthouse at dusk" }));
        assert_eq!(parts.as_array().unwrap().len(), 2);
    }

    fn parse(value: serde_json::Value) -> Result<String> {
        serde_json::from_value::<GenerateContentResponse>(value)
            .unwrap()
            .into_image_uri()
    }

    #[test]
    fn inline_data_becomes_data_uri() {
        let uri = parse(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "data": "AAAA", "mimeType": "image/png" } }
            ]}}]
        }))
        .unwrap();
        assert_eq!(uri, "data:image/png;base64,AAAA");
    }

    #[test]
    fn missing_mime_defaults_to_png() {
        let uri = parse(json!({
            "candidates": [{ "content": { "parts": [ { "inlineData": { "data": "BBBB" } } ]}}]
        }))
        .unwrap();
        assert_eq!(uri, "data:image/png;base64,BBBB");
    }

    #[test]
    fn first_image_part_wins_after_text() {
        let uri = parse(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here is your image" },
                { "inlineData": { "data": "CCCC", "mimeType": "image/jpeg" } },
                { "inlineData": { "data": "DDDD", "mimeType": "image/png" } }
            ]}}]
        }))
        .unwrap();
        assert_eq!(uri, "data:image/jpeg;base64,CCCC");
    }

    #[test]
    fn empty_or_text_only_responses_have_no_image() {
        for value in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{}] }),
            json!({ "candidates": [{ "content": { "parts": [ { "text": "refused" } ] } }] }),
        ] {
            assert!(matches!(parse(value), Err(AppError::NoImageData)));
        }
    }

    #[test]
    fn failure_prefers_api_message() {
        let err = classify_failure(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"API key not valid."}}"#,
        );
        assert_eq!(err.to_string(), "API key not valid.");

        let err = classify_failure(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(err.to_string(), "Failed to generate image. (HTTP 502)");

        let err = classify_failure(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"Quota exceeded"}}"#,
        );
        assert!(matches!(err, AppError::RateLimited(ref m) if m == "Quota exceeded"));
    }
}
