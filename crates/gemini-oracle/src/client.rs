use crate::types::{
    Content, FileData, GenerateContentRequest, GenerateContentResponse, InlineData, Part,
    UploadFileResponse, UploadedFile,
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use relay_core::oracle::{Media, Oracle, OracleError};
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// How often, and how many times, an uploaded file is polled until it is usable.
const FILE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const FILE_POLL_ATTEMPTS: usize = 10;

/// A client for the Gemini `generateContent` and Files REST APIs.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: SecretString, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn wait_until_active(&self, mut file: UploadedFile) -> Result<UploadedFile, OracleError> {
        let Some(name) = file.name.clone() else {
            return Ok(file);
        };
        let mut attempts = 0;
        while file.is_processing() && attempts < FILE_POLL_ATTEMPTS {
            tokio::time::sleep(FILE_POLL_INTERVAL).await;
            attempts += 1;
            file = self
                .http
                .get(format!("{}/v1beta/{}", self.base_url, name))
                .header("x-goog-api-key", self.api_key.expose_secret())
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(unavailable)?
                .json::<UploadedFile>()
                .await
                .map_err(unavailable)?;
        }
        check_ready(&name, file)
    }
}

/// An uploaded file can be referenced only once it has left `PROCESSING`
/// without failing.
fn check_ready(name: &str, file: UploadedFile) -> Result<UploadedFile, OracleError> {
    match file.state.as_deref() {
        Some("PROCESSING") => Err(OracleError::Unavailable(format!(
            "file {name} still processing after {FILE_POLL_ATTEMPTS} polls"
        ))),
        Some("FAILED") => Err(OracleError::Unavailable(format!(
            "file {name} failed processing"
        ))),
        _ => Ok(file),
    }
}

fn unavailable(e: reqwest::Error) -> OracleError {
    OracleError::Unavailable(e.to_string())
}

/// Builds the request body: the prompt first, then any attached media.
pub fn build_request(prompt: &str, media: Option<Media>) -> GenerateContentRequest {
    let mut parts = vec![Part {
        text: Some(prompt.to_string()),
        ..Part::default()
    }];
    match media {
        Some(Media::Inline { mime_type, data }) => parts.push(Part {
            inline_data: Some(InlineData {
                mime_type,
                data: general_purpose::STANDARD.encode(&data),
            }),
            ..Part::default()
        }),
        Some(Media::Uploaded { mime_type, uri }) => parts.push(Part {
            file_data: Some(FileData {
                mime_type,
                file_uri: uri,
            }),
            ..Part::default()
        }),
        None => {}
    }
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
    }
}

#[async_trait]
impl Oracle for GeminiClient {
    async fn generate(&self, prompt: &str, media: Option<Media>) -> Result<String, OracleError> {
        let body = build_request(prompt, media);
        let resp = self
            .http
            .post(self.generate_url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(unavailable)?
            .json::<GenerateContentResponse>()
            .await
            .map_err(unavailable)?;

        let text = resp.text();
        if text.trim().is_empty() {
            tracing::warn!("Gemini returned no text for prompt: {}", prompt);
            return Err(OracleError::EmptyResponse);
        }
        tracing::debug!("Gemini replied: {:?}", text);
        Ok(text)
    }

    async fn upload_media(&self, path: &Path, mime_type: &str) -> Result<Media, OracleError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| OracleError::Unavailable(format!("failed to read {}: {e}", path.display())))?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        // Resumable upload: one request to open a session, one to send the bytes.
        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(unavailable)?;
        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| OracleError::Unavailable("upload session has no URL".to_string()))?
            .to_string();

        let uploaded = self
            .http
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(data)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(unavailable)?
            .json::<UploadFileResponse>()
            .await
            .map_err(unavailable)?;

        let file = self.wait_until_active(uploaded.file).await?;
        tracing::info!("Uploaded {} to Gemini as {}", display_name, file.uri);
        Ok(Media::Uploaded {
            mime_type: file.mime_type.unwrap_or_else(|| mime_type.to_string()),
            uri: file.uri,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_request_puts_prompt_before_media() {
        let request = build_request(
            "判斷圖片中是否包含料理名稱的文字，並簡答是或不是",
            Some(Media::Inline {
                mime_type: "image/jpeg".to_string(),
                data: Bytes::from_static(b"abc"),
            }),
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "判斷圖片中是否包含料理名稱的文字，並簡答是或不是" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "YWJj" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_request_references_uploaded_file() {
        let request = build_request(
            "transcribe",
            Some(Media::Uploaded {
                mime_type: "audio/mpeg".to_string(),
                uri: "https://generativelanguage.googleapis.com/v1beta/files/abc".to_string(),
            }),
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["contents"][0]["parts"][1],
            serde_json::json!({
                "fileData": {
                    "mimeType": "audio/mpeg",
                    "fileUri": "https://generativelanguage.googleapis.com/v1beta/files/abc"
                }
            })
        );
    }

    #[test]
    fn test_text_only_request_has_single_part() {
        let json = serde_json::to_value(build_request("hola", None)).unwrap();
        assert_eq!(json["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_response_text_joins_parts_of_first_candidate() {
        let resp: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [
                    { "content": { "role": "model", "parts": [{ "text": "1. 牛肉麵\n" }, { "text": "2. 滷肉飯" }] } },
                    { "content": { "role": "model", "parts": [{ "text": "ignored" }] } }
                ],
                "usageMetadata": { "promptTokenCount": 12 }
            }"#,
        )
        .unwrap();

        assert_eq!(resp.text(), "1. 牛肉麵\n2. 滷肉飯");
    }

    #[test]
    fn test_blocked_response_has_no_text() {
        let resp: GenerateContentResponse =
            serde_json::from_str(r#"{ "promptFeedback": { "blockReason": "SAFETY" } }"#).unwrap();
        assert_eq!(resp.text(), "");
    }

    #[test]
    fn test_upload_response_parsing() {
        let resp: UploadFileResponse = serde_json::from_str(
            r#"{ "file": { "name": "files/abc", "uri": "https://x/files/abc", "mimeType": "audio/mpeg", "state": "PROCESSING" } }"#,
        )
        .unwrap();
        assert!(resp.file.is_processing());
        assert_eq!(resp.file.uri, "https://x/files/abc");
    }

    fn uploaded(state: &str) -> UploadedFile {
        UploadedFile {
            name: Some("files/abc".to_string()),
            uri: "https://x/files/abc".to_string(),
            mime_type: Some("audio/mpeg".to_string()),
            state: Some(state.to_string()),
        }
    }

    #[test]
    fn test_file_still_processing_after_polling_is_unavailable() {
        let result = check_ready("files/abc", uploaded("PROCESSING"));

        assert!(matches!(
            result,
            Err(OracleError::Unavailable(msg)) if msg.contains("files/abc") && msg.contains("still processing")
        ));
    }

    #[test]
    fn test_failed_file_is_unavailable_and_active_file_is_ready() {
        assert!(matches!(
            check_ready("files/abc", uploaded("FAILED")),
            Err(OracleError::Unavailable(msg)) if msg.contains("failed processing")
        ));
        assert_eq!(check_ready("files/abc", uploaded("ACTIVE")).unwrap().uri, "https://x/files/abc");
    }

    #[tokio::test]
    async fn test_upload_of_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let client = GeminiClient::new(SecretString::from("test-key".to_string()), DEFAULT_MODEL)
            .with_base_url("http://127.0.0.1:9");

        let result = client
            .upload_media(&dir.path().join("missing.m4a"), "audio/mpeg")
            .await;

        assert!(matches!(result, Err(OracleError::Unavailable(msg)) if msg.contains("missing.m4a")));
    }

    #[test]
    fn test_generate_url() {
        let client = GeminiClient::new(SecretString::from("k".to_string()), "gemini-1.5-flash")
            .with_base_url("https://example.test/");
        assert_eq!(
            client.generate_url(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
