use async_trait::async_trait;
use relay_core::speech::{SpeechEngine, SpeechError};
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;

pub const DEFAULT_VOICE: &str = "zh-CN-XiaoxiaoNeural";
/// 24kHz 16-bit mono PCM wrapped in a RIFF header, i.e. a plain `.wav`.
pub const OUTPUT_FORMAT: &str = "riff-24khz-16bit-mono-pcm";

/// Speech synthesis through the Azure TTS REST endpoint.
pub struct AzureSpeechEngine {
    http: reqwest::Client,
    key: SecretString,
    endpoint: String,
    voice: String,
}

impl AzureSpeechEngine {
    pub fn new(key: SecretString, region: &str, voice: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            key,
            endpoint: format!("https://{region}.tts.speech.microsoft.com/cognitiveservices/v1"),
            voice: voice.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }
}

/// Builds the SSML document for `text` spoken by `voice`.
pub fn build_ssml(voice: &str, text: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='{lang}'><voice name='{voice}'>{text}</voice></speak>",
        lang = voice_locale(voice),
        voice = escape_xml(voice),
        text = escape_xml(text),
    )
}

/// `zh-CN-XiaoxiaoNeural` -> `zh-CN`.
fn voice_locale(voice: &str) -> &str {
    let mut dashes = voice.match_indices('-').map(|(i, _)| i);
    match (dashes.next(), dashes.next()) {
        (Some(_), Some(end)) => &voice[..end],
        _ => "en-US",
    }
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[async_trait]
impl SpeechEngine for AzureSpeechEngine {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), SpeechError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", self.key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header(reqwest::header::USER_AGENT, "line-relay")
            .body(build_ssml(&self.voice, text))
            .send()
            .await
            .map_err(|e| SpeechError::SynthesisCanceled(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::error!("Speech synthesis canceled ({}): {}", status, detail);
            return Err(SpeechError::SynthesisCanceled(format!("{status} {detail}").trim().to_string()));
        }

        let audio = resp
            .bytes()
            .await
            .map_err(|e| SpeechError::SynthesisCanceled(e.to_string()))?;
        tokio::fs::write(output, &audio).await?;
        tracing::info!("Synthesized {} bytes of audio with {}", audio.len(), self.voice);
        Ok(())
    }
}
