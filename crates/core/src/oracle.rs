use crate::prompts::{Prompt, PromptBook};
use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use std::path::Path;

const AFFIRMATIVE: &str = "是";
const NEGATIVE: &str = "不是";

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle returned an empty response")]
    EmptyResponse,
}

/// Media attached to an oracle request.
#[derive(Debug, Clone, PartialEq)]
pub enum Media {
    /// Bytes sent along with the prompt, e.g. a menu photo.
    Inline { mime_type: String, data: Bytes },
    /// A file previously handed to the oracle's media channel.
    Uploaded { mime_type: String, uri: String },
}

// The `Oracle` trait is the contract the conversation logic needs from a
// generative text/vision model. Resolvers only ever see this trait, so tests
// drive them with `MockOracle` instead of a live model.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Sends one prompt, optionally with media, and returns the raw reply text.
    async fn generate(&self, prompt: &str, media: Option<Media>) -> Result<String, OracleError>;

    /// Uploads a local file to the oracle's media channel.
    async fn upload_media(&self, path: &Path, mime_type: &str) -> Result<Media, OracleError>;
}

/// Strips emphasis markers and embedded newlines from a raw oracle reply.
pub fn normalize(raw: &str) -> String {
    raw.replace('*', "").replace('\n', "")
}

/// Strips emphasis markers only, keeping line structure (numbered lists).
pub fn strip_emphasis(raw: &str) -> String {
    raw.replace('*', "")
}

/// Outcome of a yes/no classification prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Affirmative,
    Negative,
    /// Anything other than the two expected tokens, normalized.
    Unrecognized(String),
}

impl Verdict {
    pub fn parse(raw: &str) -> Self {
        let reply = normalize(raw);
        match reply.trim() {
            AFFIRMATIVE => Verdict::Affirmative,
            NEGATIVE => Verdict::Negative,
            other => Verdict::Unrecognized(other.to_string()),
        }
    }

    pub fn is_affirmative(&self) -> bool {
        matches!(self, Verdict::Affirmative)
    }
}

/// Asks a yes/no question; an unrecognized answer counts as negative.
pub async fn classify(
    oracle: &dyn Oracle,
    prompt: &str,
    media: Option<Media>,
) -> Result<bool, OracleError> {
    tracing::debug!("Classification prompt: {}", prompt);
    let verdict = Verdict::parse(&oracle.generate(prompt, media).await?);
    if let Verdict::Unrecognized(reply) = &verdict {
        tracing::warn!("Unrecognized classification reply {:?}, treating as negative", reply);
    }
    Ok(verdict.is_affirmative())
}

/// Translates `sentence` into `language` and returns the raw reply.
pub async fn translate(
    oracle: &dyn Oracle,
    prompts: &PromptBook,
    language: &str,
    sentence: &str,
) -> Result<String, OracleError> {
    let prompt = prompts.render(
        Prompt::Translate,
        &[("language", language), ("sentence", sentence)],
    );
    tracing::debug!("Translation prompt: {}", prompt);
    oracle.generate(&prompt, None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_markup_and_newlines() {
        assert_eq!(normalize("**是**\n"), "是");
        assert_eq!(normalize("西班牙語\n\n"), "西班牙語");
        assert_eq!(strip_emphasis("1. **牛肉麵**\n2. 滷肉飯"), "1. 牛肉麵\n2. 滷肉飯");
    }

    #[test]
    fn test_verdict_parse() {
        assert_eq!(Verdict::parse("是"), Verdict::Affirmative);
        assert_eq!(Verdict::parse("**是**\n"), Verdict::Affirmative);
        assert_eq!(Verdict::parse(" 不是 "), Verdict::Negative);
        assert_eq!(
            Verdict::parse("是的，這是語言名稱"),
            Verdict::Unrecognized("是的，這是語言名稱".to_string())
        );
        assert!(!Verdict::parse("").is_affirmative());
    }

    #[tokio::test]
    async fn test_classify_treats_unrecognized_as_negative() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok("maybe".to_string()));

        let result = classify(&oracle, "判斷 hello 是否是語言名稱，並簡答是或不是", None).await;

        assert!(!result.unwrap());
    }

    #[tokio::test]
    async fn test_classify_propagates_oracle_errors() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_generate()
            .times(1)
            .returning(|_, _| Err(OracleError::Unavailable("connection reset".to_string())));

        let result = classify(&oracle, "prompt", None).await;

        assert!(matches!(result, Err(OracleError::Unavailable(_))));
    }

    /// A deterministic oracle: "translations" carry a language tag that the
    /// language-naming prompt reads back.
    struct TaggingOracle;

    #[async_trait]
    impl Oracle for TaggingOracle {
        async fn generate(&self, prompt: &str, _media: Option<Media>) -> Result<String, OracleError> {
            if let Some(rest) = prompt.strip_prefix("使用") {
                let (language, rest) = rest.split_once("翻譯").ok_or(OracleError::EmptyResponse)?;
                let sentence = rest.trim_end_matches(" 這個句子，且前後不加其他語句");
                return Ok(format!("[{language}] {sentence}"));
            }
            if let Some(rest) = prompt.strip_prefix("判斷[") {
                let (language, _) = rest.split_once(']').ok_or(OracleError::EmptyResponse)?;
                return Ok(format!("**{language}**\n"));
            }
            Err(OracleError::EmptyResponse)
        }

        async fn upload_media(&self, _path: &Path, _mime_type: &str) -> Result<Media, OracleError> {
            Err(OracleError::Unavailable("no media channel".to_string()))
        }
    }

    #[tokio::test]
    async fn test_translation_names_its_own_language() {
        let prompts = PromptBook::new();
        let oracle = TaggingOracle;

        for language in ["西班牙語", "日語", "韓語", "法語", "繁體中文"] {
            let translated = translate(&oracle, &prompts, language, "請選擇或拍攝一張菜單照片")
                .await
                .unwrap();
            let naming_prompt = prompts.render(Prompt::NameLanguage, &[("text", &translated)]);
            let named = normalize(&oracle.generate(&naming_prompt, None).await.unwrap());
            assert_eq!(named, language);
        }
    }
}
