//! Reads dish names off a menu photo and translates them.

use crate::error::RelayError;
use crate::event::ContentFetcher;
use crate::oracle::{self, Media, Oracle};
use crate::prompts::{Prompt, PromptBook};
use crate::reply::ReplyMessage;
use crate::state::ConversationState;

pub struct FoodNameResolver<'a> {
    oracle: &'a dyn Oracle,
    prompts: &'a PromptBook,
}

impl<'a> FoodNameResolver<'a> {
    pub fn new(oracle: &'a dyn Oracle, prompts: &'a PromptBook) -> Self {
        Self { oracle, prompts }
    }

    /// Handles one image turn. Without a target language this replies with the
    /// bilingual "set a language first" prompt and never fetches the image.
    pub async fn resolve(
        &self,
        state: &ConversationState,
        content: &dyn ContentFetcher,
        message_id: &str,
    ) -> Result<Vec<ReplyMessage>, RelayError> {
        let language = match require_language(state) {
            Ok(language) => language,
            Err(RelayError::MissingLanguage) => {
                tracing::info!("Image received before a target language was set");
                return Ok(vec![ReplyMessage::text(
                    self.prompts.text(Prompt::MissingLanguage),
                )]);
            }
            Err(e) => return Err(e),
        };

        let data = content.fetch(message_id).await?;
        let image = Media::Inline {
            mime_type: image_mime_type(&data).to_string(),
            data,
        };

        let question = self.prompts.text(Prompt::HasDishNames);
        if !oracle::classify(self.oracle, question, Some(image.clone())).await? {
            let notice = self.prompts.text(Prompt::NoDishNames);
            let translated = oracle::translate(self.oracle, self.prompts, language, notice).await?;
            return Ok(vec![ReplyMessage::text(oracle::normalize(&translated))]);
        }

        let listing = self
            .oracle
            .generate(self.prompts.text(Prompt::ListDishNames), Some(image))
            .await?;
        let dishes = oracle::strip_emphasis(&listing);
        tracing::debug!("Extracted dish names: {}", dishes);
        let translated = oracle::translate(self.oracle, self.prompts, language, &dishes).await?;
        Ok(vec![ReplyMessage::text(translated)])
    }
}

pub fn require_language(state: &ConversationState) -> Result<&str, RelayError> {
    state
        .target_language
        .as_deref()
        .filter(|language| !language.is_empty())
        .ok_or(RelayError::MissingLanguage)
}

fn image_mime_type(data: &[u8]) -> &'static str {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}
