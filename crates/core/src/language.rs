//! Detects which language the user wants replies rendered in.

use crate::error::RelayError;
use crate::oracle::{self, Oracle, OracleError};
use crate::prompts::{Prompt, PromptBook};
use crate::reply::ReplyMessage;
use crate::state::{ConversationState, FunctionMode};

pub struct LanguageResolver<'a> {
    oracle: &'a dyn Oracle,
    prompts: &'a PromptBook,
}

impl<'a> LanguageResolver<'a> {
    pub fn new(oracle: &'a dyn Oracle, prompts: &'a PromptBook) -> Self {
        Self { oracle, prompts }
    }

    /// Treats `text` as a candidate language name.
    ///
    /// On success `target_language` is set and the mode's instruction sentences
    /// come back translated into it, one reply per sentence in order. When the
    /// text is not a language name the state is flagged with
    /// `awaiting_language_confirmation = Some(false)` and a single prompt asking
    /// for a language name is returned.
    pub async fn resolve(
        &self,
        state: &mut ConversationState,
        text: &str,
    ) -> Result<Vec<ReplyMessage>, RelayError> {
        let question = self.prompts.render(Prompt::IsLanguage, &[("text", text)]);
        if !oracle::classify(self.oracle, &question, None).await? {
            tracing::info!("{:?} is not a language name", text);
            state.awaiting_language_confirmation = Some(false);
            return Ok(vec![ReplyMessage::text(
                self.prompts.text(Prompt::AskLanguageName),
            )]);
        }

        let naming = self.prompts.render(Prompt::NameLanguage, &[("text", text)]);
        let language = oracle::normalize(&self.oracle.generate(&naming, None).await?)
            .trim()
            .to_string();
        if language.is_empty() {
            tracing::warn!("Oracle named no language for {:?}", text);
            return Err(OracleError::EmptyResponse.into());
        }
        tracing::info!("Target language set to {:?}", language);
        state.target_language = Some(language.clone());

        let sentences = match state.active_function {
            Some(FunctionMode::Translate) => vec![
                self.prompts
                    .render(Prompt::TranslateModeNotice, &[("language", &language)]),
                self.prompts.text(Prompt::TranslateModeMenuHint).to_string(),
            ],
            _ => vec![
                self.prompts
                    .render(Prompt::SpeechModeNotice, &[("language", &language)]),
                self.prompts.text(Prompt::SpeechModeUsage).to_string(),
                self.prompts.text(Prompt::SpeechModeExample).to_string(),
            ],
        };

        let mut replies = Vec::with_capacity(sentences.len());
        for sentence in &sentences {
            let translated =
                oracle::translate(self.oracle, self.prompts, &language, sentence).await?;
            replies.push(ReplyMessage::text(oracle::normalize(&translated)));
        }
        Ok(replies)
    }
}
