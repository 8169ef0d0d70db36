//! Maps a mode-selection command to a function mode and its instruction script.

use crate::error::RelayError;
use crate::prompts::{Prompt, PromptBook};
use crate::reply::{InlineGlyph, ReplyMessage};
use crate::state::{ConversationState, FunctionMode};

/// Placeholder character in the intro text that the inline emoji replaces.
const GLYPH_MARKER: char = '$';
const GLYPH_PRODUCT_ID: &str = "5ac1bfd5040ab15980c9b435";
const GLYPH_ID: &str = "012";
const STICKER_PACKAGE_ID: &str = "11539";
const STICKER_ID: &str = "52114110";

pub struct FunctionResolver<'a> {
    prompts: &'a PromptBook,
}

impl<'a> FunctionResolver<'a> {
    pub fn new(prompts: &'a PromptBook) -> Self {
        Self { prompts }
    }

    pub fn select(text: &str) -> Result<FunctionMode, RelayError> {
        FunctionMode::from_tag(text.trim())
            .ok_or_else(|| RelayError::UnrecognizedFunction(text.to_string()))
    }

    /// Applies a mode-selection command. Unknown commands leave the state
    /// untouched and produce the "service not offered" reply.
    pub fn resolve(&self, state: &mut ConversationState, text: &str) -> Vec<ReplyMessage> {
        match Self::select(text) {
            Ok(mode) => {
                tracing::info!("Function mode set to {:?}", mode);
                state.active_function = Some(mode);
                self.instructions(mode)
            }
            Err(e) => {
                tracing::info!("{}", e);
                vec![ReplyMessage::text(
                    self.prompts.text(Prompt::FunctionUnavailable),
                )]
            }
        }
    }

    /// The instruction script for a mode. Independent of conversation state.
    pub fn instructions(&self, mode: FunctionMode) -> Vec<ReplyMessage> {
        match mode {
            FunctionMode::Translate => {
                let intro = self.prompts.text(Prompt::TranslateIntro).to_string();
                let glyphs = glyph_offset(&intro)
                    .map(|index| InlineGlyph {
                        index,
                        product_id: GLYPH_PRODUCT_ID.to_string(),
                        glyph_id: GLYPH_ID.to_string(),
                    })
                    .into_iter()
                    .collect();
                vec![
                    ReplyMessage::Text {
                        text: intro,
                        glyphs,
                    },
                    ReplyMessage::text(self.prompts.text(Prompt::TranslateAskLanguage)),
                    ReplyMessage::Sticker {
                        package_id: STICKER_PACKAGE_ID.to_string(),
                        sticker_id: STICKER_ID.to_string(),
                    },
                ]
            }
            FunctionMode::Speech => vec![
                ReplyMessage::text(self.prompts.text(Prompt::SpeechIntro)),
                ReplyMessage::text(self.prompts.text(Prompt::SpeechAskLanguage)),
            ],
        }
    }
}

/// UTF-16 offset of the glyph marker, which is how emoji positions are counted.
fn glyph_offset(text: &str) -> Option<usize> {
    let byte_offset = text.find(GLYPH_MARKER)?;
    Some(text[..byte_offset].encode_utf16().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_tag_yields_three_parts_with_sticker() {
        let prompts = PromptBook::new();
        let resolver = FunctionResolver::new(&prompts);

        let states = [
            ConversationState::new(),
            ConversationState {
                target_language: Some("日語".to_string()),
                awaiting_language_confirmation: None,
                active_function: Some(FunctionMode::Speech),
            },
        ];
        for mut state in states {
            let replies = resolver.resolve(&mut state, "翻譯");

            assert_eq!(state.active_function, Some(FunctionMode::Translate));
            assert_eq!(replies.len(), 3);
            match &replies[0] {
                ReplyMessage::Text { text, glyphs } => {
                    assert!(text.starts_with("這是菜單翻譯功能$"));
                    assert_eq!(
                        glyphs,
                        &vec![InlineGlyph {
                            index: 8,
                            product_id: "5ac1bfd5040ab15980c9b435".to_string(),
                            glyph_id: "012".to_string(),
                        }]
                    );
                }
                other => panic!("Expected a text reply, got {:?}", other),
            }
            assert_eq!(
                replies[2],
                ReplyMessage::Sticker {
                    package_id: "11539".to_string(),
                    sticker_id: "52114110".to_string(),
                }
            );
        }
    }

    #[test]
    fn test_speech_tag_yields_two_parts() {
        let prompts = PromptBook::new();
        let mut state = ConversationState::new();

        let replies = FunctionResolver::new(&prompts).resolve(&mut state, "語音");

        assert_eq!(state.active_function, Some(FunctionMode::Speech));
        assert_eq!(
            replies,
            vec![
                ReplyMessage::text("這是可以協助點餐的語音功能"),
                ReplyMessage::text("請輸入想要語音輸出的語言"),
            ]
        );
    }

    #[test]
    fn test_unknown_command_leaves_mode_unchanged() {
        let prompts = PromptBook::new();
        let mut state = ConversationState {
            active_function: Some(FunctionMode::Speech),
            ..ConversationState::default()
        };

        let replies = FunctionResolver::new(&prompts).resolve(&mut state, "點餐");

        assert_eq!(state.active_function, Some(FunctionMode::Speech));
        assert_eq!(replies, vec![ReplyMessage::text("目前不提供此服務")]);
        assert!(matches!(
            FunctionResolver::select("點餐"),
            Err(RelayError::UnrecognizedFunction(_))
        ));
    }

    #[test]
    fn test_glyph_offset_counts_utf16_units() {
        assert_eq!(glyph_offset("這是菜單翻譯功能$"), Some(8));
        assert_eq!(glyph_offset("\u{1F600}$"), Some(2));
        assert_eq!(glyph_offset("no marker"), None);
    }
}
