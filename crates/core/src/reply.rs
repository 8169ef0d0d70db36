/// An emoji embedded in a text reply at a UTF-16 offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineGlyph {
    pub index: usize,
    pub product_id: String,
    pub glyph_id: String,
}

/// One payload in a reply burst.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyMessage {
    Text {
        text: String,
        glyphs: Vec<InlineGlyph>,
    },
    Audio {
        url: String,
        duration_ms: u32,
    },
    Sticker {
        package_id: String,
        sticker_id: String,
    },
}

impl ReplyMessage {
    pub fn text(text: impl Into<String>) -> Self {
        ReplyMessage::Text {
            text: text.into(),
            glyphs: Vec::new(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ReplyMessage::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Everything sent back for one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyBatch {
    pub reply_token: String,
    pub messages: Vec<ReplyMessage>,
}
