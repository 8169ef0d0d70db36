//! Oracle prompts and fixed reply texts.
//!
//! Every entry has a built-in default. Deployments can replace any of them
//! by key (see [`Prompt::key`]); templates use `{name}` placeholders that are
//! filled by [`PromptBook::render`].

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prompt {
    /// Yes/no: is `{text}` the name of a language?
    IsLanguage,
    /// Name the language `{text}` refers to, in the display language.
    NameLanguage,
    /// Translate `{sentence}` into `{language}` with no surrounding text.
    Translate,
    TranslateModeNotice,
    TranslateModeMenuHint,
    SpeechModeNotice,
    SpeechModeUsage,
    SpeechModeExample,
    AskLanguageName,
    /// Yes/no: does the attached image contain dish names?
    HasDishNames,
    ListDishNames,
    NoDishNames,
    MissingLanguage,
    TranscribeAudio,
    AudioError,
    SpeechError,
    TranslateIntro,
    TranslateAskLanguage,
    SpeechIntro,
    SpeechAskLanguage,
    FunctionUnavailable,
}

impl Prompt {
    pub const ALL: [Prompt; 21] = [
        Prompt::IsLanguage,
        Prompt::NameLanguage,
        Prompt::Translate,
        Prompt::TranslateModeNotice,
        Prompt::TranslateModeMenuHint,
        Prompt::SpeechModeNotice,
        Prompt::SpeechModeUsage,
        Prompt::SpeechModeExample,
        Prompt::AskLanguageName,
        Prompt::HasDishNames,
        Prompt::ListDishNames,
        Prompt::NoDishNames,
        Prompt::MissingLanguage,
        Prompt::TranscribeAudio,
        Prompt::AudioError,
        Prompt::SpeechError,
        Prompt::TranslateIntro,
        Prompt::TranslateAskLanguage,
        Prompt::SpeechIntro,
        Prompt::SpeechAskLanguage,
        Prompt::FunctionUnavailable,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Prompt::IsLanguage => "is_language",
            Prompt::NameLanguage => "name_language",
            Prompt::Translate => "translate",
            Prompt::TranslateModeNotice => "translate_mode_notice",
            Prompt::TranslateModeMenuHint => "translate_mode_menu_hint",
            Prompt::SpeechModeNotice => "speech_mode_notice",
            Prompt::SpeechModeUsage => "speech_mode_usage",
            Prompt::SpeechModeExample => "speech_mode_example",
            Prompt::AskLanguageName => "ask_language_name",
            Prompt::HasDishNames => "has_dish_names",
            Prompt::ListDishNames => "list_dish_names",
            Prompt::NoDishNames => "no_dish_names",
            Prompt::MissingLanguage => "missing_language",
            Prompt::TranscribeAudio => "transcribe_audio",
            Prompt::AudioError => "audio_error",
            Prompt::SpeechError => "speech_error",
            Prompt::TranslateIntro => "translate_intro",
            Prompt::TranslateAskLanguage => "translate_ask_language",
            Prompt::SpeechIntro => "speech_intro",
            Prompt::SpeechAskLanguage => "speech_ask_language",
            Prompt::FunctionUnavailable => "function_unavailable",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    fn default_text(self) -> &'static str {
        match self {
            Prompt::IsLanguage => "判斷 {text} 是否是語言名稱，並簡答是或不是",
            Prompt::NameLanguage => {
                "判斷{text}這個詞彙名稱上是什麼語言，如為中文，請區分是繁體還是簡體，並用繁體中文簡答語言名稱即可"
            }
            Prompt::Translate => "使用{language}翻譯{sentence} 這個句子，且前後不加其他語句",
            Prompt::TranslateModeNotice => "對話內容將使用{language}進行",
            Prompt::TranslateModeMenuHint => "請選擇或拍攝一張菜單照片",
            Prompt::SpeechModeNotice => "語音將以{language}表達",
            Prompt::SpeechModeUsage => "請輸入想要翻譯的文字，並在文字前加上@符號",
            Prompt::SpeechModeExample => "範例 - @我想點牛排",
            Prompt::AskLanguageName => "請輸入語言名稱",
            Prompt::HasDishNames => "判斷圖片中是否包含料理名稱的文字，並簡答是或不是",
            Prompt::ListDishNames => {
                "列出圖片中是料理名稱的文字，前面加上數字編號，前後不加任何其他無相干文字"
            }
            Prompt::NoDishNames => "圖片中未偵測到料理名稱",
            Prompt::MissingLanguage => {
                "請先輸入欲翻譯成的語言\n\nPlease enter the language you want to translate to first."
            }
            Prompt::TranscribeAudio => {
                "偵測音檔語言並用繁體中文列出該語言名稱，並將內容翻譯成繁體中文列出"
            }
            Prompt::AudioError => "處理音檔時發生錯誤: {error}",
            Prompt::SpeechError => "語音合成時發生錯誤: {error}",
            Prompt::TranslateIntro => "這是菜單翻譯功能$\n\nThis is a menu translation feature.",
            Prompt::TranslateAskLanguage => {
                "請輸入欲翻譯成的語言\n\nPlease enter the language you want to translate to."
            }
            Prompt::SpeechIntro => "這是可以協助點餐的語音功能",
            Prompt::SpeechAskLanguage => "請輸入想要語音輸出的語言",
            Prompt::FunctionUnavailable => "目前不提供此服務",
        }
    }
}

/// The set of prompt texts a router runs with.
#[derive(Debug, Clone, Default)]
pub struct PromptBook {
    overrides: HashMap<Prompt, String>,
}

impl PromptBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a book from `key -> text` pairs, e.g. loaded from a prompts directory.
    ///
    /// Returns the book and the keys that matched no known prompt.
    pub fn with_overrides(entries: HashMap<String, String>) -> (Self, Vec<String>) {
        let mut overrides = HashMap::new();
        let mut unknown = Vec::new();
        for (key, text) in entries {
            match Prompt::from_key(&key) {
                Some(prompt) => {
                    overrides.insert(prompt, text.trim_end().to_string());
                }
                None => unknown.push(key),
            }
        }
        unknown.sort();
        (Self { overrides }, unknown)
    }

    pub fn text(&self, prompt: Prompt) -> &str {
        self.overrides
            .get(&prompt)
            .map(String::as_str)
            .unwrap_or_else(|| prompt.default_text())
    }

    /// Fills `{name}` placeholders in the prompt text.
    pub fn render(&self, prompt: Prompt, vars: &[(&str, &str)]) -> String {
        let mut out = self.text(prompt).to_string();
        for (name, value) in vars {
            out = out.replace(&format!("{{{name}}}"), value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_placeholders() {
        let book = PromptBook::new();
        let prompt = book.render(
            Prompt::Translate,
            &[("language", "日語"), ("sentence", "請選擇或拍攝一張菜單照片")],
        );
        assert_eq!(
            prompt,
            "使用日語翻譯請選擇或拍攝一張菜單照片 這個句子，且前後不加其他語句"
        );
    }

    #[test]
    fn test_keys_round_trip() {
        for prompt in Prompt::ALL {
            assert_eq!(Prompt::from_key(prompt.key()), Some(prompt));
        }
        assert_eq!(Prompt::from_key("not_a_prompt"), None);
    }

    #[test]
    fn test_overrides_replace_defaults_and_report_unknown_keys() {
        let mut entries = HashMap::new();
        entries.insert(
            "ask_language_name".to_string(),
            "Please type a language name.\n".to_string(),
        );
        entries.insert("greeting".to_string(), "hello".to_string());

        let (book, unknown) = PromptBook::with_overrides(entries);

        assert_eq!(
            book.text(Prompt::AskLanguageName),
            "Please type a language name."
        );
        assert_eq!(book.text(Prompt::NoDishNames), "圖片中未偵測到料理名稱");
        assert_eq!(unknown, vec!["greeting".to_string()]);
    }
}
