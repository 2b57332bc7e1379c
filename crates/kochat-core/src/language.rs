use serde::{Deserialize, Serialize};
use std::fmt;

use crate::translator::{TranslateError, Translator};

/// Language the user chats in.
///
/// Korean turns on the translation bridge around the English-only model.
/// Deserialization never fails: unknown values fall back to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Language {
    #[default]
    English,
    Korean,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Korean];

    /// Parse a selector value, defaulting anything unrecognised to English
    pub fn parse_lossy(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "korean" | "ko" | "kr" | "한국어" => Language::Korean,
            _ => Language::English,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Korean => "Korean",
        }
    }

    pub fn needs_translation(&self) -> bool {
        matches!(self, Language::Korean)
    }
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        Language::parse_lossy(&value)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language codes understood by the translation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageCode {
    Ko,
    En,
}

impl LanguageCode {
    pub fn as_deepl(&self) -> &'static str {
        match self {
            LanguageCode::Ko => "KO",
            LanguageCode::En => "EN",
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_deepl())
    }
}

/// Turn a user prompt into the text sent to the model
pub async fn prepare_input(
    translator: &dyn Translator,
    prompt: &str,
    language: Language,
) -> Result<String, TranslateError> {
    match language {
        Language::Korean => translator.translate(prompt, LanguageCode::Ko, LanguageCode::En).await,
        Language::English => Ok(prompt.to_string()),
    }
}

/// Turn model output into the text shown to the user
pub async fn prepare_output(
    translator: &dyn Translator,
    model_text: &str,
    language: Language,
) -> Result<String, TranslateError> {
    match language {
        Language::Korean => translator.translate(model_text, LanguageCode::En, LanguageCode::Ko).await,
        Language::English => Ok(model_text.to_string()),
    }
}
