use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ChatSettings, UserTurnDisplay};
use crate::language::{prepare_input, prepare_output, Language};
use crate::runner::{ModelError, ModelRunner};
use crate::translator::{TranslateError, Translator};

/// One recorded turn: formatted user text and formatted reply.
///
/// Serializes as a `[user, assistant]` pair, the shape chat widgets expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

impl Exchange {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

impl From<(String, String)> for Exchange {
    fn from((user, assistant): (String, String)) -> Self {
        Self { user, assistant }
    }
}

impl From<Exchange> for (String, String) {
    fn from(exchange: Exchange) -> Self {
        (exchange.user, exchange.assistant)
    }
}

/// A turn that could not produce a normal reply.
///
/// The `Display` text is what ends up in the chat history.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Translation Error: {0}")]
    Translation(#[from] TranslateError),
    #[error("{label} Error: {source}")]
    Model {
        label: String,
        #[source]
        source: ModelError,
    },
}

/// Result of running the pipeline once, before it is recorded.
///
/// A failed step hands its error text to the next step, so `reply` is
/// always the text that ends up in history.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Prompt as it entered the model, or as typed if inbound translation failed
    pub display_prompt: String,
    pub reply: String,
    /// First step that failed
    pub error: Option<TurnError>,
}

/// State handed back to the UI after a turn or a clear
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    pub history: Vec<Exchange>,
    /// New contents of the input box; always empty
    pub input: String,
    /// Rendered error text when the turn failed
    pub error: Option<String>,
}

/// One chat session: its language selection and ordered history
pub struct Conversation {
    translator: Arc<dyn Translator>,
    runner: Arc<dyn ModelRunner>,
    settings: ChatSettings,
    language: Language,
    history: Vec<Exchange>,
}

impl Conversation {
    pub fn new(translator: Arc<dyn Translator>, runner: Arc<dyn ModelRunner>, settings: ChatSettings) -> Self {
        let language = settings.default_language;
        Self {
            translator,
            runner,
            settings,
            language,
            history: Vec::new(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Translate in, run the model, translate out. Does not touch history.
    ///
    /// Every step runs on every turn; an error is rendered at the step that
    /// produced it and flows on as ordinary text.
    pub async fn run_pipeline(&self, prompt: &str, language: Language) -> TurnOutcome {
        let mut error: Option<TurnError> = None;

        let (model_prompt, display_prompt) =
            match prepare_input(self.translator.as_ref(), prompt, language).await {
                Ok(text) => (text.clone(), text),
                Err(e) => {
                    let failure = TurnError::from(e);
                    let rendered = failure.to_string();
                    error = Some(failure);
                    (rendered, prompt.to_string())
                }
            };

        let raw = match self.runner.invoke(&model_prompt).await {
            Ok(raw) => raw,
            Err(source) => {
                let failure = TurnError::Model {
                    label: self.settings.assistant_label.clone(),
                    source,
                };
                let rendered = failure.to_string();
                if error.is_none() {
                    error = Some(failure);
                }
                rendered
            }
        };

        let reply = match prepare_output(self.translator.as_ref(), &raw, language).await {
            Ok(text) => text,
            Err(e) => {
                let failure = TurnError::from(e);
                let rendered = failure.to_string();
                if error.is_none() {
                    error = Some(failure);
                }
                rendered
            }
        };

        TurnOutcome {
            display_prompt,
            reply,
            error,
        }
    }

    /// Run one turn in the current language and append it to history
    pub async fn handle_turn(&mut self, prompt: &str) -> TurnResult {
        let language = self.language;
        self.handle_turn_in(prompt, language).await
    }

    /// Run one turn in an explicit language, which becomes the session's selection
    pub async fn handle_turn_in(&mut self, prompt: &str, language: Language) -> TurnResult {
        self.language = language;
        let outcome = self.run_pipeline(prompt, language).await;

        let shown_prompt = match self.settings.user_turn {
            UserTurnDisplay::Translated => outcome.display_prompt.as_str(),
            UserTurnDisplay::Original => prompt,
        };
        let error = outcome.error.map(|e| e.to_string());

        let exchange = Exchange::new(
            format!("{}: {}", self.settings.user_label, shown_prompt),
            format!("{}: {}", self.settings.assistant_label, outcome.reply),
        );
        self.history.push(exchange);

        TurnResult {
            history: self.history.clone(),
            input: String::new(),
            error,
        }
    }

    pub fn clear(&mut self) -> TurnResult {
        self.history.clear();
        TurnResult {
            history: Vec::new(),
            input: String::new(),
            error: None,
        }
    }
}
