// Core chat pipeline: translate-in, run the local model, translate-out, record.
pub mod config;
pub mod conversation;
pub mod language;
pub mod runner;
pub mod translator;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{ChatConfig, ChatSettings, ConfigError, RunnerConfig, TranslatorConfig, UserTurnDisplay};
pub use conversation::{Conversation, Exchange, TurnError, TurnOutcome, TurnResult};
pub use language::{prepare_input, prepare_output, Language, LanguageCode};
pub use runner::{ModelError, ModelRunner, OllamaRunner, RunnerOutput};
pub use translator::{DeeplTranslator, TranslateError, Translator};
