//! In-memory stand-ins for the translator and model runner.
//!
//! Both record every call so tests can assert on call counts and arguments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::language::LanguageCode;
use crate::runner::{ModelError, ModelRunner};
use crate::translator::{TranslateError, Translator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationCall {
    pub text: String,
    pub source: LanguageCode,
    pub target: LanguageCode,
}

/// Translator backed by a lookup table.
///
/// Unknown inputs come back as `[SRC->TGT] text`.
#[derive(Default)]
pub struct RecordingTranslator {
    table: HashMap<(String, LanguageCode, LanguageCode), String>,
    fail: bool,
    calls: Mutex<Vec<TranslationCall>>,
}

impl RecordingTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails as if no credential were configured
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_entry(mut self, text: &str, source: LanguageCode, target: LanguageCode, translated: &str) -> Self {
        self.table.insert((text.to_string(), source, target), translated.to_string());
        self
    }

    pub fn calls(&self) -> Vec<TranslationCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Translator for RecordingTranslator {
    async fn translate(
        &self,
        text: &str,
        source: LanguageCode,
        target: LanguageCode,
    ) -> Result<String, TranslateError> {
        self.calls.lock().unwrap().push(TranslationCall {
            text: text.to_string(),
            source,
            target,
        });

        if self.fail {
            return Err(TranslateError::MissingApiKey);
        }

        Ok(self
            .table
            .get(&(text.to_string(), source, target))
            .cloned()
            .unwrap_or_else(|| format!("[{}->{}] {}", source, target, text)))
    }
}

/// Model runner with canned replies.
///
/// Unknown prompts are echoed back as `echo: prompt`.
#[derive(Default)]
pub struct ScriptedRunner {
    replies: HashMap<String, String>,
    failure: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call exits non-zero with `stderr`
    pub fn failing(stderr: &str) -> Self {
        Self {
            failure: Some(stderr.to_string()),
            ..Self::default()
        }
    }

    pub fn with_reply(mut self, prompt: &str, reply: &str) -> Self {
        self.replies.insert(prompt.to_string(), reply.to_string());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelRunner for ScriptedRunner {
    async fn invoke(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(stderr) = &self.failure {
            return Err(ModelError::Failed {
                code: Some(1),
                stderr: stderr.clone(),
            });
        }

        Ok(self
            .replies
            .get(prompt)
            .cloned()
            .unwrap_or_else(|| format!("echo: {}", prompt)))
    }
}
