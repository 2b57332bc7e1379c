use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::TranslatorConfig;
use crate::language::LanguageCode;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("API Key is missing")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Text translation between two language codes
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: LanguageCode,
        target: LanguageCode,
    ) -> Result<String, TranslateError>;
}

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

/// DeepL `/v2/translate` client.
///
/// One form-encoded POST per call, no retry.
pub struct DeeplTranslator {
    http: reqwest::Client,
    endpoint: String,
    auth_scheme: String,
    api_key: String,
}

impl DeeplTranslator {
    pub fn new(config: &TranslatorConfig) -> Result<Self, TranslateError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!("kochat/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: config.endpoint.clone(),
            auth_scheme: config.auth_scheme.clone(),
            api_key: config.api_key.trim().to_string(),
        })
    }
}

#[async_trait]
impl Translator for DeeplTranslator {
    async fn translate(
        &self,
        text: &str,
        source: LanguageCode,
        target: LanguageCode,
    ) -> Result<String, TranslateError> {
        if self.api_key.is_empty() {
            return Err(TranslateError::MissingApiKey);
        }

        tracing::debug!(%source, %target, chars = text.chars().count(), "translating");

        let form = [
            ("text", text),
            ("source_lang", source.as_deepl()),
            ("target_lang", target.as_deepl()),
        ];

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("{} {}", self.auth_scheme, self.api_key))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "translation service rejected request");
            return Err(TranslateError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let parsed: DeeplResponse =
            serde_json::from_str(&body).map_err(|e| TranslateError::Malformed(e.to_string()))?;

        let first = parsed
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| TranslateError::Malformed("no translations in response".to_string()))?;

        if let Some(detected) = &first.detected_source_language {
            if detected != source.as_deepl() {
                tracing::debug!(expected = %source, %detected, "source language mismatch");
            }
        }

        Ok(first.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        // Endpoint is unroutable; the call must never get that far.
        let config = TranslatorConfig {
            api_key: "   ".to_string(),
            endpoint: "http://127.0.0.1:9/v2/translate".to_string(),
            ..TranslatorConfig::default()
        };
        let translator = DeeplTranslator::new(&config).unwrap();

        let err = translator
            .translate("안녕", LanguageCode::Ko, LanguageCode::En)
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::MissingApiKey));
        assert_eq!(err.to_string(), "API Key is missing");
    }

    #[test]
    fn test_status_error_message() {
        let err = TranslateError::Status {
            status: 403,
            body: "Forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 403: Forbidden");
    }
}
