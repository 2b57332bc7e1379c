use kochat_core::{Exchange, Language, TurnResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session ID type
pub type SessionId = Uuid;

/// Body of `POST /api/sessions`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub language: Option<Language>,
}

/// Body of `POST /api/sessions/:id/turn`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub prompt: String,
    /// Selector value sent with the submit; keeps the session's language when absent
    #[serde(default)]
    pub language: Option<Language>,
}

/// Body of `PUT /api/sessions/:id/language`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageRequest {
    pub language: Language,
}

/// History plus the new input box contents, returned by turn and clear
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub history: Vec<Exchange>,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<TurnResult> for TurnResponse {
    fn from(result: TurnResult) -> Self {
        Self {
            history: result.history,
            input: result.input,
            error: result.error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: SessionId,
    pub created_at: String,
    pub language: Language,
}

/// Session information for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub created_at: String,
    pub last_activity: String,
    pub language: Language,
    pub exchange_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetails {
    #[serde(flatten)]
    pub info: SessionInfo,
    pub history: Vec<Exchange>,
}
