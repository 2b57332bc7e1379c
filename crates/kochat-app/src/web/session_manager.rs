use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use kochat_core::{ChatConfig, Conversation, Language, TurnResult};
use kochat_logging::{safe_truncate, TurnRecord};

use crate::app::setup::{Backends, SharedLogger};
use crate::web::protocol::{SessionDetails, SessionId, SessionInfo};

/// Listing fields kept outside the conversation lock
#[derive(Debug, Clone, Copy)]
struct SessionStatus {
    last_activity: DateTime<Utc>,
    language: Language,
    exchange_count: usize,
}

/// A chat session: one conversation, one language selection
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    status: Mutex<SessionStatus>,
    /// Held for the whole turn, so submits to one session run in order
    pub conversation: Mutex<Conversation>,
}

impl Session {
    fn new(id: SessionId, conversation: Conversation) -> Self {
        let now = Utc::now();
        let status = SessionStatus {
            last_activity: now,
            language: conversation.language(),
            exchange_count: conversation.history().len(),
        };
        Self {
            id,
            created_at: now,
            status: Mutex::new(status),
            conversation: Mutex::new(conversation),
        }
    }

    async fn record(&self, language: Language, exchange_count: usize) {
        let mut status = self.status.lock().await;
        status.last_activity = Utc::now();
        status.language = language;
        status.exchange_count = exchange_count;
    }

    /// Does not wait for a turn in progress
    pub async fn get_info(&self) -> SessionInfo {
        let status = *self.status.lock().await;

        SessionInfo {
            id: self.id,
            created_at: self.created_at.to_rfc3339(),
            last_activity: status.last_activity.to_rfc3339(),
            language: status.language,
            exchange_count: status.exchange_count,
        }
    }

    pub async fn get_details(&self) -> SessionDetails {
        let history = self.conversation.lock().await.history().to_vec();
        let info = self.get_info().await;
        SessionDetails { info, history }
    }
}

/// Manages all active sessions. Nothing is persisted.
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    config: ChatConfig,
    backends: Backends,
    logger: Option<SharedLogger>,
}

impl SessionManager {
    pub fn new(config: ChatConfig, backends: Backends, logger: Option<SharedLogger>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
            backends,
            logger,
        }
    }

    /// Build a conversation wired to the shared backends
    pub fn new_conversation(&self) -> Conversation {
        Conversation::new(
            self.backends.translator.clone(),
            self.backends.runner.clone(),
            self.config.chat.clone(),
        )
    }

    pub async fn create_session(&self, language: Option<Language>) -> Arc<Session> {
        let mut conversation = self.new_conversation();
        if let Some(language) = language {
            conversation.set_language(language);
        }

        let session = Arc::new(Session::new(Uuid::new_v4(), conversation));
        self.sessions.write().await.insert(session.id, session.clone());
        tracing::info!(session_id = %session.id, "session created");
        session
    }

    pub async fn get_session(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Returns false when no such session exists
    pub async fn remove_session(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "session closed");
        }
        removed
    }

    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();

        let mut infos = Vec::with_capacity(sessions.len());
        for session in sessions {
            infos.push(session.get_info().await);
        }
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        infos
    }

    /// Run one turn for `session`, switching its language first if one was sent
    pub async fn run_turn(&self, session: &Session, prompt: &str, language: Option<Language>) -> TurnResult {
        let mut conversation = session.conversation.lock().await;
        let language = language.unwrap_or_else(|| conversation.language());
        let exchange_count = conversation.history().len();
        session.record(language, exchange_count).await;

        tracing::info!(
            session_id = %session.id,
            %language,
            prompt = %safe_truncate(prompt, 60),
            "turn started"
        );

        let result = conversation.handle_turn_in(prompt, language).await;
        session.record(language, result.history.len()).await;
        drop(conversation);

        match &result.error {
            Some(error) => tracing::warn!(session_id = %session.id, "turn failed: {}", error),
            None => tracing::info!(session_id = %session.id, "turn completed"),
        }

        if let (Some(logger), Some(last)) = (&self.logger, result.history.last()) {
            let session_id = session.id.to_string();
            logger
                .lock()
                .await
                .log_turn(TurnRecord {
                    session_id: &session_id,
                    language: language.as_str(),
                    model: &self.config.runner.model,
                    user: &last.user,
                    assistant: &last.assistant,
                    failed: result.error.is_some(),
                })
                .await;
        }

        result
    }

    pub async fn clear_session(&self, session: &Session) -> TurnResult {
        let mut conversation = session.conversation.lock().await;
        let result = conversation.clear();
        session.record(conversation.language(), 0).await;
        drop(conversation);

        if let Some(logger) = &self.logger {
            logger.lock().await.log_clear(&session.id.to_string()).await;
        }

        result
    }

    pub async fn set_language(&self, session: &Session, language: Language) {
        let mut conversation = session.conversation.lock().await;
        conversation.set_language(language);
        session.record(language, conversation.history().len()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kochat_core::testing::{RecordingTranslator, ScriptedRunner};

    fn manager() -> SessionManager {
        let backends = Backends {
            translator: Arc::new(RecordingTranslator::new()),
            runner: Arc::new(ScriptedRunner::new()),
        };
        SessionManager::new(ChatConfig::default(), backends, None)
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let manager = manager();
        let first = manager.create_session(None).await;
        let second = manager.create_session(Some(Language::Korean)).await;

        manager.run_turn(&first, "hello", None).await;

        assert_eq!(first.get_info().await.exchange_count, 1);
        assert_eq!(second.get_info().await.exchange_count, 0);
        assert_eq!(first.get_info().await.language, Language::English);
        assert_eq!(second.get_info().await.language, Language::Korean);
    }

    #[tokio::test]
    async fn test_remove_and_list() {
        let manager = manager();
        let session = manager.create_session(None).await;
        assert_eq!(manager.list_sessions().await.len(), 1);

        assert!(manager.remove_session(&session.id).await);
        assert!(!manager.remove_session(&session.id).await);
        assert!(manager.get_session(&session.id).await.is_none());
        assert!(manager.list_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_turn_language_sticks() {
        let manager = manager();
        let session = manager.create_session(None).await;

        manager.run_turn(&session, "안녕", Some(Language::Korean)).await;
        let result = manager.run_turn(&session, "다시", None).await;

        assert_eq!(session.get_info().await.language, Language::Korean);
        // Fake translator tags translated text with its direction
        assert_eq!(result.history[1].user, "User: [KO->EN] 다시");
    }

    /// Runner that parks until released, to hold a turn open
    #[derive(Default)]
    struct GatedRunner {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl kochat_core::ModelRunner for GatedRunner {
        async fn invoke(&self, prompt: &str) -> Result<String, kochat_core::ModelError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(format!("done: {}", prompt))
        }
    }

    #[tokio::test]
    async fn test_listing_does_not_wait_for_running_turn() {
        let runner = Arc::new(GatedRunner::default());
        let backends = Backends {
            translator: Arc::new(RecordingTranslator::new()),
            runner: runner.clone(),
        };
        let manager = Arc::new(SessionManager::new(ChatConfig::default(), backends, None));
        let session = manager.create_session(None).await;

        let turn = {
            let manager = manager.clone();
            let session = session.clone();
            tokio::spawn(async move { manager.run_turn(&session, "slow", Some(Language::Korean)).await })
        };
        runner.entered.notified().await;
        assert!(session.conversation.try_lock().is_err());

        let listed = tokio::time::timeout(std::time::Duration::from_secs(1), manager.list_sessions())
            .await
            .expect("listing blocked on the running turn");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].language, Language::Korean);
        assert_eq!(listed[0].exchange_count, 0);

        runner.release.notify_one();
        turn.await.unwrap();
        assert_eq!(session.get_info().await.exchange_count, 1);
    }

    #[tokio::test]
    async fn test_concurrent_submits_keep_order() {
        let manager = Arc::new(manager());
        let session = manager.create_session(None).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let manager = manager.clone();
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                manager.run_turn(&session, &format!("prompt {}", i), None).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let details = session.get_details().await;
        assert_eq!(details.history.len(), 8);
        // Each exchange pairs its own prompt with its own reply
        for exchange in &details.history {
            let prompt = exchange.user.trim_start_matches("User: ");
            assert_eq!(exchange.assistant, format!("Deepseek: echo: {}", prompt));
        }
    }
}
