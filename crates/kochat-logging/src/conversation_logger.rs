use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

#[derive(Serialize)]
struct LogEntry<'a> {
    timestamp: String, // ISO‑8601 Local time
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_error: Option<bool>,
}

/// One finished turn as it should appear in the transcript
#[derive(Debug, Clone, Copy)]
pub struct TurnRecord<'a> {
    pub session_id: &'a str,
    pub language: &'a str,
    pub model: &'a str,
    pub user: &'a str,
    pub assistant: &'a str,
    pub failed: bool,
}

/// Appends chat turns to a JSONL file, one line per message
pub struct ConversationLogger {
    file_path: PathBuf,
    file: Option<tokio::fs::File>,
}

impl ConversationLogger {
    /// Create a new logger in `logs_dir`; the file name is based on the current local time.
    pub async fn new(logs_dir: &Path) -> Result<Self> {
        fs::create_dir_all(logs_dir).await?;

        let now_local = Local::now();
        let filename = format!("kochat-{}.jsonl", now_local.format("%Y-%m-%d-%H%M%S"));
        let file_path = logs_dir.join(filename);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await?;
        Ok(Self {
            file_path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Append both halves of a turn.
    pub async fn log_turn(&mut self, record: TurnRecord<'_>) {
        self.write_entry(LogEntry {
            timestamp: Local::now().to_rfc3339(),
            role: "user",
            content: record.user,
            session_id: Some(record.session_id),
            language: Some(record.language),
            model: None,
            is_error: None,
        })
        .await;

        self.write_entry(LogEntry {
            timestamp: Local::now().to_rfc3339(),
            role: "assistant",
            content: record.assistant,
            session_id: Some(record.session_id),
            language: Some(record.language),
            model: Some(record.model),
            is_error: if record.failed { Some(true) } else { None },
        })
        .await;
    }

    /// Record that a session's history was cleared
    pub async fn log_clear(&mut self, session_id: &str) {
        self.write_entry(LogEntry {
            timestamp: Local::now().to_rfc3339(),
            role: "system",
            content: "history cleared",
            session_id: Some(session_id),
            language: None,
            model: None,
            is_error: None,
        })
        .await;
    }

    async fn write_entry(&mut self, entry: LogEntry<'_>) {
        let Some(file) = &mut self.file else {
            return;
        };
        let mut json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(path = %self.file_path.display(), "conversation log entry not serializable: {}", e);
                return;
            }
        };
        json.push('\n');

        if warn_on_error(&self.file_path, "write", file.write_all(json.as_bytes()).await) {
            warn_on_error(&self.file_path, "flush", file.flush().await);
        }
    }

    /// Close the logger. Called on graceful shutdown.
    pub async fn shutdown(&mut self) {
        if let Some(mut file) = self.file.take() {
            warn_on_error(&self.file_path, "flush", file.flush().await);
            warn_on_error(&self.file_path, "sync", file.sync_all().await);
        }
    }
}

/// Logging never fails a turn; IO errors only produce a warning
fn warn_on_error(path: &Path, action: &str, result: std::io::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), "conversation log {} failed: {}", action, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted tracing output
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_warnings() -> (Captured, tracing::subscriber::DefaultGuard) {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();
        (captured, tracing::subscriber::set_default(subscriber))
    }

    #[test]
    fn test_io_errors_are_warned_not_dropped() {
        let (captured, _guard) = capture_warnings();

        assert!(warn_on_error(Path::new("/tmp/log.jsonl"), "flush", Ok(())));
        let failed = warn_on_error(
            Path::new("/tmp/log.jsonl"),
            "sync",
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone")),
        );

        assert!(!failed);
        let output = captured.text();
        assert!(output.contains("conversation log sync failed: disk gone"), "output: {}", output);
        assert!(!output.contains("flush failed"));
    }

    #[tokio::test]
    async fn test_write_failure_is_warned() {
        let (captured, _guard) = capture_warnings();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("read-only.jsonl");
        std::fs::write(&path, "").unwrap();

        // Opened without write access, so every append fails
        let mut logger = ConversationLogger {
            file_path: path.clone(),
            file: Some(tokio::fs::File::open(&path).await.unwrap()),
        };
        logger.log_clear("s-3").await;

        // tokio buffers the write, so the error can surface at either step
        let output = captured.text();
        assert!(
            output.contains("conversation log write failed") || output.contains("conversation log flush failed"),
            "output: {}",
            output
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[tokio::test]
    async fn test_turn_is_two_json_lines() {
        let temp_dir = TempDir::new().unwrap();
        let logs_dir = temp_dir.path().join("logs");
        let mut logger = ConversationLogger::new(&logs_dir).await.unwrap();

        logger
            .log_turn(TurnRecord {
                session_id: "s-1",
                language: "Korean",
                model: "deepseek-ai/deepseek-llm",
                user: "User: Hello",
                assistant: "Deepseek: 답장",
                failed: false,
            })
            .await;
        logger.log_clear("s-1").await;
        logger.shutdown().await;

        let content = std::fs::read_to_string(logger.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["role"], "user");
        assert_eq!(lines[0]["content"], "User: Hello");
        assert_eq!(lines[1]["role"], "assistant");
        assert_eq!(lines[1]["content"], "Deepseek: 답장");
        assert_eq!(lines[1]["model"], "deepseek-ai/deepseek-llm");
        assert!(lines[1].get("is_error").is_none());
        assert_eq!(lines[2]["role"], "system");
    }

    #[tokio::test]
    async fn test_failed_turn_is_flagged() {
        let temp_dir = TempDir::new().unwrap();
        let mut logger = ConversationLogger::new(temp_dir.path()).await.unwrap();

        logger
            .log_turn(TurnRecord {
                session_id: "s-2",
                language: "English",
                model: "m",
                user: "User: hi",
                assistant: "Deepseek: Deepseek Error: boom",
                failed: true,
            })
            .await;

        let content = std::fs::read_to_string(logger.path()).unwrap();
        let last: serde_json::Value = serde_json::from_str(content.lines().last().unwrap()).unwrap();
        assert_eq!(last["is_error"], true);
        assert!(logger.path().file_name().unwrap().to_string_lossy().starts_with("kochat-"));
    }
}
