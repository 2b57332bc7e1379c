// Logging module - conversation transcripts and log directory helpers
pub mod conversation_logger;

use anyhow::{Context, Result};
use std::path::PathBuf;

pub use conversation_logger::{ConversationLogger, TurnRecord};

/// Safely truncate a string to a maximum number of characters
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        // Reserve space for "..." suffix
        let trunc_chars = max_chars.saturating_sub(3);
        format!("{}...", s.chars().take(trunc_chars).collect::<String>())
    }
}

/// Get or create the base kochat directory (~/.kochat)
pub fn get_kochat_dir() -> Result<PathBuf> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Failed to get home directory")?;

    let kochat_dir = PathBuf::from(home_dir).join(".kochat");

    if !kochat_dir.exists() {
        std::fs::create_dir_all(&kochat_dir).context("Failed to create kochat directory")?;
    }

    Ok(kochat_dir)
}

/// Get or create the logs directory (~/.kochat/logs)
pub fn get_logs_dir() -> Result<PathBuf> {
    let logs_dir = get_kochat_dir()?.join("logs");

    if !logs_dir.exists() {
        std::fs::create_dir_all(&logs_dir).context("Failed to create logs directory")?;
    }

    Ok(logs_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate_counts_chars_not_bytes() {
        assert_eq!(safe_truncate("short", 10), "short");
        assert_eq!(safe_truncate("안녕하세요 여러분", 6), "안녕하...");
        assert_eq!(safe_truncate("abcdef", 2), "...");
    }
}
