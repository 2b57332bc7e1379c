use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use kochat_core::{
    ChatConfig, DeeplTranslator, Language, ModelRunner, OllamaRunner, Translator, UserTurnDisplay,
};
use kochat_logging::ConversationLogger;

use crate::cli::Cli;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "kochat.toml";

pub type SharedLogger = Arc<Mutex<ConversationLogger>>;

/// Translator and model runner shared by every session
#[derive(Clone)]
pub struct Backends {
    pub translator: Arc<dyn Translator>,
    pub runner: Arc<dyn ModelRunner>,
}

/// Application configuration derived from CLI arguments, environment and config file
pub struct AppConfig {
    pub chat: ChatConfig,
    pub backends: Backends,
    pub logger: Option<SharedLogger>,
    pub work_dir: PathBuf,
}

/// Merge configuration sources.
///
/// Precedence: CLI flags > environment > config file > defaults
pub fn resolve_config<F>(cli: &Cli, work_dir: &Path, lookup: F) -> Result<ChatConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => {
            let candidate = work_dir.join(DEFAULT_CONFIG_FILE);
            candidate.exists().then_some(candidate)
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config file");
            ChatConfig::load(path)?
        }
        None => ChatConfig::default(),
    };

    config.apply_env(lookup);

    if let Some(key) = &cli.deepl_key {
        config.translator.api_key = key.clone();
    }
    if let Some(url) = &cli.deepl_url {
        config.translator.endpoint = url.clone();
    }
    if let Some(runner) = &cli.runner {
        config.runner.command = runner.clone();
    }
    if let Some(model) = &cli.model {
        config.runner.model = model.clone();
    }
    if let Some(language) = &cli.language {
        config.chat.default_language = Language::parse_lossy(language);
    }
    if cli.show_original_prompt {
        config.chat.user_turn = UserTurnDisplay::Original;
    }

    Ok(config)
}

pub fn build_backends(config: &ChatConfig) -> Result<Backends> {
    let translator = DeeplTranslator::new(&config.translator).context("Failed to build translation client")?;
    let runner = OllamaRunner::new(&config.runner);

    Ok(Backends {
        translator: Arc::new(translator),
        runner: Arc::new(runner),
    })
}

async fn open_logger(cli: &Cli) -> Option<SharedLogger> {
    if !cli.log_conversations {
        return None;
    }

    let logs_dir = match &cli.log_dir {
        Some(dir) => dir.clone(),
        None => match kochat_logging::get_logs_dir() {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!("Conversation logging disabled: {:#}", e);
                return None;
            }
        },
    };

    match ConversationLogger::new(&logs_dir).await {
        Ok(logger) => {
            tracing::info!(path = %logger.path().display(), "logging conversations");
            Some(Arc::new(Mutex::new(logger)))
        }
        Err(e) => {
            tracing::warn!("Conversation logging disabled: {:#}", e);
            None
        }
    }
}

/// Set up application configuration from CLI arguments
pub async fn setup_from_cli(cli: &Cli) -> Result<AppConfig> {
    let work_dir = env::current_dir().context("Failed to determine working directory")?;
    let chat = resolve_config(cli, &work_dir, |name| env::var(name).ok())?;

    if !chat.translator.has_credential() {
        tracing::warn!("No DeepL API key configured; Korean mode will report translation errors");
    }
    tracing::debug!(config = ?chat, "resolved configuration");

    let backends = build_backends(&chat)?;
    let logger = open_logger(cli).await;

    Ok(AppConfig {
        chat,
        backends,
        logger,
        work_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup<'a>(vars: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name: &str| vars.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults_without_sources() {
        let temp_dir = TempDir::new().unwrap();
        let cli = Cli::parse_from(["kochat"]);
        let vars = HashMap::new();

        let config = resolve_config(&cli, temp_dir.path(), lookup(&vars)).unwrap();

        assert_eq!(config.runner.command, "ollama");
        assert_eq!(config.runner.model, "deepseek-ai/deepseek-llm");
        assert_eq!(config.chat.default_language, Language::English);
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(DEFAULT_CONFIG_FILE),
            "[runner]\ncommand = \"file-runner\"\nmodel = \"file-model\"\n\n[translator]\napi_key = \"file-key\"\n",
        )
        .unwrap();

        let vars = HashMap::from([("KOCHAT_MODEL", "env-model"), ("DEEPL_API_KEY", "env-key")]);
        let cli = Cli::parse_from(["kochat", "--deepl-key", "cli-key"]);

        let config = resolve_config(&cli, temp_dir.path(), lookup(&vars)).unwrap();

        assert_eq!(config.runner.command, "file-runner");
        assert_eq!(config.runner.model, "env-model");
        assert_eq!(config.translator.api_key, "cli-key");
    }

    #[test]
    fn test_explicit_config_path_and_flags() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "[chat]\nassistant_label = \"Bot\"\n").unwrap();

        let cli = Cli::parse_from([
            "kochat",
            "--config",
            path.to_str().unwrap(),
            "--language",
            "korean",
            "--show-original-prompt",
        ]);
        let vars = HashMap::new();

        let config = resolve_config(&cli, Path::new("/nonexistent"), lookup(&vars)).unwrap();

        assert_eq!(config.chat.assistant_label, "Bot");
        assert_eq!(config.chat.default_language, Language::Korean);
        assert_eq!(config.chat.user_turn, UserTurnDisplay::Original);
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let cli = Cli::parse_from(["kochat", "--config", "/nonexistent/kochat.toml"]);
        let vars = HashMap::new();
        assert!(resolve_config(&cli, Path::new("/nonexistent"), lookup(&vars)).is_err());
    }
}
