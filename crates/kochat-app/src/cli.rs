use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Address `serve` binds when `--bind` is absent
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Port `serve` listens on when neither `--port` nor the environment set one
pub const DEFAULT_PORT: u16 = 7860;
pub const PORT_ENV: &str = "KOCHAT_PORT";

/// CLI arguments for kochat
#[derive(Parser, Debug)]
#[command(name = "kochat")]
#[command(about = "Korean/English chat front-end for a local Deepseek model")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a TOML config file (default: kochat.toml in the working directory, if present)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// DeepL API key (overrides DEEPL_API_KEY)
    #[arg(long, value_name = "KEY", global = true)]
    pub deepl_key: Option<String>,

    /// DeepL translate endpoint (e.g. https://api.deepl.com/v2/translate for paid plans)
    #[arg(long, value_name = "URL", global = true)]
    pub deepl_url: Option<String>,

    /// Model runner executable
    #[arg(long, value_name = "COMMAND", global = true)]
    pub runner: Option<String>,

    /// Model identifier passed to `<runner> run`
    #[arg(long, value_name = "MODEL", global = true)]
    pub model: Option<String>,

    /// Initial language for new sessions (English, Korean)
    #[arg(long, value_name = "LANGUAGE", global = true)]
    pub language: Option<String>,

    /// Show the prompt as typed in the history instead of its English translation
    #[arg(long, global = true)]
    pub show_original_prompt: bool,

    /// Write every turn to a JSONL transcript
    #[arg(long, global = true)]
    pub log_conversations: bool,

    /// Directory for transcripts (default: ~/.kochat/logs)
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve the web UI (default)
    Serve {
        /// Address to bind (IPv4 or IPv6)
        #[arg(long, default_value = DEFAULT_BIND)]
        bind: String,

        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PORT, env = PORT_ENV)]
        port: u16,
    },
    /// Chat in the terminal
    Chat,
    /// Send a single prompt and print the reply
    Ask {
        /// Prompt text
        prompt: String,
    },
}

impl Cli {
    /// Subcommand to run, `serve` with its defaults when none was given
    pub fn command_or_default(&self) -> Commands {
        self.command.clone().unwrap_or_else(|| Commands::Serve {
            bind: DEFAULT_BIND.to_string(),
            port: std::env::var(PORT_ENV)
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        })
    }
}
