use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use kochat_core::{Exchange, Language};

use crate::app::setup::AppConfig;
use crate::web::session_manager::SessionManager;

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Exit,
    Clear,
    History,
    Help,
    /// `/lang` alone shows the current selection
    Language(Option<Language>),
    Prompt(String),
    Empty,
}

fn parse_line(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    match trimmed {
        "" => ReplCommand::Empty,
        "exit" | "quit" | "/exit" | "/quit" => ReplCommand::Exit,
        "/clear" => ReplCommand::Clear,
        "/history" => ReplCommand::History,
        "/help" => ReplCommand::Help,
        _ => {
            if let Some(rest) = trimmed.strip_prefix("/lang") {
                if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                    let rest = rest.trim();
                    return ReplCommand::Language((!rest.is_empty()).then(|| Language::parse_lossy(rest)));
                }
            }
            ReplCommand::Prompt(trimmed.to_string())
        }
    }
}

fn print_exchange(exchange: &Exchange, failed: bool) {
    println!("{}", exchange.user.bright_black());
    if failed {
        println!("{}\n", exchange.assistant.red());
    } else {
        println!("{}\n", exchange.assistant.green());
    }
}

fn print_help() {
    println!("{}", "Commands:".bright_cyan());
    println!("  /lang [English|Korean]  show or change the chat language");
    println!("  /clear                  clear the chat history");
    println!("  /history                print the chat history");
    println!("  exit, quit              leave\n");
}

/// Run interactive REPL mode
pub async fn run_repl_mode(app_config: AppConfig) -> Result<()> {
    println!("{}", "🤖 kochat - Korean/English bridge to a local model".bright_cyan().bold());
    println!(
        "{}",
        format!(
            "Model: {} via {} • Working directory: {}",
            app_config.chat.runner.model,
            app_config.chat.runner.command,
            app_config.work_dir.display()
        )
        .bright_black()
    );
    if !app_config.chat.translator.has_credential() {
        println!("{}", "⚠️  No DeepL API key set; Korean mode will not translate".yellow());
    }
    println!("{}", "Type '/help' for commands, 'exit' or 'quit' to exit\n".bright_black());

    let logger = app_config.logger.clone();
    let manager = SessionManager::new(app_config.chat, app_config.backends, app_config.logger);
    let session = manager.create_session(None).await;

    let mut rl = DefaultEditor::new()?;

    loop {
        let language = session.conversation.lock().await.language();
        let prompt = format!("[{}] > ", language);

        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                match parse_line(&line) {
                    ReplCommand::Empty => continue,
                    ReplCommand::Exit => break,
                    ReplCommand::Help => print_help(),
                    ReplCommand::Clear => {
                        manager.clear_session(&session).await;
                        println!("{}\n", "History cleared".bright_black());
                    }
                    ReplCommand::History => {
                        let history = session.conversation.lock().await.history().to_vec();
                        if history.is_empty() {
                            println!("{}\n", "(empty)".bright_black());
                        }
                        for exchange in &history {
                            print_exchange(exchange, false);
                        }
                    }
                    ReplCommand::Language(None) => println!("Language: {}\n", language),
                    ReplCommand::Language(Some(language)) => {
                        manager.set_language(&session, language).await;
                        println!("{}\n", format!("Language set to {}", language).bright_black());
                    }
                    ReplCommand::Prompt(text) => {
                        println!("{}", "Thinking...".bright_black());
                        let result = manager.run_turn(&session, &text, None).await;
                        if let Some(exchange) = result.history.last() {
                            print_exchange(exchange, result.error.is_some());
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{} {}", "Input error:".red(), e);
                break;
            }
        }
    }

    if let Some(logger) = logger {
        logger.lock().await.shutdown().await;
    }

    println!("Goodbye!");
    Ok(())
}
