use anyhow::Result;
use colored::Colorize;

use crate::app::setup::AppConfig;
use crate::web::session_manager::SessionManager;

/// Run a single turn and print the reply
pub async fn run_ask_mode(prompt: &str, app_config: AppConfig) -> Result<()> {
    let logger = app_config.logger.clone();
    let manager = SessionManager::new(app_config.chat, app_config.backends, app_config.logger);
    let session = manager.create_session(None).await;

    let result = manager.run_turn(&session, prompt, None).await;

    if let Some(exchange) = result.history.last() {
        if result.error.is_some() {
            eprintln!("{}", exchange.assistant.red());
        } else {
            println!("{}", exchange.assistant);
        }
    }

    if let Some(logger) = logger {
        logger.lock().await.shutdown().await;
    }

    Ok(())
}
