use anyhow::{Context, Result};
use colored::Colorize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::app::setup::AppConfig;
use crate::web::server::{WebServer, WebServerConfig};
use crate::web::session_manager::SessionManager;

/// Socket address for `--bind` and `--port`; `bind` may be IPv4 or IPv6
pub fn bind_address(bind: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = bind
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .with_context(|| format!("Invalid bind address {}", bind))?;
    Ok(SocketAddr::new(ip, port))
}

/// Run the web server
pub async fn run_web_server(bind: &str, port: u16, app_config: AppConfig) -> Result<()> {
    let addr = bind_address(bind, port)?;

    println!("{}", "🌐 Starting kochat web UI...".bright_cyan().bold());
    println!("   Address: http://{}", addr);
    println!(
        "   Model: {} via {}",
        app_config.chat.runner.model, app_config.chat.runner.command
    );

    let logger = app_config.logger.clone();
    let session_manager = Arc::new(SessionManager::new(
        app_config.chat,
        app_config.backends,
        app_config.logger,
    ));

    let server = WebServer::new(WebServerConfig { bind_addr: addr }, session_manager);
    let result = server.start().await;

    if let Some(logger) = logger {
        logger.lock().await.shutdown().await;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address_accepts_ipv4_and_ipv6() {
        assert_eq!(bind_address("127.0.0.1", 7860).unwrap().to_string(), "127.0.0.1:7860");
        assert_eq!(bind_address("::1", 7860).unwrap().to_string(), "[::1]:7860");
        assert_eq!(bind_address("[::]", 80).unwrap().to_string(), "[::]:80");
    }

    #[test]
    fn test_bind_address_rejects_hostnames() {
        assert!(bind_address("localhost:80", 7860).is_err());
        assert!(bind_address("not an ip", 7860).is_err());
    }
}
