use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;

use crate::config::RunnerConfig;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{}", describe_failure(.code, .stderr))]
    Failed { code: Option<i32>, stderr: String },
}

fn describe_failure(code: &Option<i32>, stderr: &str) -> String {
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match code {
        Some(code) => format!("model runner exited with status {}", code),
        None => "model runner was terminated by a signal".to_string(),
    }
}

/// Produces a reply for a prompt
#[async_trait]
pub trait ModelRunner: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Raw result of one runner process
#[derive(Debug)]
pub struct RunnerOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Launches `<command> run <model> <prompt>` and waits for it to exit.
///
/// No timeout and no streaming: the reply is whatever the process printed.
#[derive(Debug, Clone)]
pub struct OllamaRunner {
    command: String,
    model: String,
}

impl OllamaRunner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            command: config.command.clone(),
            model: config.model.clone(),
        }
    }

    /// Arguments following the command
    pub fn args<'a>(&'a self, prompt: &'a str) -> [&'a str; 3] {
        ["run", &self.model, prompt]
    }

    pub async fn run(&self, prompt: &str) -> Result<RunnerOutput, ModelError> {
        tracing::debug!(command = %self.command, model = %self.model, "launching model runner");

        let output = Command::new(&self.command)
            .args(self.args(prompt))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ModelError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        Ok(RunnerOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl ModelRunner for OllamaRunner {
    async fn invoke(&self, prompt: &str) -> Result<String, ModelError> {
        let output = self.run(prompt).await?;

        if output.status.success() {
            Ok(output.stdout.trim().to_string())
        } else {
            tracing::warn!(code = ?output.status.code(), "model runner failed");
            Err(ModelError::Failed {
                code: output.status.code(),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}
