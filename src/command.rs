//! External tool invocation.
//!
//! Every collaborator (ping, rrdtool) is driven through a [`ToolCommand`]:
//! a program plus its argument vector, run without a shell.

use std::fmt;
use std::process::{Output, Stdio};
use thiserror::Error;
use tokio::process::Command;

/// Tool invocation error types.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("task join failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run to completion, capturing stdout and stderr.
    pub async fn output(&self) -> Result<Output, ToolError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    /// Run to completion and treat a non-zero exit as an error.
    ///
    /// Returns stdout on success.
    pub async fn run(&self) -> Result<String, ToolError> {
        let output = self.output().await?;
        if !output.status.success() {
            return Err(ToolError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Launch every command, then wait for all of them.
///
/// Results come back in the order the commands were given. Nothing is
/// awaited until all processes have been started, so wall-clock cost is
/// that of the slowest command rather than the sum.
pub async fn run_all<K>(commands: Vec<(K, ToolCommand)>) -> Vec<(K, Result<Output, ToolError>)>
where
    K: Send + 'static,
{
    let handles: Vec<_> = commands
        .into_iter()
        .map(|(key, cmd)| (key, tokio::spawn(async move { cmd.output().await })))
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (key, handle) in handles {
        let result = match handle.await {
            Ok(r) => r,
            Err(e) => Err(ToolError::Join(e)),
        };
        results.push((key, result));
    }
    results
}
