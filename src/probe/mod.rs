//! Probe module for host availability.
//!
//! One ping process per target, all launched before any is awaited.

mod ping;

pub use ping::*;

use std::collections::BTreeMap;
use thiserror::Error;

use crate::command::{run_all, ToolError};
use crate::db::Target;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("launch failed: {0}")]
    Launch(#[from] ToolError),
    #[error("ping exited with code {code}: {message}")]
    Exit { code: i32, message: String },
    #[error("ping terminated by signal")]
    Signal,
}

/// Exit codes at or above this mean ping itself failed (bad name,
/// permissions), rather than the host not answering.
const PING_ERROR_EXIT: i32 = 2;

/// Captured result of one probe invocation.
#[derive(Debug)]
pub struct ProbeOutput {
    /// stdout followed by stderr.
    pub text: String,
    pub error: Option<ProbeError>,
}

impl ProbeOutput {
    pub fn from_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            error: None,
        }
    }

    pub fn failed(error: ProbeError) -> Self {
        Self {
            text: String::new(),
            error: Some(error),
        }
    }

    fn from_process(output: std::process::Output) -> Self {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = format!("{}{}", stdout, stderr);

        let error = match output.status.code() {
            Some(code) if code >= PING_ERROR_EXIT => Some(ProbeError::Exit {
                code,
                message: stderr.trim().to_string(),
            }),
            Some(_) => None,
            None => Some(ProbeError::Signal),
        };

        Self { text, error }
    }
}

/// Probe every target concurrently and wait for all of them.
///
/// Results are keyed by target id.
pub async fn run_probes(
    ping_bin: &str,
    targets: &BTreeMap<String, Target>,
) -> BTreeMap<String, ProbeOutput> {
    let commands: Vec<_> = targets
        .iter()
        .map(|(id, target)| {
            let cmd = ping_command(ping_bin, &target.address, target.count);
            tracing::debug!("{}: {}", id, cmd);
            (id.clone(), cmd)
        })
        .collect();

    tracing::debug!("Spawned {} ping commands", commands.len());

    run_all(commands)
        .await
        .into_iter()
        .map(|(id, result)| {
            let output = match result {
                Ok(output) => ProbeOutput::from_process(output),
                Err(e) => ProbeOutput::failed(ProbeError::Launch(e)),
            };
            if let Some(e) = &output.error {
                tracing::debug!("Probe failed for {}: {}", id, e);
            }
            (id, output)
        })
        .collect()
}
