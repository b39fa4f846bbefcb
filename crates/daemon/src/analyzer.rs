// SPDX-License-Identifier: MIT

//! The concrete `AnalyzerProcessor`: invokes the external analyzer as a
//! subprocess, feeds it a JSON job descriptor on stdin, and mines its
//! stdout JSON-Lines event stream for the node JSON.

use async_trait::async_trait;
use serde_json::Value;
use sg_core::Job;
use sg_worker::{AnalyzerOutput, AnalyzerProcessor, WorkerError};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct SubprocessAnalyzer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SubprocessAnalyzer {
    /// `command` is the analyzer's program plus any fixed leading args, e.g.
    /// `["sg-analyzer", "--model", "opus"]`.
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        let mut iter = command.into_iter();
        let program = iter.next().unwrap_or_else(|| "sg-analyzer".to_string());
        Self {
            program,
            args: iter.collect(),
            timeout,
        }
    }
}

#[async_trait]
impl AnalyzerProcessor for SubprocessAnalyzer {
    async fn analyze(&self, job: &Job) -> Result<AnalyzerOutput, WorkerError> {
        let descriptor = job_descriptor(job);
        let payload = serde_json::to_vec(&descriptor)
            .map_err(|e| WorkerError::AnalyzerFailed(format!("failed to encode job descriptor: {e}")))?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| WorkerError::AnalyzerFailed(format!("failed to spawn analyzer: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| WorkerError::AnalyzerFailed(format!("failed to write job descriptor: {e}")))?;
        }

        let started = std::time::Instant::now();
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(io_err)) => return Err(WorkerError::AnalyzerFailed(format!("analyzer subprocess failed: {io_err}"))),
            Err(_elapsed) => {
                return Err(WorkerError::AnalyzerFailed(format!(
                    "analyzer subprocess timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(AnalyzerOutput {
                success: false,
                node_data: None,
                duration_ms,
                error: Some(format!("analyzer exited with {}: {}", output.status, stderr.trim())),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = match last_assistant_message(&stdout) {
            Some(text) => text,
            None => {
                return Ok(AnalyzerOutput {
                    success: false,
                    node_data: None,
                    duration_ms,
                    error: Some("schema validation failed: no agent_end event with messages found".to_string()),
                });
            }
        };

        match sg_worker::json_extract::extract_node_json(&text) {
            Ok(node_data) => Ok(AnalyzerOutput {
                success: true,
                node_data: Some(node_data),
                duration_ms,
                error: None,
            }),
            Err(reason) => Ok(AnalyzerOutput {
                success: false,
                node_data: None,
                duration_ms,
                error: Some(format!("schema validation failed: {reason}")),
            }),
        }
    }
}

fn job_descriptor(job: &Job) -> Value {
    serde_json::json!({
        "jobId": job.id.as_str(),
        "jobType": job.job_type.to_string(),
        "sessionFile": job.session_file,
        "segment": job.segment,
        "context": job.context,
    })
}

/// Scan a JSON-Lines event stream for the last `agent_end` event and return
/// its last assistant message's text content.
fn last_assistant_message(stdout: &str) -> Option<String> {
    let mut last_text = None;
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(event) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if event.get("type").and_then(|t| t.as_str()) != Some("agent_end") {
            continue;
        }
        let Some(messages) = event.get("messages").and_then(|m| m.as_array()) else {
            continue;
        };
        for message in messages.iter().rev() {
            if message.get("role").and_then(|r| r.as_str()) != Some("assistant") {
                continue;
            }
            if let Some(text) = message.get("content").and_then(|c| c.as_str()) {
                last_text = Some(text.to_string());
                break;
            }
        }
    }
    last_text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_last_assistant_message_from_agent_end_event() {
        let stdout = concat!(
            "{\"type\":\"tool_use\",\"name\":\"bash\"}\n",
            "{\"type\":\"agent_end\",\"messages\":[",
            "{\"role\":\"user\",\"content\":\"go\"},",
            "{\"role\":\"assistant\",\"content\":\"```json\\n{}\\n```\"}",
            "]}\n",
        );
        assert_eq!(last_assistant_message(stdout), Some("```json\n{}\n```".to_string()));
    }

    #[test]
    fn missing_agent_end_event_yields_none() {
        let stdout = "{\"type\":\"tool_use\"}\n";
        assert_eq!(last_assistant_message(stdout), None);
    }
}
