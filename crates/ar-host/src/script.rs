//! External command runner with an enforced timeout.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::HostError;

#[derive(Debug, Clone)]
pub struct ScriptRunner {
    timeout: Duration,
}

impl ScriptRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `program` and returns its stdout. The child is killed when the
    /// timeout elapses.
    pub async fn run(&self, program: &str, args: &[&str]) -> Result<String, HostError> {
        trace!("Running {} {:?}", program, args);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HostError::Spawn {
                command: program.to_string(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| HostError::Spawn {
                command: program.to_string(),
                source,
            })?,
            Err(_) => {
                debug!("{} timed out after {:?}", program, self.timeout);
                return Err(HostError::Timeout {
                    command: program.to_string(),
                    after_ms: self.timeout.as_millis(),
                });
            }
        };

        if !output.status.success() {
            return Err(HostError::Failed {
                command: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Runs an AppleScript through `osascript`, trimming the trailing newline.
    pub async fn osascript(&self, script: &str) -> Result<String, HostError> {
        let out = self.run("osascript", &["-e", script]).await?;
        Ok(out.trim_end_matches('\n').to_string())
    }
}
