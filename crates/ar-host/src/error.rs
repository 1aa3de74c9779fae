use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("{command} timed out after {after_ms}ms")]
    Timeout { command: String, after_ms: u128 },

    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not available on this platform")]
    Unsupported(&'static str),
}
