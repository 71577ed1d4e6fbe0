use thiserror::Error;

/// Pipeline error taxonomy. Config errors are fatal before any stage runs,
/// input errors are scoped to one file, service errors are scoped to one
/// query or upload action and leave the session usable, internal errors are
/// invariant violations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("input error ({file}): {message}")]
    Input { file: String, message: String },

    #[error("{stage} service error (retryable: {retryable}): {message}")]
    Service {
        /// Pipeline stage that failed, e.g. "embed" or "generate".
        stage: &'static str,
        message: String,
        retryable: bool,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn input(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Input {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Wrap an adapter failure. Providers tag transient failures (timeouts,
    /// 429, 5xx) with a `[retryable]` marker in the message.
    pub fn service(stage: &'static str, err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        let retryable = message.contains("[retryable]");
        Self::Service {
            stage,
            message,
            retryable,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Service { retryable: true, .. })
    }
}
