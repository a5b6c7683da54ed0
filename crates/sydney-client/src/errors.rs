use crate::model::BackendKind;

/// Frame-level failures reported by a raw event source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Connection or stream I/O failed.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The service sent something the framing layer could not accept.
    #[error("protocol error: {message}")]
    Protocol { message: String },
    /// The service closed the conversation with an explicit reason.
    #[error("conversation closed: {reason}")]
    Closed { reason: String },
}

impl SourceError {
    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a close error carrying the service-provided reason.
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::Closed {
            reason: reason.into(),
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message } | Self::Protocol { message } => message,
            Self::Closed { reason } => reason,
        }
    }
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid request handed to the dispatcher.
    #[error("validation error: {0}")]
    Validation(String),
    /// The requested backend has no interpreter.
    #[error("backend not supported: {0}")]
    Unsupported(BackendKind),
    /// The tokenizer model could not be loaded.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    /// The raw event source could not be opened.
    #[error(transparent)]
    Source(#[from] SourceError),
}
