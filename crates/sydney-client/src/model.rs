use std::fmt;

use crate::errors::ClientError;

/// Backend selected by a request's `type` field.
///
/// Serialized as the integer codes used on the wire (`1` Sydney, `2` OpenAI).
/// Any other code is kept as `Unknown` so dispatch can reject it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum BackendKind {
    /// The Sydney chat service.
    Sydney,
    /// OpenAI chat completions. Declared but not implemented.
    OpenAi,
    /// A selector code this build does not know.
    Unknown(i64),
}

impl BackendKind {
    /// Returns the wire code for this backend.
    pub fn code(self) -> i64 {
        match self {
            Self::Sydney => 1,
            Self::OpenAi => 2,
            Self::Unknown(code) => code,
        }
    }
}

impl From<i64> for BackendKind {
    fn from(value: i64) -> Self {
        match value {
            1 => Self::Sydney,
            2 => Self::OpenAi,
            other => Self::Unknown(other),
        }
    }
}

impl From<BackendKind> for i64 {
    fn from(value: BackendKind) -> Self {
        value.code()
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sydney => f.write_str("sydney"),
            Self::OpenAi => f.write_str("openai"),
            Self::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

/// A single ask submitted by the UI.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AskRequest {
    /// Backend that should answer this request.
    #[serde(rename = "type")]
    pub kind: BackendKind,
    /// Prior chat context sent ahead of the prompt. May be empty.
    #[serde(rename = "chatContext", default)]
    pub chat_context: String,
    /// User prompt.
    pub prompt: String,
    /// Optional uploaded image reference.
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
    /// How many times this conversation has already been re-asked after a
    /// revocation.
    #[serde(rename = "reply_deep", default)]
    pub reply_deep: u32,
}

impl AskRequest {
    /// Creates a request for the given backend and prompt with no context.
    pub fn new(kind: BackendKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            chat_context: String::new(),
            prompt: prompt.into(),
            image_url: String::new(),
            reply_deep: 0,
        }
    }

    /// Sets the preceding chat context.
    pub fn chat_context(mut self, context: impl Into<String>) -> Self {
        self.chat_context = context.into();
        self
    }

    /// Sets the image reference.
    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = url.into();
        self
    }

    /// Sets the reply depth counter.
    pub fn reply_deep(mut self, depth: u32) -> Self {
        self.reply_deep = depth;
        self
    }

    /// Returns the image reference, if one was attached.
    pub fn image(&self) -> Option<&str> {
        Some(self.image_url.trim()).filter(|url| !url.is_empty())
    }

    /// Checks that the request is well formed before dispatch.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.prompt.trim().is_empty() {
            return Err(ClientError::Validation("prompt must not be empty".into()));
        }
        Ok(())
    }
}
