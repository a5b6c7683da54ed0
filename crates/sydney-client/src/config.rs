use crate::errors::ClientError;

const DEFAULT_TOKENIZER_MODEL: &str = "gpt-4";
const DEFAULT_REVOKE_REPLY_COUNT: u32 = 0;

/// Client behavior settings.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Text the UI re-sends after a revoked reply. Empty disables re-asking.
    pub revoke_reply_text: String,
    /// Maximum reply depth for which a revoked reply may still be re-asked.
    pub revoke_reply_count: u32,
    /// Model name used to select the tokenizer encoding.
    pub tokenizer_model: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            revoke_reply_text: String::new(),
            revoke_reply_count: DEFAULT_REVOKE_REPLY_COUNT,
            tokenizer_model: DEFAULT_TOKENIZER_MODEL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Builds a config from the environment.
    ///
    /// Reads `SYDNEY_REVOKE_REPLY_TEXT`, `SYDNEY_REVOKE_REPLY_COUNT` and
    /// `SYDNEY_TOKENIZER_MODEL`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Some(text) = lookup("SYDNEY_REVOKE_REPLY_TEXT") {
            config.revoke_reply_text = text;
        }
        if let Some(raw) = lookup("SYDNEY_REVOKE_REPLY_COUNT") {
            config.revoke_reply_count = raw.trim().parse().map_err(|e| {
                ClientError::Config(format!("invalid SYDNEY_REVOKE_REPLY_COUNT {raw:?}: {e}"))
            })?;
        }
        if let Some(model) = lookup("SYDNEY_TOKENIZER_MODEL").filter(|m| !m.trim().is_empty()) {
            config.tokenizer_model = model.trim().to_string();
        }
        Ok(config)
    }

    /// Sets the re-ask text.
    pub fn revoke_reply_text(mut self, text: impl Into<String>) -> Self {
        self.revoke_reply_text = text.into();
        self
    }

    /// Sets the re-ask budget.
    pub fn revoke_reply_count(mut self, count: u32) -> Self {
        self.revoke_reply_count = count;
        self
    }

    /// Sets the tokenizer model name.
    pub fn tokenizer_model(mut self, model: impl Into<String>) -> Self {
        self.tokenizer_model = model.into();
        self
    }

    /// Returns whether a revoked reply at `reply_deep` may still be re-asked.
    pub fn can_reask(&self, reply_deep: u32) -> bool {
        !self.revoke_reply_text.is_empty() && reply_deep < self.revoke_reply_count
    }
}
