use serde_json::Value;

/// Discriminant carried in a message's `messageType` field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum MessageKind {
    /// `InternalSearchQuery`
    SearchQuery,
    /// `InternalSearchResult`
    SearchResult,
    /// `InternalLoaderMessage`
    LoaderMessage,
    /// `GenerateContentQuery`
    GenerateContentQuery,
    /// Absent or empty discriminant: the main answer channel.
    Answer,
    /// Anything else the service may add later.
    Unrecognized(String),
}

impl MessageKind {
    fn from_discriminant(value: &str) -> Self {
        match value {
            "InternalSearchQuery" => Self::SearchQuery,
            "InternalSearchResult" => Self::SearchResult,
            "InternalLoaderMessage" => Self::LoaderMessage,
            "GenerateContentQuery" => Self::GenerateContentQuery,
            "" => Self::Answer,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

/// One message object taken from a protocol event.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ChatMessage {
    raw: Value,
}

impl ChatMessage {
    pub(crate) fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub(crate) fn kind(&self) -> MessageKind {
        MessageKind::from_discriminant(self.str_field("messageType").unwrap_or(""))
    }

    pub(crate) fn text(&self) -> Option<&str> {
        self.str_field("text")
    }

    pub(crate) fn hidden_text(&self) -> Option<&str> {
        self.str_field("hiddenText")
    }

    pub(crate) fn content_origin(&self) -> Option<&str> {
        self.str_field("contentOrigin")
    }

    pub(crate) fn content_type(&self) -> Option<&str> {
        self.str_field("contentType")
    }

    /// Text shown for a loader message: hidden text, then visible text, then
    /// the raw message JSON.
    pub(crate) fn loader_text(&self) -> String {
        if self.raw.get("hiddenText").is_some() {
            return self.hidden_text().unwrap_or_default().to_string();
        }
        if self.raw.get("text").is_some() {
            return self.text().unwrap_or_default().to_string();
        }
        self.raw.to_string()
    }

    /// Returns the suggested follow-ups when the message carries the field.
    pub(crate) fn suggested_responses(&self) -> Option<Vec<String>> {
        let items = self.raw.get("suggestedResponses")?;
        Some(
            items
                .as_array()
                .map(|entries| {
                    entries
                        .iter()
                        .map(|entry| {
                            entry
                                .get("text")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string()
                        })
                        .collect()
                })
                .unwrap_or_default(),
        )
    }

    pub(crate) fn raw(&self) -> &Value {
        &self.raw
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        self.raw.get(name).and_then(Value::as_str)
    }
}

/// A payload frame reduced to the shapes the interpreter acts on.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ProtocolEvent {
    /// `type: 1` update carrying `arguments[0].messages[0]`.
    Update { cursor: bool, message: ChatMessage },
    /// `type: 2` completion; only the last message is kept.
    Completion { message: ChatMessage },
    /// Pings, handshakes and other shapes.
    Ignored,
}

impl ProtocolEvent {
    pub(crate) fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(payload)?;
        Ok(Self::classify(value))
    }

    pub(crate) fn classify(mut value: Value) -> Self {
        match value.get("type").and_then(Value::as_i64) {
            Some(1) => {
                let cursor = value.pointer("/arguments/0/cursor").is_some();
                match value
                    .pointer_mut("/arguments/0/messages/0")
                    .map(Value::take)
                {
                    Some(message) => Self::Update {
                        cursor,
                        message: ChatMessage::new(message),
                    },
                    None => Self::Ignored,
                }
            }
            Some(2) => match value
                .pointer_mut("/item/messages")
                .and_then(Value::as_array_mut)
                .and_then(Vec::pop)
            {
                Some(message) => Self::Completion {
                    message: ChatMessage::new(message),
                },
                None => Self::Ignored,
            },
            _ => Self::Ignored,
        }
    }
}
