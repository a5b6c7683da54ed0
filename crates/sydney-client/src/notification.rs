use tokio::sync::mpsc;

/// Event name for a user-visible alert.
pub const EVENT_CHAT_ALERT: &str = "chat_alert";
/// Event name for appended reply text.
pub const EVENT_CHAT_APPEND: &str = "chat_append";
/// Event name for the terminal notification of a request.
pub const EVENT_CHAT_FINISH: &str = "chat_finish";
/// Event name for suggested follow-up responses.
pub const EVENT_CHAT_SUGGESTED_RESPONSES: &str = "chat_suggested_responses";
/// Event name for the running token count.
pub const EVENT_CHAT_TOKEN: &str = "chat_token";
/// Inbound control event that stops the active request.
pub const EVENT_CHAT_STOP: &str = "chat_stop";

/// Notifications pushed to the UI while a reply streams in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// User-visible alert text.
    Alert(String),
    /// Text appended to the reply being rendered.
    AppendText(String),
    /// Last notification of every request.
    Finish,
    /// Suggested follow-up prompts, in service order.
    SuggestedResponses(Vec<String>),
    /// Token count of the running answer text.
    TokenCount(usize),
}

impl Notification {
    /// Returns the event-bus name of this notification.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Alert(_) => EVENT_CHAT_ALERT,
            Self::AppendText(_) => EVENT_CHAT_APPEND,
            Self::Finish => EVENT_CHAT_FINISH,
            Self::SuggestedResponses(_) => EVENT_CHAT_SUGGESTED_RESPONSES,
            Self::TokenCount(_) => EVENT_CHAT_TOKEN,
        }
    }

    /// Returns the event payload, or `None` for payload-less events.
    pub fn payload(&self) -> Option<serde_json::Value> {
        match self {
            Self::Alert(text) | Self::AppendText(text) => Some(serde_json::json!(text)),
            Self::Finish => None,
            Self::SuggestedResponses(items) => Some(serde_json::json!(items)),
            Self::TokenCount(count) => Some(serde_json::json!(count)),
        }
    }
}

/// Destination for notifications.
///
/// Delivery is fire-and-forget; implementations must preserve the order in
/// which a single producer calls `emit`.
pub trait NotificationSink: Send + Sync {
    /// Delivers one notification.
    fn emit(&self, notification: Notification);
}

/// Sink that forwards notifications into an unbounded channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    /// Creates a sink and the receiver the UI side drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn emit(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("notification receiver dropped");
        }
    }
}
