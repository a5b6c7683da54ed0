//! Common imports for typical client usage.
pub use crate::{
    AskRequest, BackendKind, ChannelSink, ChatClient, ChatSession, ClientConfig, ClientError,
    ConversationTransport, FrameStream, Notification, NotificationSink, RawFrame, SourceError,
    StopHandle, cancel_scope,
};
