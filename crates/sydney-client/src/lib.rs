//! Client-side interpreter for the Sydney token-streamed chat service.
//!
//! A request is routed by its backend selector, a conversation is opened
//! through a [`ConversationTransport`], and the resulting frame stream is
//! folded into UI [`Notification`]s: appended text, token counts, suggested
//! responses, alerts and a final `Finish`.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sydney_client::prelude::*;
//!
//! # struct MyTransport;
//! # #[async_trait::async_trait]
//! # impl ConversationTransport for MyTransport {
//! #     async fn open(&self, _r: &AskRequest) -> Result<FrameStream, SourceError> {
//! #         unimplemented!()
//! #     }
//! # }
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = ChatClient::builder()
//!     .config(ClientConfig::from_env()?)
//!     .transport(Arc::new(MyTransport))
//!     .build()?;
//!
//! let (sink, mut notifications) = ChannelSink::new();
//! let session = client.session(Arc::new(sink));
//! let _task = session.ask(AskRequest::new(BackendKind::Sydney, "hi"));
//!
//! while let Some(notification) = notifications.recv().await {
//!     if notification == Notification::Finish {
//!         break;
//!     }
//!     println!("{}: {:?}", notification.event_name(), notification.payload());
//! }
//! # Ok(())
//! # }
//! ```

/// Stop handles and signals for one ask.
pub mod cancel;
/// Request routing and client construction.
pub mod client;
/// Client settings.
pub mod config;
/// Public error types.
pub mod errors;
/// Request and backend identifiers.
pub mod model;
/// Notifications and sinks.
pub mod notification;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// UI session context and the `chat_stop` control.
pub mod session;
/// Raw frame sources.
pub mod source;
/// Token counting.
pub mod tokenizer;
/// Backend-specific protocol handling.
pub mod vendors;

pub use cancel::{StopHandle, StopSignal, cancel_scope};
pub use client::{ChatClient, ChatClientBuilder, NOT_IMPLEMENTED_ALERT};
pub use config::ClientConfig;
pub use errors::{ClientError, SourceError};
pub use model::{AskRequest, BackendKind};
pub use notification::{ChannelSink, Notification, NotificationSink};
pub use session::ChatSession;
pub use source::{ConversationTransport, FrameSender, FrameStream, RawFrame, frame_channel};
pub use tokenizer::{TiktokenCounter, TokenCounter};
