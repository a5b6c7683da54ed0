use std::pin::Pin;

use tokio::sync::mpsc;

use crate::errors::SourceError;
use crate::model::AskRequest;

/// One unit read from the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawFrame {
    /// JSON text of one protocol event.
    Payload(String),
    /// The source failed; no more frames follow.
    Error(SourceError),
}

/// Ordered, single-consumer stream of raw frames.
pub type FrameStream = Pin<Box<dyn futures::Stream<Item = RawFrame> + Send + 'static>>;

/// Contract implemented by whatever negotiates a conversation and connects to
/// the service.
///
/// The client only needs an ordered frame stream per request; handshake,
/// cookies and proxies are the transport's business.
#[async_trait::async_trait]
pub trait ConversationTransport: Send + Sync {
    /// Opens a conversation for `request` and returns its frame stream.
    async fn open(&self, request: &AskRequest) -> Result<FrameStream, SourceError>;
}

/// Producer half of an in-memory frame source.
#[derive(Clone, Debug)]
pub struct FrameSender {
    tx: mpsc::UnboundedSender<RawFrame>,
}

impl FrameSender {
    /// Queues a JSON payload. Returns `false` once the consumer is gone.
    pub fn payload(&self, json: impl Into<String>) -> bool {
        self.tx.send(RawFrame::Payload(json.into())).is_ok()
    }

    /// Queues a terminal error. Returns `false` once the consumer is gone.
    pub fn error(&self, err: SourceError) -> bool {
        self.tx.send(RawFrame::Error(err)).is_ok()
    }
}

/// Creates an in-memory frame source.
///
/// The stream ends once every `FrameSender` clone has been dropped.
pub fn frame_channel() -> (FrameSender, FrameStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let frame = rx.recv().await?;
        Some((frame, rx))
    });
    (FrameSender { tx }, Box::pin(stream))
}
