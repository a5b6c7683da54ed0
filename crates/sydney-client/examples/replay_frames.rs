//! Replays a captured Sydney wire log through the interpreter.
//!
//! The capture is the raw socket text: JSON records separated by `0x1e`.
//!
//! ```text
//! cargo run -p sydney-client --example replay_frames -- capture.bin "what is rust"
//! ```
use std::sync::Arc;

use futures::stream;
use sydney_client::observability::init_observability;
use sydney_client::prelude::*;
use sydney_client::vendors::sydney::frames_from_bytes;

const CHUNK_SIZE: usize = 64;

struct CaptureTransport {
    bytes: bytes::Bytes,
}

#[async_trait::async_trait]
impl ConversationTransport for CaptureTransport {
    async fn open(&self, _request: &AskRequest) -> Result<FrameStream, SourceError> {
        let chunks: Vec<Result<bytes::Bytes, std::io::Error>> = (0..self.bytes.len())
            .step_by(CHUNK_SIZE)
            .map(|start| {
                let end = (start + CHUNK_SIZE).min(self.bytes.len());
                Ok(self.bytes.slice(start..end))
            })
            .collect();
        Ok(frames_from_bytes(stream::iter(chunks)))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_observability();

    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: replay_frames <capture> [prompt]")?;
    let prompt = args.next().unwrap_or_else(|| "replay".to_string());
    let bytes = bytes::Bytes::from(std::fs::read(&path)?);

    let client = ChatClient::builder()
        .config(ClientConfig::from_env()?)
        .transport(Arc::new(CaptureTransport { bytes }))
        .build()?;

    let (sink, mut notifications) = ChannelSink::new();
    let session = client.session(Arc::new(sink));
    let task = session.ask(AskRequest::new(BackendKind::Sydney, prompt));

    while let Some(notification) = notifications.recv().await {
        match &notification {
            Notification::AppendText(text) => print!("{text}"),
            Notification::Finish => {
                println!();
                break;
            }
            other => eprintln!("[{}] {:?}", other.event_name(), other.payload()),
        }
    }

    let outcome = task.await??;
    eprintln!("exit: {:?}", outcome.exit);
    Ok(())
}
