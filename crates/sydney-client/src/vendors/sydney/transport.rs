use std::collections::VecDeque;
use std::fmt;

use futures::StreamExt as _;
use futures::stream;
use serde_json::Value;
use tracing::debug;

use crate::errors::SourceError;
use crate::source::{FrameStream, RawFrame};

/// Record separator terminating every JSON message on the wire.
pub const RECORD_SEPARATOR: u8 = 0x1e;

/// Splits the service's byte stream into JSON text records.
#[derive(Default)]
pub struct RecordDecoder {
    buf: Vec<u8>,
}

impl RecordDecoder {
    /// Feeds a chunk and returns every record it completes.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut records = Vec::new();
        while let Some(idx) = self.buf.iter().position(|b| *b == RECORD_SEPARATOR) {
            let record = String::from_utf8_lossy(&self.buf[..idx]).trim().to_string();
            self.buf.drain(..=idx);
            if !record.is_empty() {
                records.push(record);
            }
        }
        records
    }

    /// Returns whether a partial record is still buffered.
    pub fn has_pending(&self) -> bool {
        self.buf.iter().any(|b| !b.is_ascii_whitespace())
    }
}

enum RecordControl {
    Forward,
    Skip,
    Close(Option<SourceError>),
}

/// `type: 3` ends the invocation, optionally with an `error` reason.
/// `type: 6` is a keep-alive ping.
fn inspect_record(record: &str) -> RecordControl {
    let Ok(value) = serde_json::from_str::<Value>(record) else {
        return RecordControl::Forward;
    };
    match value.get("type").and_then(Value::as_i64) {
        Some(3) => RecordControl::Close(
            value
                .get("error")
                .and_then(Value::as_str)
                .map(SourceError::closed),
        ),
        Some(6) => RecordControl::Skip,
        _ => RecordControl::Forward,
    }
}

/// Adapts a raw byte stream from the service connection into a frame stream.
///
/// Read errors become a single `RawFrame::Error` and end the stream, as does
/// a close record carrying an error reason.
pub fn frames_from_bytes<S, B, E>(bytes: S) -> FrameStream
where
    S: futures::Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    struct State<S> {
        bytes: std::pin::Pin<Box<S>>,
        decoder: RecordDecoder,
        pending: VecDeque<RawFrame>,
        done: bool,
    }

    let state = State {
        bytes: Box::pin(bytes),
        decoder: RecordDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Some((frame, state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for record in state.decoder.push_chunk(chunk.as_ref()) {
                        match inspect_record(&record) {
                            RecordControl::Forward => {
                                state.pending.push_back(RawFrame::Payload(record))
                            }
                            RecordControl::Skip => {}
                            RecordControl::Close(error) => {
                                debug!(error = ?error, "service closed the invocation");
                                if let Some(error) = error {
                                    state.pending.push_back(RawFrame::Error(error));
                                }
                                state.done = true;
                                break;
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    state.pending.push_back(RawFrame::Error(SourceError::transport(format!(
                        "stream read failed: {e}"
                    ))));
                    state.done = true;
                }
                None => {
                    if state.decoder.has_pending() {
                        debug!("connection closed with a partial record buffered");
                    }
                    state.done = true;
                }
            }
        }
    }))
}
