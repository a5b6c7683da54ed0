//! Sydney event-stream interpretation.
//!
//! The service multiplexes answer text, search activity, loader status, image
//! intents and suggestions over one ordered sequence of JSON records. This
//! module frames those records off the wire and folds them into
//! [`Notification`](crate::Notification)s.
mod interpreter;
mod protocol;
mod render;
mod transport;

pub use interpreter::{
    FILTER_TRIGGERED_ALERT, InterpreterOutcome, InterpreterState, LoopExit,
    REVOKE_DETECTED_ALERT, StreamInterpreter,
};
pub use transport::{RECORD_SEPARATOR, RecordDecoder, frames_from_bytes};
