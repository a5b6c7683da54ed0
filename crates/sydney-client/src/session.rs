use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument as _, debug};

use crate::cancel::{StopHandle, cancel_scope};
use crate::client::ChatClient;
use crate::errors::ClientError;
use crate::model::AskRequest;
use crate::notification::{EVENT_CHAT_STOP, NotificationSink};
use crate::observability::ask_span;
use crate::vendors::sydney::InterpreterOutcome;

struct ActiveAsk {
    generation: u64,
    handle: StopHandle,
    /// Closes when the ask's task has returned.
    done: watch::Receiver<()>,
}

#[derive(Default)]
struct ActiveSlot {
    next_generation: u64,
    current: Option<ActiveAsk>,
}

/// UI-facing context that owns the notification sink and the stop handle of
/// the ask currently streaming.
///
/// At most one ask is active per session. Starting a new one stops the
/// previous one, and the new ask does not open its conversation until the
/// previous ask has delivered its `Finish`.
#[derive(Clone)]
pub struct ChatSession {
    client: ChatClient,
    sink: Arc<dyn NotificationSink>,
    session_id: uuid::Uuid,
    active: Arc<Mutex<ActiveSlot>>,
}

impl ChatSession {
    pub(crate) fn new(client: ChatClient, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            client,
            sink,
            session_id: uuid::Uuid::new_v4(),
            active: Arc::new(Mutex::new(ActiveSlot::default())),
        }
    }

    /// Returns the id used to correlate this session's log lines.
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Spawns `request` as an independent task and makes it the active ask.
    pub fn ask(&self, request: AskRequest) -> JoinHandle<Result<InterpreterOutcome, ClientError>> {
        let (handle, signal) = cancel_scope();
        let (done_tx, done_rx) = watch::channel(());
        let (generation, replaced) = {
            let mut slot = self.lock_active();
            let generation = slot.next_generation;
            slot.next_generation += 1;
            let replaced = slot
                .current
                .replace(ActiveAsk {
                    generation,
                    handle,
                    done: done_rx,
                })
                .map(|previous| {
                    previous.handle.stop();
                    previous.done
                });
            (generation, replaced)
        };
        let span = ask_span(self.session_id, generation, &request);

        let client = self.client.clone();
        let sink = self.sink.clone();
        let active = self.active.clone();
        tokio::spawn(
            async move {
                let _done = done_tx;
                if let Some(mut previous) = replaced {
                    // Resolves once the replaced task drops its sender.
                    let _ = previous.changed().await;
                }
                debug!("ask started");
                let result = client.ask(request, sink, signal).await;
                let mut slot = active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if slot
                    .current
                    .as_ref()
                    .is_some_and(|current| current.generation == generation)
                {
                    slot.current = None;
                }
                debug!("ask ended");
                result
            }
            .instrument(span),
        )
    }

    /// Stops the active ask. Returns `true` if this call stopped something.
    pub fn stop(&self) -> bool {
        self.lock_active()
            .current
            .as_ref()
            .is_some_and(|current| current.handle.stop())
    }

    /// Returns whether an ask is currently streaming.
    pub fn is_active(&self) -> bool {
        self.lock_active().current.is_some()
    }

    /// Handles an inbound control event from the UI bus.
    ///
    /// Returns `false` for events this session does not know.
    pub fn handle_control(&self, event: &str) -> bool {
        match event {
            EVENT_CHAT_STOP => {
                self.stop();
                true
            }
            _ => false,
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, ActiveSlot> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
