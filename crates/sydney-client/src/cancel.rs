use tokio::sync::watch;

/// Creates a fresh stop handle and the signal the interpreter waits on.
pub fn cancel_scope() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopSignal { rx })
}

/// Handle used to request that a running reply stops.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    /// Requests a stop.
    ///
    /// Idempotent. Returns `true` only for the call that flipped the state.
    pub fn stop(&self) -> bool {
        self.tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        })
    }

    /// Returns whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving side of a stop request.
#[derive(Clone, Debug)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// Returns whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once a stop is requested.
    ///
    /// Never resolves if every `StopHandle` is dropped without stopping.
    pub async fn stopped(&mut self) {
        let changed = self.rx.wait_for(|stopped| *stopped).await.map(|_| ());
        if changed.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
