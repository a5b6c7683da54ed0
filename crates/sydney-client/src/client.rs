use std::sync::Arc;

use tracing::debug;

use crate::cancel::StopSignal;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::model::{AskRequest, BackendKind};
use crate::notification::{Notification, NotificationSink};
use crate::session::ChatSession;
use crate::source::ConversationTransport;
use crate::tokenizer::{TiktokenCounter, TokenCounter};
use crate::vendors::sydney::{InterpreterOutcome, InterpreterState, LoopExit, StreamInterpreter};

/// Alert text for backends that have no interpreter.
pub const NOT_IMPLEMENTED_ALERT: &str = "not implemented";

pub(crate) struct ClientInner {
    config: Arc<ClientConfig>,
    transport: Arc<dyn ConversationTransport>,
    counter: Arc<dyn TokenCounter>,
}

/// Entry point that routes asks to the interpreter for their backend.
#[derive(Clone)]
pub struct ChatClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl ChatClient {
    /// Starts a builder for wiring the transport, tokenizer and settings.
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder::default()
    }

    /// Returns the active settings.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Creates a session that delivers notifications to `sink`.
    pub fn session(&self, sink: Arc<dyn NotificationSink>) -> ChatSession {
        ChatSession::new(self.clone(), sink)
    }

    /// Runs one ask to completion.
    ///
    /// Routing uses only `request.kind`. Backends without an interpreter get a
    /// single `not implemented` alert and the transport is never opened.
    /// Otherwise the reply is streamed into `sink` and ends with exactly one
    /// `Finish`, including when the request is rejected or the open fails.
    pub async fn ask(
        &self,
        request: AskRequest,
        sink: Arc<dyn NotificationSink>,
        mut stop: StopSignal,
    ) -> Result<InterpreterOutcome, ClientError> {
        match request.kind {
            BackendKind::Sydney => {}
            other => {
                sink.emit(Notification::Alert(NOT_IMPLEMENTED_ALERT.to_string()));
                return Err(ClientError::Unsupported(other));
            }
        }
        if let Err(err) = request.validate() {
            sink.emit(Notification::Alert(err.to_string()));
            sink.emit(Notification::Finish);
            return Err(err);
        }

        debug!(
            backend = %request.kind,
            prompt_len = request.prompt.len(),
            context_len = request.chat_context.len(),
            has_image = request.image().is_some(),
            reply_deep = request.reply_deep,
            "opening conversation"
        );
        let opened = tokio::select! {
            biased;
            _ = stop.stopped() => None,
            opened = self.inner.transport.open(&request) => Some(opened),
        };
        let frames = match opened {
            Some(Ok(frames)) => frames,
            Some(Err(err)) => {
                sink.emit(Notification::Alert(err.to_string()));
                sink.emit(Notification::Finish);
                return Err(ClientError::Source(err));
            }
            None => {
                sink.emit(Notification::Finish);
                return Ok(InterpreterOutcome {
                    exit: LoopExit::Stopped,
                    state: InterpreterState::default(),
                });
            }
        };

        let interpreter = StreamInterpreter::new(
            request,
            self.inner.config.clone(),
            self.inner.counter.clone(),
            sink,
        );
        Ok(interpreter.run(frames, stop).await)
    }
}

/// Builder used to assemble a `ChatClient`.
#[derive(Default)]
pub struct ChatClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn ConversationTransport>>,
    counter: Option<Arc<dyn TokenCounter>>,
}

impl ChatClientBuilder {
    /// Sets the client settings.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the transport that opens conversations. Required.
    pub fn transport(mut self, transport: Arc<dyn ConversationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Overrides the tokenizer.
    ///
    /// Defaults to a tiktoken encoding for `config.tokenizer_model`.
    pub fn token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Builds the client, loading the default tokenizer if none was given.
    pub fn build(self) -> Result<ChatClient, ClientError> {
        let transport = self
            .transport
            .ok_or_else(|| ClientError::Config("a conversation transport is required".into()))?;
        let counter: Arc<dyn TokenCounter> = match self.counter {
            Some(counter) => counter,
            None => Arc::new(TiktokenCounter::for_model(&self.config.tokenizer_model)?),
        };
        Ok(ChatClient {
            inner: Arc::new(ClientInner {
                config: Arc::new(self.config),
                transport,
                counter,
            }),
        })
    }
}
