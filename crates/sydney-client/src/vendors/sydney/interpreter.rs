use std::sync::Arc;

use futures::StreamExt as _;
use tracing::{debug, warn};

use crate::cancel::StopSignal;
use crate::config::ClientConfig;
use crate::model::AskRequest;
use crate::notification::{Notification, NotificationSink};
use crate::source::{FrameStream, RawFrame};
use crate::tokenizer::TokenCounter;

use super::protocol::{ChatMessage, MessageKind, ProtocolEvent};
use super::render;

/// Alert shown when an answer that had started streaming is withdrawn.
pub const REVOKE_DETECTED_ALERT: &str = "Message revoke detected";
/// Alert shown when the service refuses the prompt.
pub const FILTER_TRIGGERED_ALERT: &str = "Looks like the user's message has triggered the Bing filter";

/// Per-request bookkeeping owned by one interpreter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterpreterState {
    /// Characters of the current answer segment already appended.
    pub emitted_chars: usize,
    /// Whether any answer text has been appended for this reply.
    pub has_committed_text: bool,
    /// Whether the service withdrew the reply.
    pub revoked: bool,
}

/// Why the interpreter loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// The frame source ended.
    SourceClosed,
    /// The source delivered an error frame.
    SourceFailed,
    /// The service withdrew the reply.
    Revoked,
    /// A stop was requested.
    Stopped,
}

/// Result of running one interpreter to completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterpreterOutcome {
    pub exit: LoopExit,
    pub state: InterpreterState,
}

enum Flow {
    Continue,
    Exit(LoopExit),
}

/// Turns Sydney protocol frames into UI notifications for one request.
pub struct StreamInterpreter {
    request: AskRequest,
    config: Arc<ClientConfig>,
    counter: Arc<dyn TokenCounter>,
    sink: Arc<dyn NotificationSink>,
    state: InterpreterState,
}

impl StreamInterpreter {
    pub fn new(
        request: AskRequest,
        config: Arc<ClientConfig>,
        counter: Arc<dyn TokenCounter>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            request,
            config,
            counter,
            sink,
            state: InterpreterState::default(),
        }
    }

    /// Consumes frames until the source ends, fails, the reply is revoked or
    /// `stop` fires. Always emits exactly one `Finish` on the way out.
    pub async fn run(mut self, mut frames: FrameStream, mut stop: StopSignal) -> InterpreterOutcome {
        let exit = self.drive(&mut frames, &mut stop).await;
        debug!(
            exit = ?exit,
            emitted_chars = self.state.emitted_chars,
            committed = self.state.has_committed_text,
            "interpreter loop finished"
        );
        self.sink.emit(Notification::Finish);
        InterpreterOutcome {
            exit,
            state: self.state,
        }
    }

    async fn drive(&mut self, frames: &mut FrameStream, stop: &mut StopSignal) -> LoopExit {
        loop {
            tokio::select! {
                biased;
                _ = stop.stopped() => return LoopExit::Stopped,
                next = frames.next() => {
                    let Some(frame) = next else {
                        return LoopExit::SourceClosed;
                    };
                    if let Flow::Exit(exit) = self.handle_frame(frame) {
                        return exit;
                    }
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: RawFrame) -> Flow {
        let payload = match frame {
            RawFrame::Payload(payload) => payload,
            RawFrame::Error(err) => {
                warn!(reason = err.message(), "source reported an error");
                self.sink.emit(Notification::Alert(err.to_string()));
                return Flow::Exit(LoopExit::SourceFailed);
            }
        };
        match ProtocolEvent::parse(&payload) {
            Ok(ProtocolEvent::Update { cursor, message }) => self.on_update(cursor, &message),
            Ok(ProtocolEvent::Completion { message }) => {
                self.send_suggested_responses(&message);
                Flow::Continue
            }
            Ok(ProtocolEvent::Ignored) => Flow::Continue,
            Err(e) => {
                warn!(error = %e, "skipping unparseable frame");
                Flow::Continue
            }
        }
    }

    fn on_update(&mut self, cursor: bool, message: &ChatMessage) -> Flow {
        let hidden = message.hidden_text().unwrap_or_default();
        match message.kind() {
            MessageKind::SearchQuery => self.append(render::search_query_block(hidden)),
            MessageKind::SearchResult => {
                if hidden.contains(render::NO_RESULT_MARKER) {
                    self.append(render::search_query_block(hidden));
                    return Flow::Continue;
                }
                let payload = message.text().unwrap_or_default();
                match render::search_results_block(payload) {
                    Ok(block) => self.append(block),
                    Err(e) => warn!(error = %e, payload, "invalid search result payload"),
                }
            }
            MessageKind::LoaderMessage => self.append(render::loading_block(&message.loader_text())),
            MessageKind::GenerateContentQuery => {
                if message.content_type() == Some("IMAGE") {
                    let keyword = message.text().unwrap_or_default();
                    self.append(render::generative_image_block(keyword));
                }
            }
            MessageKind::Answer => return self.on_answer(cursor, message),
            MessageKind::Unrecognized(kind) => {
                warn!(
                    kind = %kind,
                    prompt = %self.request.prompt,
                    message = %message.raw(),
                    "unsupported message type"
                );
            }
        }
        Flow::Continue
    }

    fn on_answer(&mut self, cursor: bool, message: &ChatMessage) -> Flow {
        if cursor {
            self.append(render::MESSAGE_BLOCK.to_string());
            self.state.emitted_chars = 0;
        }

        if message.content_origin() == Some("Apology") {
            self.state.revoked = true;
            let alert = if self.state.has_committed_text
                && self.config.can_reask(self.request.reply_deep)
            {
                REVOKE_DETECTED_ALERT
            } else {
                FILTER_TRIGGERED_ALERT
            };
            debug!(
                committed = self.state.has_committed_text,
                reply_deep = self.request.reply_deep,
                "reply revoked"
            );
            self.sink.emit(Notification::Alert(alert.to_string()));
            return Flow::Exit(LoopExit::Revoked);
        }

        let full = message.text().unwrap_or_default();
        let total_chars = full.chars().count();
        let delta: String = full.chars().skip(self.state.emitted_chars).collect();
        self.append(delta);
        self.state.emitted_chars = self.state.emitted_chars.max(total_chars);
        self.state.has_committed_text = true;
        self.sink.emit(Notification::TokenCount(self.counter.count(full)));
        self.send_suggested_responses(message);
        Flow::Continue
    }

    fn send_suggested_responses(&self, message: &ChatMessage) {
        if let Some(responses) = message.suggested_responses() {
            self.sink.emit(Notification::SuggestedResponses(responses));
        }
    }

    fn append(&self, text: String) {
        self.sink.emit(Notification::AppendText(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_scope;
    use crate::client::tests::{RecordingSink, WordCounter};
    use crate::errors::SourceError;
    use crate::notification::ChannelSink;
    use crate::source::frame_channel;
    use futures::stream;
    use serde_json::json;
    use std::time::Duration;

    fn answer(text: &str) -> String {
        json!({"type": 1, "arguments": [{"messages": [{"messageType": "", "text": text}]}]})
            .to_string()
    }

    fn answer_with_cursor(text: &str) -> String {
        json!({"type": 1, "arguments": [{"cursor": true, "messages": [{"messageType": "", "text": text}]}]})
            .to_string()
    }

    fn apology() -> String {
        json!({"type": 1, "arguments": [{"messages": [{"text": "Sorry", "contentOrigin": "Apology"}]}]})
            .to_string()
    }

    fn message(body: serde_json::Value) -> String {
        json!({"type": 1, "arguments": [{"messages": [body]}]}).to_string()
    }

    fn interpreter(
        request: AskRequest,
        config: ClientConfig,
    ) -> (StreamInterpreter, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let interpreter = StreamInterpreter::new(
            request,
            Arc::new(config),
            Arc::new(WordCounter),
            sink.clone(),
        );
        (interpreter, sink)
    }

    async fn run_frames(
        request: AskRequest,
        config: ClientConfig,
        frames: Vec<RawFrame>,
    ) -> (InterpreterOutcome, Vec<Notification>) {
        let (interpreter, sink) = interpreter(request, config);
        let (_handle, signal) = cancel_scope();
        let outcome = interpreter
            .run(Box::pin(stream::iter(frames)), signal)
            .await;
        (outcome, sink.events())
    }

    async fn run_payloads(payloads: Vec<String>) -> (InterpreterOutcome, Vec<Notification>) {
        run_frames(
            AskRequest::new(crate::BackendKind::Sydney, "hi"),
            ClientConfig::default(),
            payloads.into_iter().map(RawFrame::Payload).collect(),
        )
        .await
    }

    fn finish_count(events: &[Notification]) -> usize {
        events.iter().filter(|e| **e == Notification::Finish).count()
    }

    fn alerts(events: &[Notification]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                Notification::Alert(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn hello_there_scenario() {
        let (outcome, events) =
            run_payloads(vec![answer_with_cursor("Hello"), answer("Hello there")]).await;
        assert_eq!(
            events,
            vec![
                Notification::AppendText(render::MESSAGE_BLOCK.into()),
                Notification::AppendText("Hello".into()),
                Notification::TokenCount(1),
                Notification::AppendText(" there".into()),
                Notification::TokenCount(2),
                Notification::Finish,
            ]
        );
        assert_eq!(outcome.exit, LoopExit::SourceClosed);
        assert_eq!(outcome.state.emitted_chars, 11);
        assert!(outcome.state.has_committed_text);
    }

    #[tokio::test]
    async fn deltas_have_no_gap_or_duplication() {
        let (_, events) = run_payloads(vec![
            answer("Ru"),
            answer("Rust "),
            answer("Rust is"),
            answer("Rust is fast"),
        ])
        .await;
        let appended: String = events
            .iter()
            .filter_map(|e| match e {
                Notification::AppendText(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(appended, "Rust is fast");
    }

    #[tokio::test]
    async fn deltas_respect_multibyte_characters() {
        let (_, events) = run_payloads(vec![answer("héllo"), answer("héllo wörld")]).await;
        assert!(events.contains(&Notification::AppendText(" wörld".into())));
    }

    #[tokio::test]
    async fn cursor_resets_watermark_for_new_segment() {
        let (_, events) = run_payloads(vec![
            answer("First segment"),
            answer_with_cursor("Second"),
        ])
        .await;
        assert_eq!(
            &events[2..5],
            &[
                Notification::AppendText(render::MESSAGE_BLOCK.into()),
                Notification::AppendText("Second".into()),
                Notification::TokenCount(1),
            ]
        );
    }

    #[tokio::test]
    async fn token_count_covers_full_running_text() {
        let (_, events) = run_payloads(vec![answer("one two"), answer("one two three")]).await;
        let counts: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                Notification::TokenCount(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(counts, vec![2, 3]);
    }

    async fn revoke_alert(committed: bool, config: ClientConfig, reply_deep: u32) -> Vec<Notification> {
        let mut payloads = Vec::new();
        if committed {
            payloads.push(RawFrame::Payload(answer("Partial answer")));
        }
        payloads.push(RawFrame::Payload(apology()));
        payloads.push(RawFrame::Payload(answer("Partial answer that never shows")));
        let request = AskRequest::new(crate::BackendKind::Sydney, "hi").reply_deep(reply_deep);
        let (outcome, events) = run_frames(request, config, payloads).await;
        assert_eq!(outcome.exit, LoopExit::Revoked);
        assert!(outcome.state.revoked);
        events
    }

    #[tokio::test]
    async fn revocation_alert_matrix() {
        let budget = ClientConfig::default()
            .revoke_reply_text("Continue")
            .revoke_reply_count(2);
        let exhausted = budget.clone();

        let events = revoke_alert(true, budget.clone(), 0).await;
        assert_eq!(alerts(&events), vec![REVOKE_DETECTED_ALERT.to_string()]);

        let events = revoke_alert(true, exhausted, 2).await;
        assert_eq!(alerts(&events), vec![FILTER_TRIGGERED_ALERT.to_string()]);

        let events = revoke_alert(false, budget.clone(), 0).await;
        assert_eq!(alerts(&events), vec![FILTER_TRIGGERED_ALERT.to_string()]);

        let events = revoke_alert(false, budget, 5).await;
        assert_eq!(alerts(&events), vec![FILTER_TRIGGERED_ALERT.to_string()]);

        let events = revoke_alert(true, ClientConfig::default(), 0).await;
        assert_eq!(alerts(&events), vec![FILTER_TRIGGERED_ALERT.to_string()]);
    }

    #[tokio::test]
    async fn revocation_stops_processing_later_frames() {
        let events = revoke_alert(true, ClientConfig::default(), 0).await;
        assert_eq!(
            events,
            vec![
                Notification::AppendText("Partial answer".into()),
                Notification::TokenCount(2),
                Notification::Alert(FILTER_TRIGGERED_ALERT.into()),
                Notification::Finish,
            ]
        );
    }

    #[tokio::test]
    async fn error_frame_alerts_then_finishes() {
        let (outcome, events) = run_frames(
            AskRequest::new(crate::BackendKind::Sydney, "hi"),
            ClientConfig::default(),
            vec![
                RawFrame::Error(SourceError::transport("socket closed")),
                RawFrame::Payload(answer("never")),
            ],
        )
        .await;
        assert_eq!(outcome.exit, LoopExit::SourceFailed);
        assert_eq!(
            events,
            vec![
                Notification::Alert("transport error: socket closed".into()),
                Notification::Finish,
            ]
        );
    }

    #[tokio::test]
    async fn search_results_number_per_group() {
        let results = json!([
            [{"title": "a", "url": "u1"}, {"title": "b", "url": "u2"}],
            [{"title": "c", "url": "u3"}, {"title": "d", "url": "u4"}, {"title": "e", "url": "u5"}]
        ])
        .to_string();
        let (_, events) = run_payloads(vec![message(json!({
            "messageType": "InternalSearchResult",
            "hiddenText": "```json\n{}```",
            "text": results
        }))])
        .await;
        let Notification::AppendText(block) = &events[0] else {
            panic!("expected search results block");
        };
        let numbers: Vec<&str> = block
            .split("[^")
            .skip(1)
            .map(|s| s.split('^').next().unwrap_or_default())
            .collect();
        assert_eq!(numbers, vec!["1", "2", "1", "2", "3"]);
    }

    #[tokio::test]
    async fn malformed_search_results_are_skipped() {
        let (outcome, events) = run_payloads(vec![
            answer("before"),
            message(json!({"messageType": "InternalSearchResult", "text": "[[{oops"})),
            answer("before after"),
        ])
        .await;
        assert_eq!(outcome.exit, LoopExit::SourceClosed);
        assert_eq!(
            events,
            vec![
                Notification::AppendText("before".into()),
                Notification::TokenCount(1),
                Notification::AppendText(" after".into()),
                Notification::TokenCount(2),
                Notification::Finish,
            ]
        );
    }

    #[tokio::test]
    async fn empty_search_renders_query_block() {
        let hidden = "Web search returned no relevant result";
        let (_, events) = run_payloads(vec![message(json!({
            "messageType": "InternalSearchResult",
            "hiddenText": hidden,
            "text": "not json"
        }))])
        .await;
        assert_eq!(
            events[0],
            Notification::AppendText(render::search_query_block(hidden))
        );
    }

    #[tokio::test]
    async fn side_channel_blocks() {
        let (_, events) = run_payloads(vec![
            message(json!({"messageType": "InternalSearchQuery", "hiddenText": "rust async"})),
            message(json!({"messageType": "InternalLoaderMessage", "text": "Searching the web"})),
            message(json!({"messageType": "GenerateContentQuery", "contentType": "IMAGE", "text": "a red fox"})),
            message(json!({"messageType": "GenerateContentQuery", "contentType": "TEXT", "text": "ignored"})),
        ])
        .await;
        assert_eq!(
            events,
            vec![
                Notification::AppendText(render::search_query_block("rust async")),
                Notification::AppendText(render::loading_block("Searching the web")),
                Notification::AppendText(render::generative_image_block("a red fox")),
                Notification::Finish,
            ]
        );
    }

    #[tokio::test]
    async fn unknown_discriminant_and_garbage_frames_are_non_fatal() {
        let (outcome, events) = run_payloads(vec![
            message(json!({"messageType": "Disengaged", "text": "x"})),
            "not json at all".to_string(),
            json!({"type": 6}).to_string(),
            answer("still here"),
        ])
        .await;
        assert_eq!(outcome.exit, LoopExit::SourceClosed);
        assert_eq!(
            events,
            vec![
                Notification::AppendText("still here".into()),
                Notification::TokenCount(2),
                Notification::Finish,
            ]
        );
    }

    #[tokio::test]
    async fn suggested_responses_from_updates_and_completion() {
        let update = message(json!({
            "text": "Done",
            "suggestedResponses": [{"text": "Tell me more"}]
        }));
        let completion = json!({
            "type": 2,
            "item": {"messages": [
                {"text": "hi", "author": "user"},
                {"text": "Done", "suggestedResponses": [{"text": "Why?"}, {"text": "How?"}]}
            ]}
        })
        .to_string();
        let (_, events) = run_payloads(vec![update, completion]).await;
        assert_eq!(
            events,
            vec![
                Notification::AppendText("Done".into()),
                Notification::TokenCount(1),
                Notification::SuggestedResponses(vec!["Tell me more".into()]),
                Notification::SuggestedResponses(vec!["Why?".into(), "How?".into()]),
                Notification::Finish,
            ]
        );
    }

    #[tokio::test]
    async fn stop_mid_stream_finishes_without_alert() {
        let (interpreter, sink) = interpreter(
            AskRequest::new(crate::BackendKind::Sydney, "hi"),
            ClientConfig::default(),
        );
        let (handle, signal) = cancel_scope();
        let (tx, frames) = frame_channel();
        let task = tokio::spawn(interpreter.run(frames, signal));

        tx.payload(answer("one"));
        tx.payload(answer("one two"));
        for _ in 0..100 {
            if sink.events().len() >= 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.stop();
        let outcome = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("loop exits after stop")
            .expect("join");
        tx.payload(answer("one two three"));

        let events = sink.events();
        assert_eq!(outcome.exit, LoopExit::Stopped);
        assert!(alerts(&events).is_empty());
        assert_eq!(finish_count(&events), 1);
        assert!(!events.contains(&Notification::AppendText(" three".into())));
        assert_eq!(events.len(), 5);
    }

    #[tokio::test]
    async fn stop_wins_over_ready_frame() {
        let (interpreter, sink) = interpreter(
            AskRequest::new(crate::BackendKind::Sydney, "hi"),
            ClientConfig::default(),
        );
        let (handle, signal) = cancel_scope();
        handle.stop();
        let outcome = interpreter
            .run(Box::pin(stream::iter(vec![RawFrame::Payload(answer("ready"))])), signal)
            .await;
        assert_eq!(outcome.exit, LoopExit::Stopped);
        assert_eq!(sink.events(), vec![Notification::Finish]);
    }

    #[tokio::test]
    async fn every_exit_path_finishes_once() {
        let cases: Vec<Vec<RawFrame>> = vec![
            vec![],
            vec![RawFrame::Payload(answer("a"))],
            vec![RawFrame::Error(SourceError::protocol("bad"))],
            vec![RawFrame::Payload(apology())],
            vec![RawFrame::Payload("{".into())],
        ];
        for frames in cases {
            let (_, events) = run_frames(
                AskRequest::new(crate::BackendKind::Sydney, "hi"),
                ClientConfig::default(),
                frames,
            )
            .await;
            assert_eq!(finish_count(&events), 1);
            assert_eq!(events.last(), Some(&Notification::Finish));
        }
    }

    #[tokio::test]
    async fn works_with_channel_sink() {
        let (sink, mut rx) = ChannelSink::new();
        let interpreter = StreamInterpreter::new(
            AskRequest::new(crate::BackendKind::Sydney, "hi"),
            Arc::new(ClientConfig::default()),
            Arc::new(WordCounter),
            Arc::new(sink),
        );
        let (_handle, signal) = cancel_scope();
        interpreter
            .run(Box::pin(stream::iter(vec![RawFrame::Payload(answer("x"))])), signal)
            .await;
        assert_eq!(rx.recv().await, Some(Notification::AppendText("x".into())));
        assert_eq!(rx.recv().await, Some(Notification::TokenCount(1)));
        assert_eq!(rx.recv().await, Some(Notification::Finish));
    }
}
