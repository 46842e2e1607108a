//! Conversation engine: one exchange from user message to persisted reply.
//!
//! `converse` validates the message, loads and truncates history, builds the
//! backend context and hands back a [`FragmentStream`]. The backend is driven
//! by a background producer task, so a caller that stops reading does not
//! abort generation; only [`FragmentStream::cancel`] does.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use chatgate_observe::genai_attrs::{
    GEN_AI_OPERATION_NAME, GEN_AI_PROVIDER_NAME, GEN_AI_REQUEST_MAX_TOKENS, GEN_AI_REQUEST_MODEL,
    GEN_AI_REQUEST_TEMPERATURE, OP_CHAT,
};
use chatgate_types::chat::{NewTurn, Turn};
use chatgate_types::config::GatewayConfig;
use chatgate_types::llm::{CompletionRequest, Message, StreamEvent};

use super::error::ConversationError;
use crate::history::HistoryRepository;
use crate::llm::box_provider::BoxLlmProvider;
use crate::session::registry::short_id;

/// Engine settings derived from the gateway configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub max_history_turns: usize,
    pub max_message_length: usize,
}

impl From<&GatewayConfig> for EngineConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_history_turns: config.max_history_turns,
            max_message_length: config.max_message_length,
        }
    }
}

/// Check a user message and return it trimmed.
pub fn validate_message(message: &str, max_length: usize) -> Result<&str, ConversationError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ConversationError::InvalidInput(
            "message must not be empty".to_string(),
        ));
    }
    let length = trimmed.chars().count();
    if length > max_length {
        return Err(ConversationError::InvalidInput(format!(
            "message is {length} characters, the maximum is {max_length}"
        )));
    }
    Ok(trimmed)
}

/// Keep the most recent `max_turns` turns, oldest first.
pub fn truncate_history(mut turns: Vec<Turn>, max_turns: usize) -> Vec<Turn> {
    if turns.len() > max_turns {
        let dropped = turns.len() - max_turns;
        warn!(
            total = turns.len(),
            kept = max_turns,
            dropped,
            "history exceeds max turns, truncating context"
        );
        turns.drain(..dropped);
    }
    turns
}

/// A stream of reply fragments fed by the producer task.
///
/// Dropping the stream only stops consumption: the producer keeps draining
/// the backend and persists the exchange. Call [`cancel`](Self::cancel) to
/// stop production; a cancelled exchange is never persisted.
pub struct FragmentStream {
    inner: ReceiverStream<Result<String, ConversationError>>,
    cancel: CancellationToken,
}

impl FragmentStream {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Stream for FragmentStream {
    type Item = Result<String, ConversationError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Runs conversational exchanges against a backend and a history store.
pub struct ConversationEngine<R: HistoryRepository> {
    history: Arc<R>,
    provider: Arc<BoxLlmProvider>,
    config: EngineConfig,
}

impl<R: HistoryRepository + 'static> ConversationEngine<R> {
    pub fn new(history: Arc<R>, provider: Arc<BoxLlmProvider>, config: EngineConfig) -> Self {
        Self {
            history,
            provider,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the backend request: system instruction, history, new message.
    pub fn build_request(&self, history: &[Turn], user_message: &str) -> CompletionRequest {
        let mut messages: Vec<Message> = history.iter().map(Turn::to_message).collect();
        messages.push(Message::user(user_message));

        CompletionRequest {
            model: self.config.model.clone(),
            messages,
            system: Some(self.config.system_prompt.clone()),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            stream: true,
        }
    }

    /// Start one exchange and return its fragment stream.
    ///
    /// Validation and history loading happen before this returns. Backend
    /// failures arrive as the stream's terminal item.
    pub async fn converse(
        &self,
        session_id: &str,
        user_message: &str,
    ) -> Result<FragmentStream, ConversationError> {
        let user_message = validate_message(user_message, self.config.max_message_length)?;
        if session_id.trim().is_empty() {
            return Err(ConversationError::InvalidInput(
                "a session id is required".to_string(),
            ));
        }

        let history = self.history.load(session_id).await?;
        let history = truncate_history(history, self.config.max_history_turns);
        let request = self.build_request(&history, user_message);

        info!(
            session = short_id(session_id),
            history_turns = history.len(),
            "processing message"
        );

        let span = info_span!(
            "chat",
            otel.name = %format!("{OP_CHAT} {}", self.config.model),
            { GEN_AI_OPERATION_NAME } = OP_CHAT,
            { GEN_AI_PROVIDER_NAME } = self.provider.name(),
            { GEN_AI_REQUEST_MODEL } = %self.config.model,
            { GEN_AI_REQUEST_MAX_TOKENS } = self.config.max_tokens,
            { GEN_AI_REQUEST_TEMPERATURE } = self.config.temperature,
            session = short_id(session_id),
        );

        // Capacity 1: the producer stays at most one fragment ahead of the reader.
        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let producer = Producer {
            history: self.history.clone(),
            provider: self.provider.clone(),
            session_id: session_id.to_string(),
            user_message: user_message.to_string(),
            cancel: cancel.clone(),
            tx,
        };
        tokio::spawn(producer.run(request).instrument(span));

        Ok(FragmentStream {
            inner: ReceiverStream::new(rx),
            cancel,
        })
    }
}

struct Producer<R> {
    history: Arc<R>,
    provider: Arc<BoxLlmProvider>,
    session_id: String,
    user_message: String,
    cancel: CancellationToken,
    tx: mpsc::Sender<Result<String, ConversationError>>,
}

impl<R: HistoryRepository> Producer<R> {
    async fn run(self, request: CompletionRequest) {
        let mut events = self.provider.stream(request);
        let mut reply = String::new();
        let mut reader_gone = false;

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(fragments_len = reply.len(), "exchange cancelled, not persisting");
                    return;
                }
                event = events.next() => event,
            };

            match event {
                Some(Ok(StreamEvent::TextDelta { text })) => {
                    if text.is_empty() {
                        continue;
                    }
                    reply.push_str(&text);
                    if reader_gone {
                        continue;
                    }
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            debug!("exchange cancelled, not persisting");
                            return;
                        }
                        sent = self.tx.send(Ok(text)) => {
                            if sent.is_err() {
                                debug!("reader dropped the stream, draining backend");
                                reader_gone = true;
                            }
                        }
                    }
                }
                Some(Ok(StreamEvent::Done)) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let err = ConversationError::from_backend(&e, &reply);
                    warn!(error = %e, partial_len = reply.len(), "backend stream failed");
                    let _ = self.tx.send(Err(err)).await;
                    return;
                }
            }
        }

        if self.cancel.is_cancelled() {
            return;
        }

        let exchange = [
            NewTurn::user(self.user_message.as_str()),
            NewTurn::assistant(reply.as_str()),
        ];
        // The sender is still alive here, so the reader sees end-of-stream
        // only after the exchange is stored.
        match self.history.append_all(&self.session_id, &exchange).await {
            Ok(turns) => debug!(
                session = short_id(&self.session_id),
                sequence = turns.last().map(|t| t.sequence),
                reply_len = reply.len(),
                "exchange persisted"
            ),
            Err(e) => warn!(
                session = short_id(&self.session_id),
                error = %e,
                "failed to persist exchange, reply already delivered"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryHistory, MockProvider, Script};
    use chatgate_types::llm::MessageRole;
    use std::time::Duration;

    fn engine(provider: MockProvider, history: Arc<MemoryHistory>) -> ConversationEngine<MemoryHistory> {
        engine_with(provider, history, 50)
    }

    fn engine_with(
        provider: MockProvider,
        history: Arc<MemoryHistory>,
        max_history_turns: usize,
    ) -> ConversationEngine<MemoryHistory> {
        let config = EngineConfig {
            max_history_turns,
            ..EngineConfig::from(&GatewayConfig::default())
        };
        ConversationEngine::new(history, Arc::new(BoxLlmProvider::new(provider)), config)
    }

    async fn wait_for_turns(history: &MemoryHistory, session: &str, expected: u64) {
        for _ in 0..200 {
            if history.count_turns(session).await.unwrap() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {expected} turns for {session}");
    }

    #[test]
    fn test_validate_message() {
        assert!(validate_message("   ", 100).is_err());
        assert!(validate_message("", 100).is_err());
        assert_eq!(validate_message("  hello ", 100).unwrap(), "hello");
        assert!(validate_message("0123456789a", 10).is_err());
        // Characters, not bytes.
        assert!(validate_message("ñññññññññ", 10).is_ok());
    }

    #[test]
    fn test_truncate_keeps_most_recent() {
        let turns: Vec<Turn> = (1..=5)
            .map(|seq| Turn {
                session_id: "s1".into(),
                role: MessageRole::User,
                content: format!("m{seq}"),
                sequence: seq,
                created_at: chrono::Utc::now(),
            })
            .collect();

        let kept = truncate_history(turns.clone(), 3);
        let seqs: Vec<u64> = kept.iter().map(|t| t.sequence).collect();
        assert_eq!(seqs, vec![3, 4, 5]);

        assert_eq!(truncate_history(turns, 10).len(), 5);
    }

    #[tokio::test]
    async fn test_converse_streams_and_persists() {
        let history = Arc::new(MemoryHistory::default());
        let engine = engine(MockProvider::replying(&["Hi", " there"]), history.clone());

        let stream = engine.converse("s1", "hello").await.unwrap();
        let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
        assert_eq!(fragments, vec!["Hi", " there"]);

        let turns = history.load("s1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, MessageRole::User);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(turns[1].role, MessageRole::Assistant);
        assert_eq!(turns[1].content, "Hi there");
        assert_eq!(turns[1].sequence, turns[0].sequence + 1);
    }

    #[tokio::test]
    async fn test_context_includes_system_history_and_message() {
        let history = Arc::new(MemoryHistory::default());
        let provider = MockProvider::replying(&["ok"]);
        let requests = provider.requests();
        let engine = engine(provider, history.clone());

        history
            .append_all("s1", &[NewTurn::user("first"), NewTurn::assistant("reply")])
            .await
            .unwrap();

        let stream = engine.converse("s1", "second").await.unwrap();
        let _: Vec<_> = stream.collect().await;

        let requests = requests.lock().unwrap();
        let request = &requests[0];
        assert!(request.system.is_some());
        let contents: Vec<&str> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "reply", "second"]);
        assert_eq!(request.messages[2].role, MessageRole::User);
        assert!(request.stream);
    }

    #[tokio::test]
    async fn test_context_truncated_but_store_complete() {
        let history = Arc::new(MemoryHistory::default());
        let provider = MockProvider::replying(&["ok"]);
        let requests = provider.requests();
        let engine = engine_with(provider, history.clone(), 2);

        for i in 0..4 {
            history
                .append("s1", &NewTurn::user(format!("m{i}")))
                .await
                .unwrap();
        }

        let stream = engine.converse("s1", "latest").await.unwrap();
        let _: Vec<_> = stream.collect().await;

        let requests = requests.lock().unwrap();
        let contents: Vec<&str> = requests[0]
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["m2", "m3", "latest"]);
        assert_eq!(history.count_turns("s1").await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_backend() {
        let history = Arc::new(MemoryHistory::default());
        let provider = MockProvider::replying(&["x"]);
        let calls = provider.calls();
        let engine = engine(provider, history.clone());

        assert!(matches!(
            engine.converse("s1", "   ").await,
            Err(ConversationError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.converse("", "hello").await,
            Err(ConversationError::InvalidInput(_))
        ));
        let too_long = "a".repeat(5000);
        assert!(matches!(
            engine.converse("s1", &too_long).await,
            Err(ConversationError::InvalidInput(_))
        ));

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(history.count_turns("s1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_backend_unavailable_writes_nothing() {
        let history = Arc::new(MemoryHistory::default());
        let engine = engine(MockProvider::new(vec![Script::Unavailable]), history.clone());

        let items: Vec<_> = engine.converse("s1", "hello").await.unwrap().collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ConversationError::BackendUnavailable(_))));
        assert_eq!(history.count_turns("s1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_fragments_and_writes_nothing() {
        let history = Arc::new(MemoryHistory::default());
        let script = Script::FailAfter(vec!["Hi".into(), " th".into()], "connection reset".into());
        let engine = engine(MockProvider::new(vec![script]), history.clone());

        let items: Vec<_> = engine.converse("s1", "hello").await.unwrap().collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), "Hi");
        assert_eq!(items[1].as_ref().unwrap(), " th");
        match &items[2] {
            Err(ConversationError::BackendStream { partial, .. }) => assert_eq!(partial, "Hi th"),
            other => panic!("expected BackendStream, got {other:?}"),
        }
        assert_eq!(history.count_turns("s1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_failure_fails_the_turn() {
        let history = Arc::new(MemoryHistory::default());
        history.fail_reads(true);
        let engine = engine(MockProvider::replying(&["x"]), history);

        assert!(matches!(
            engine.converse("s1", "hello").await,
            Err(ConversationError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_append_failure_keeps_streamed_output() {
        let history = Arc::new(MemoryHistory::default());
        history.fail_writes(true);
        let engine = engine(MockProvider::replying(&["Hi"]), history);

        let items: Vec<_> = engine.converse("s1", "hello").await.unwrap().collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "Hi");
    }

    #[tokio::test]
    async fn test_dropping_stream_still_persists() {
        let history = Arc::new(MemoryHistory::default());
        let engine = engine(
            MockProvider::replying(&["a", "b", "c", "d", "e"]),
            history.clone(),
        );

        let mut stream = engine.converse("s1", "hello").await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        drop(stream);

        wait_for_turns(&history, "s1", 2).await;
        let turns = history.load("s1").await.unwrap();
        assert_eq!(turns[1].content, "abcde");
    }

    #[tokio::test]
    async fn test_cancel_stops_production_and_skips_persistence() {
        let history = Arc::new(MemoryHistory::default());
        let engine = engine(
            MockProvider::replying(&["a", "b", "c", "d", "e", "f"]),
            history.clone(),
        );

        let mut stream = engine.converse("s1", "hello").await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        stream.cancel();
        assert!(stream.is_cancelled());

        // At most the one buffered fragment remains before the stream ends.
        let rest: Vec<_> = stream.collect().await;
        assert!(rest.len() <= 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(history.count_turns("s1").await.unwrap(), 0);
    }
}
