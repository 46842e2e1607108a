//! Test doubles shared by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatgate_types::chat::{NewTurn, PurgeReport, Turn};
use chatgate_types::error::RepositoryError;
use chatgate_types::llm::{CompletionRequest, LlmError, ProviderCapabilities, StreamEvent};
use chrono::Utc;

use crate::history::HistoryRepository;
use crate::llm::provider::{EventStream, LlmProvider};

/// One scripted backend reply.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(Vec<String>),
    /// Each fragment arrives after `delay` (use with a paused clock).
    Slow(Vec<String>, Duration),
    Unavailable,
    /// Deliver the fragments, then fail mid-stream with the message.
    FailAfter(Vec<String>, String),
}

/// Scripted `LlmProvider`. Each `stream` call consumes the next script; the
/// last script repeats once the queue is down to one.
pub struct MockProvider {
    scripts: Mutex<VecDeque<Script>>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    capabilities: ProviderCapabilities,
}

impl MockProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            capabilities: ProviderCapabilities {
                streaming: true,
                max_output_tokens: 4096,
            },
        }
    }

    pub fn replying(fragments: &[&str]) -> Self {
        Self::new(vec![Script::Reply(
            fragments.iter().map(|f| f.to_string()).collect(),
        )])
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.requests.clone()
    }

    fn next_script(&self) -> Script {
        let mut scripts = self.scripts.lock().unwrap();
        if scripts.len() > 1 {
            scripts.pop_front().unwrap()
        } else {
            scripts.front().cloned().unwrap_or(Script::Reply(Vec::new()))
        }
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let script = self.next_script();

        Box::pin(async_stream::stream! {
            match script {
                Script::Unavailable => {
                    yield Err(LlmError::Unavailable("connection refused".to_string()));
                }
                Script::Reply(fragments) => {
                    yield Ok(StreamEvent::Connected);
                    for text in fragments {
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    yield Ok(StreamEvent::Done);
                }
                Script::Slow(fragments, delay) => {
                    yield Ok(StreamEvent::Connected);
                    for text in fragments {
                        tokio::time::sleep(delay).await;
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    yield Ok(StreamEvent::Done);
                }
                Script::FailAfter(fragments, message) => {
                    yield Ok(StreamEvent::Connected);
                    for text in fragments {
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    yield Err(LlmError::Stream(message));
                }
            }
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(vec!["mock-model".to_string()])
    }
}

/// In-memory `HistoryRepository` with switchable failures.
#[derive(Default)]
pub struct MemoryHistory {
    sessions: Mutex<HashMap<String, Vec<Turn>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryHistory {
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<(), RepositoryError> {
        if flag.load(Ordering::SeqCst) {
            Err(RepositoryError::Query("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl HistoryRepository for MemoryHistory {
    async fn load(&self, session_id: &str) -> Result<Vec<Turn>, RepositoryError> {
        Self::check(&self.fail_reads)?;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, session_id: &str, turn: &NewTurn) -> Result<Turn, RepositoryError> {
        let mut turns = self.append_all(session_id, std::slice::from_ref(turn)).await?;
        turns.pop().ok_or(RepositoryError::NotFound)
    }

    async fn append_all(
        &self,
        session_id: &str,
        turns: &[NewTurn],
    ) -> Result<Vec<Turn>, RepositoryError> {
        Self::check(&self.fail_writes)?;
        let mut sessions = self.sessions.lock().unwrap();
        let stored = sessions.entry(session_id.to_string()).or_default();
        let mut next = stored.last().map_or(1, |t| t.sequence + 1);
        let mut written = Vec::with_capacity(turns.len());
        for turn in turns {
            let turn = Turn {
                session_id: session_id.to_string(),
                role: turn.role,
                content: turn.content.clone(),
                sequence: next,
                created_at: turn.created_at,
            };
            next += 1;
            stored.push(turn.clone());
            written.push(turn);
        }
        Ok(written)
    }

    async fn purge_older_than(&self, age: chrono::Duration) -> Result<PurgeReport, RepositoryError> {
        Self::check(&self.fail_writes)?;
        let cutoff = Utc::now() - age;
        let mut sessions = self.sessions.lock().unwrap();
        let mut report = PurgeReport::default();
        sessions.retain(|_, turns| {
            let stale = turns.last().is_some_and(|t| t.created_at < cutoff);
            if stale {
                report.sessions_removed += 1;
                report.turns_removed += turns.len() as u64;
            }
            !stale
        });
        Ok(report)
    }

    async fn count_turns(&self, session_id: &str) -> Result<u64, RepositoryError> {
        Self::check(&self.fail_reads)?;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map_or(0, |t| t.len() as u64))
    }
}
