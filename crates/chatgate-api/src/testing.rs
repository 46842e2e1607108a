//! Test doubles shared by the unit tests of this crate.

use chatgate_core::llm::box_provider::BoxLlmProvider;
use chatgate_core::llm::provider::{EventStream, LlmProvider};
use chatgate_infra::sqlite::history::SqliteHistoryRepository;
use chatgate_infra::sqlite::pool::DatabasePool;
use chatgate_types::config::GatewayConfig;
use chatgate_types::llm::{CompletionRequest, LlmError, ProviderCapabilities, StreamEvent};
use tempfile::TempDir;

use crate::state::AppState;

/// Replies "Hello" in two fragments.
pub struct CannedProvider {
    capabilities: ProviderCapabilities,
}

impl CannedProvider {
    pub fn new() -> Self {
        Self {
            capabilities: ProviderCapabilities {
                streaming: true,
                max_output_tokens: 2048,
            },
        }
    }
}

impl LlmProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    fn stream(&self, _request: CompletionRequest) -> EventStream {
        Box::pin(async_stream::stream! {
            yield Ok(StreamEvent::Connected);
            yield Ok(StreamEvent::TextDelta { text: "Hel".to_string() });
            yield Ok(StreamEvent::TextDelta { text: "lo".to_string() });
            yield Ok(StreamEvent::Done);
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(vec!["llama3:latest".to_string()])
    }
}

/// App state over a fresh SQLite file and the canned provider. Keep the
/// returned directory alive for the duration of the test.
pub async fn test_state() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let pool = DatabasePool::new(&url).await.unwrap();

    let state = AppState::from_parts(
        GatewayConfig::default(),
        dir.path().to_path_buf(),
        SqliteHistoryRepository::new(pool),
        BoxLlmProvider::new(CannedProvider::new()),
    );
    (state, dir)
}
