//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI commands
//! and REST handlers. Core services are generic over the history port;
//! AppState pins them to the SQLite implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use chatgate_core::chat::engine::{ConversationEngine, EngineConfig};
use chatgate_core::gateway::Gateway;
use chatgate_core::history::RetentionService;
use chatgate_core::llm::box_provider::BoxLlmProvider;
use chatgate_core::session::SessionRegistry;
use chatgate_infra::config::default_database_url;
use chatgate_infra::llm::create_provider;
use chatgate_infra::sqlite::history::SqliteHistoryRepository;
use chatgate_infra::sqlite::pool::DatabasePool;
use chatgate_types::config::GatewayConfig;

pub type ConcreteGateway = Gateway<SqliteHistoryRepository>;
pub type ConcreteRetention = RetentionService<SqliteHistoryRepository>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: ConcreteGateway,
    pub history: Arc<SqliteHistoryRepository>,
    pub retention: Arc<ConcreteRetention>,
    pub provider: Arc<BoxLlmProvider>,
    pub config: Arc<GatewayConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the database, build the backend client, and wire the services.
    pub async fn init(config: GatewayConfig, data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;

        let db_url = config
            .database_url
            .clone()
            .unwrap_or_else(|| default_database_url(&data_dir));
        let pool = DatabasePool::new(&db_url)
            .await
            .with_context(|| format!("cannot open database {db_url}"))?;

        let provider = create_provider(&config)?;

        Ok(Self::from_parts(
            config,
            data_dir,
            SqliteHistoryRepository::new(pool),
            provider,
        ))
    }

    /// Wire the services around an already-open store and backend.
    pub fn from_parts(
        config: GatewayConfig,
        data_dir: PathBuf,
        history: SqliteHistoryRepository,
        provider: BoxLlmProvider,
    ) -> Self {
        let history = Arc::new(history);
        let provider = Arc::new(provider);

        let registry = Arc::new(SessionRegistry::new(config.session_timeout()));
        let engine = Arc::new(ConversationEngine::new(
            history.clone(),
            provider.clone(),
            EngineConfig::from(&config),
        ));

        Self {
            gateway: Gateway::new(registry, engine),
            retention: Arc::new(RetentionService::new(history.clone())),
            history,
            provider,
            config: Arc::new(config),
            data_dir,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.gateway.registry()
    }
}
