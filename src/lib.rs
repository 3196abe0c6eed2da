// ============================================================================
// Student Scores Library
// ============================================================================

pub mod config;
pub mod core;
pub mod deploy;
pub mod query;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use config::{AppConfig, AppEnv};
pub use crate::core::{Record, RecordDraft, RecordId, Result, StoreError};
pub use query::{CompareOp, Field, FilterError, FilterExpr, ParsedQuery, Predicate, RecordQuery};
pub use storage::{DurabilityMode, InMemoryRecordStore, RecordStore};
pub use web::{AppState, WebError, build_router};

use deploy::{Deployer, ProcessRunner, WebhookVerifier};
use std::sync::Arc;
use tracing::{info, warn};

/// Opens the record store described by `config`.
///
/// Without a data directory the store lives in memory only.
pub fn open_store(config: &AppConfig) -> Result<InMemoryRecordStore> {
    match &config.data_dir {
        Some(dir) => InMemoryRecordStore::open(dir, config.durability, config.checkpoint_threshold),
        None => {
            warn!("DATA_DIR not set, records are kept in memory only");
            Ok(InMemoryRecordStore::new())
        }
    }
}

/// Assembles handler state: the shared store plus, when a secret is
/// configured, the deploy hook.
pub fn build_state(
    config: &AppConfig,
    store: Arc<dyn RecordStore>,
) -> std::result::Result<AppState, deploy::DeployError> {
    let state = AppState::new(store);
    match &config.webhook_secret {
        Some(secret) => {
            let deployer = Deployer::new(
                WebhookVerifier::new(secret)?,
                Arc::new(ProcessRunner),
                config.deploy_dir.clone(),
                config.deploy_entry_script.clone(),
            );
            info!(deploy_dir = %config.deploy_dir.display(), "webhook enabled");
            Ok(state.with_deployer(deployer))
        }
        None => {
            info!("WEBHOOK_SECRET not set, webhook disabled");
            Ok(state)
        }
    }
}
