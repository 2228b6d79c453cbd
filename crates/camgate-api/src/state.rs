//! Application state and sub-states.
//!
//! AppState is split by concern so handlers reach only what they need: the auth path reads
//! the credential cache, the upload path publishes, and the read path queries the index.

use crate::auth::AuthEngine;
use camgate_core::{Config, RejectionPolicy};
use camgate_db::ImageIndexStore;
use camgate_services::{
    ArchiveConsumer, CredentialCache, FtpRelayConsumer, Publisher, RetentionService,
};
use sqlx::PgPool;
use std::sync::Arc;

/// Credential snapshot cell and the engine evaluating uploads against it.
#[derive(Clone)]
pub struct AuthState {
    pub cache: Arc<CredentialCache>,
    pub engine: Arc<AuthEngine>,
}

/// Upload path collaborators and limits.
#[derive(Clone)]
pub struct IngestState {
    pub publisher: Arc<dyn Publisher>,
    pub max_upload_size_bytes: usize,
    pub rejection_policy: RejectionPolicy,
}

/// Index store and the background services working on it.
#[derive(Clone)]
pub struct ArchiveState {
    pub index: Arc<dyn ImageIndexStore>,
    pub retention: Option<Arc<RetentionService>>,
    pub archiver: Option<Arc<ArchiveConsumer>>,
    pub relay: Option<Arc<FtpRelayConsumer>>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Absent when the state is built from in-memory collaborators.
    pub pool: Option<PgPool>,
    pub auth: AuthState,
    pub ingest: IngestState,
    pub archive: ArchiveState,
}
