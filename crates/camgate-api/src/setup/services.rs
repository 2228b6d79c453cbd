//! Service wiring and background task lifecycle.

use crate::auth::{AuthEngine, AuthMetrics};
use crate::state::{AppState, ArchiveState, AuthState, IngestState};
use camgate_core::Config;
use camgate_db::{CameraDirectory, ImageIndexStore};
use camgate_services::{
    ArchiveConsumer, CredentialCache, FanoutExchange, FtpClient, FtpRelayConsumer,
    PassthroughWatermarker, Publisher, RetentionService,
};
use camgate_storage::StorageTiers;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// External collaborators the gateway is built from.
pub struct Collaborators {
    pub pool: Option<PgPool>,
    pub directory: Arc<dyn CameraDirectory>,
    pub index: Arc<dyn ImageIndexStore>,
    pub tiers: StorageTiers,
    /// FTP relay target; the relay queue is bound only when present.
    pub relay: Option<Arc<dyn FtpClient>>,
}

/// Handles of the background loops started with the gateway.
pub struct BackgroundTasks {
    cancel: CancellationToken,
    exchange: Arc<FanoutExchange>,
    consumers: Vec<(&'static str, JoinHandle<()>)>,
    loops: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundTasks {
    pub fn exchange(&self) -> &Arc<FanoutExchange> {
        &self.exchange
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop all loops. Fan-out consumers drain their queues first; an in-flight refresh or
    /// retention cycle is allowed to finish.
    pub async fn shutdown(self) {
        self.exchange.close();
        for (name, handle) in self.consumers {
            if let Err(e) = handle.await {
                tracing::error!(task = name, error = %e, "Background task failed");
            }
        }

        self.cancel.cancel();
        for (name, handle) in self.loops {
            if let Err(e) = handle.await {
                tracing::error!(task = name, error = %e, "Background task failed");
            }
        }
        tracing::info!("Background tasks stopped");
    }
}

/// Build the application state and start the background loops.
///
/// Must be called from within a Tokio runtime.
pub fn initialize_services(
    config: &Config,
    collaborators: Collaborators,
) -> (Arc<AppState>, BackgroundTasks) {
    let Collaborators {
        pool,
        directory,
        index,
        tiers,
        relay,
    } = collaborators;
    let cancel = CancellationToken::new();
    let mut loops = Vec::new();
    let mut consumers = Vec::new();

    let cache = Arc::new(CredentialCache::new(
        directory,
        config.credentials().clone(),
    ));
    loops.push(("credential_refresh", cache.clone().start(cancel.clone())));

    let engine = Arc::new(AuthEngine::new(
        config.credentials().scripted_region.clone(),
        Arc::new(AuthMetrics::default()),
    ));

    let fanout = config.fanout();
    let exchange = Arc::new(FanoutExchange::new(
        fanout.exchange.clone(),
        fanout.queue_capacity,
    ));

    let archiver = if fanout.archiver_enabled {
        let receiver = exchange.bind(fanout.archiver_queue.clone());
        let consumer = Arc::new(ArchiveConsumer::new(
            tiers.clone(),
            index.clone(),
            Arc::new(PassthroughWatermarker),
        ));
        consumers.push(("archiver", consumer.clone().start(receiver, cancel.child_token())));
        Some(consumer)
    } else {
        tracing::info!("Archiver disabled, accepted images are not archived");
        None
    };

    let relay = match relay {
        Some(client) => {
            let receiver = exchange.bind(fanout.relay.queue.clone());
            let consumer = Arc::new(FtpRelayConsumer::new(
                cache.clone(),
                client,
                fanout.relay.target_dir.clone(),
            ));
            consumers.push(("ftp_relay", consumer.clone().start(receiver, cancel.child_token())));
            Some(consumer)
        }
        None => None,
    };

    let retention = if config.retention().enabled {
        let service = Arc::new(RetentionService::new(
            index.clone(),
            tiers,
            config.retention().clone(),
        ));
        loops.push(("retention", service.clone().start(cancel.clone())));
        Some(service)
    } else {
        tracing::info!("Retention disabled");
        None
    };

    tracing::info!(
        exchange = exchange.name(),
        queues = ?exchange.queue_names(),
        "Fan-out exchange ready"
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        pool,
        auth: AuthState { cache, engine },
        ingest: IngestState {
            publisher: exchange.clone() as Arc<dyn Publisher>,
            max_upload_size_bytes: config.max_upload_size_bytes(),
            rejection_policy: config.rejection_policy(),
        },
        archive: ArchiveState {
            index,
            retention,
            archiver,
            relay,
        },
    });

    let background = BackgroundTasks {
        cancel,
        exchange,
        consumers,
        loops,
    };

    (state, background)
}
