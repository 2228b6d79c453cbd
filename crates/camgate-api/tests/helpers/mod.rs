//! Test helpers: build AppState and router for integration tests.
//!
//! The gateway runs against in-memory collaborators: a mock camera directory, a mock
//! index store and filesystem tiers in a temp dir. Run with `cargo test -p camgate-api`.

pub mod fixtures;

use axum_test::TestServer;
use camgate_api::setup::{initialize_services, routes, BackgroundTasks, Collaborators};
use camgate_api::state::AppState;
use camgate_core::config::{
    BaseConfig, CredentialConfig, FanoutConfig, RelayConfig, RetentionConfig, StorageConfig,
};
use camgate_core::constants::API_PREFIX;
use camgate_core::models::ImageIndexEntry;
use camgate_core::{Config, GatewayConfig, RejectionPolicy};
use camgate_db::test_utils::{MockCameraDirectory, MockImageIndex};
use camgate_services::{FtpClient, StorageFtpClient};
use camgate_storage::{create_directory_storage, create_storage_tiers, StorageTiers};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// API path prefix for tests (e.g. `/api`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

/// Test application: server, state and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub directory: Arc<MockCameraDirectory>,
    pub index: Arc<MockImageIndex>,
    pub tiers: StorageTiers,
    pub background: BackgroundTasks,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Wait until the FTP relay has written `remote_path` under its drop directory.
    pub async fn wait_for_relayed(&self, remote_path: &str) -> Vec<u8> {
        let path = std::path::Path::new(&self.state.config.fanout().relay.drop_path)
            .join(remote_path);
        for _ in 0..200 {
            if let Ok(data) = std::fs::read(&path) {
                return data;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("relay did not write {} in time", remote_path);
    }

    /// Wait until the archiver has indexed at least `count` images.
    pub async fn wait_for_entries(&self, count: usize) -> Vec<ImageIndexEntry> {
        for _ in 0..200 {
            let entries = self.index.entries();
            if entries.len() >= count {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("archiver did not index {} images in time", count);
    }
}

fn test_config(temp_dir: &TempDir) -> GatewayConfig {
    let regions = [("north", "cam", "secret"), ("Scripted", "svc", "token")]
        .into_iter()
        .map(|(region, username, password)| {
            (
                region.to_string(),
                camgate_core::models::RegionCredential {
                    region: region.to_string(),
                    username: username.to_string(),
                    password: password.to_string(),
                },
            )
        })
        .collect::<HashMap<_, _>>();

    let mut scripted_networks = BTreeMap::new();
    scripted_networks.insert(
        "ci-runner".to_string(),
        vec!["192.0.2.0/24".parse().unwrap()],
    );

    GatewayConfig {
        base: BaseConfig {
            server_port: 0,
            db_max_connections: 1,
            db_timeout_seconds: 1,
            environment: "test".to_string(),
        },
        database_url: "postgresql://unused".to_string(),
        credentials: CredentialConfig {
            refresh_interval: Duration::from_secs(3600),
            camera_ip_mapping: BTreeMap::new(),
            default_region: "default".to_string(),
            regions,
            scripted_networks,
            scripted_region: "Scripted".to_string(),
        },
        retention: RetentionConfig {
            enabled: false,
            interval: Duration::from_secs(3600),
            local_max_age: chrono::Duration::hours(24),
            object_max_age: chrono::Duration::days(30),
        },
        storage: StorageConfig {
            local_storage_path: temp_dir.path().display().to_string(),
            s3_bucket: None,
            s3_region: "us-east-1".to_string(),
            s3_endpoint: None,
        },
        fanout: FanoutConfig {
            exchange: "image_fanout".to_string(),
            archiver_queue: "image-queue-image-archiver".to_string(),
            archiver_enabled: true,
            queue_capacity: 16,
            relay: RelayConfig {
                enabled: false,
                queue: "image-queue-ftp-relay".to_string(),
                target_dir: String::new(),
                drop_path: temp_dir.path().join("ftp").display().to_string(),
            },
        },
        max_upload_size_bytes: 64 * 1024,
        rejection_policy: RejectionPolicy::Status,
    }
}

/// Setup test app with the default test configuration.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup test app, letting the caller adjust the configuration first.
pub async fn setup_test_app_with(customize: impl FnOnce(&mut GatewayConfig)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut gateway_config = test_config(&temp_dir);
    customize(&mut gateway_config);
    let config = Config(Box::new(gateway_config));

    let directory = Arc::new(MockCameraDirectory::new(fixtures::cameras()));
    let index = Arc::new(MockImageIndex::new());
    let tiers = create_storage_tiers(config.storage())
        .await
        .expect("Failed to create storage tiers");
    let relay = if config.fanout().relay.enabled {
        let storage = create_directory_storage(&config.fanout().relay.drop_path)
            .await
            .expect("Failed to create relay drop directory");
        Some(Arc::new(StorageFtpClient::new(storage)) as Arc<dyn FtpClient>)
    } else {
        None
    };

    let (state, background) = initialize_services(
        &config,
        Collaborators {
            pool: None,
            directory: directory.clone(),
            index: index.clone(),
            tiers: tiers.clone(),
            relay,
        },
    );
    state
        .auth
        .cache
        .refresh()
        .await
        .expect("Initial credential refresh failed");

    let router = routes::setup_routes(&config, state.clone());
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        state,
        directory,
        index,
        tiers,
        background,
        _temp_dir: temp_dir,
    }
}
