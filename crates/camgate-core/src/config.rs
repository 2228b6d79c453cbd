//! Configuration module
//!
//! Typed gateway configuration loaded once from the environment and validated at startup.
//! Nothing reads free-form environment keys at request time.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::DEFAULT_SCRIPTED_REGION;
use crate::models::{CredentialSnapshot, NetworkPattern, RegionCredential};
use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// How authentication rejections are reported to cameras.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionPolicy {
    /// Reply with the rejection's own status (400/401)
    Status,
    /// Reply `200 OK` with a generic body so firmware does not retry-storm
    Disguised,
}

impl FromStr for RejectionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "status" => Ok(RejectionPolicy::Status),
            "disguised" => Ok(RejectionPolicy::Disguised),
            other => Err(anyhow::anyhow!(
                "Invalid AUTH_REJECTION_POLICY '{}': expected 'status' or 'disguised'",
                other
            )),
        }
    }
}

/// Base configuration shared by the gateway and the operator tools
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Inputs of the credential cache and the auth engine
#[derive(Clone, Debug)]
pub struct CredentialConfig {
    pub refresh_interval: Duration,
    /// Static camera-id to address map used until the directory first loads
    pub camera_ip_mapping: BTreeMap<String, NetworkPattern>,
    pub default_region: String,
    pub regions: HashMap<String, RegionCredential>,
    pub scripted_networks: BTreeMap<String, Vec<NetworkPattern>>,
    pub scripted_region: String,
}

impl CredentialConfig {
    pub fn fallback_snapshot(&self) -> CredentialSnapshot {
        CredentialSnapshot::static_fallback(
            &self.camera_ip_mapping,
            &self.default_region,
            self.scripted_networks.clone(),
            self.regions.clone(),
        )
    }
}

#[derive(Clone, Debug)]
pub struct RetentionConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub local_max_age: chrono::Duration,
    pub object_max_age: chrono::Duration,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub local_storage_path: String,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
}

impl StorageConfig {
    /// Backend used for the object tier. Without a bucket the tier lives on local disk.
    pub fn object_backend(&self) -> StorageBackend {
        if self.s3_bucket.is_some() {
            StorageBackend::S3
        } else {
            StorageBackend::Local
        }
    }
}

/// Forwarding of accepted images to the FTP drop served to downstream consumers.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub enabled: bool,
    pub queue: String,
    /// Remote directory every relayed path is placed under. Empty means the FTP root.
    pub target_dir: String,
    /// Directory the relay writes into; the FTP server publishes it.
    pub drop_path: String,
}

#[derive(Clone, Debug)]
pub struct FanoutConfig {
    pub exchange: String,
    pub archiver_queue: String,
    pub archiver_enabled: bool,
    pub queue_capacity: usize,
    pub relay: RelayConfig,
}

/// Full gateway configuration
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub base: BaseConfig,
    pub database_url: String,
    pub credentials: CredentialConfig,
    pub retention: RetentionConfig,
    pub storage: StorageConfig,
    pub fanout: FanoutConfig,
    pub max_upload_size_bytes: usize,
    pub rejection_policy: RejectionPolicy,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<GatewayConfig>);

impl Config {
    fn inner(&self) -> &GatewayConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = GatewayConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn credentials(&self) -> &CredentialConfig {
        &self.inner().credentials
    }

    pub fn retention(&self) -> &RetentionConfig {
        &self.inner().retention
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.inner().storage
    }

    pub fn fanout(&self) -> &FanoutConfig {
        &self.inner().fanout
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn rejection_policy(&self) -> RejectionPolicy {
        self.inner().rejection_policy
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const PORT: u16 = 8000;
        const CREDENTIAL_REFRESH_INTERVAL_SECS: u64 = 30;
        const MAX_UPLOAD_SIZE_MB: usize = 10;
        const RETENTION_INTERVAL_SECS: u64 = 10;
        const LOCAL_RETENTION_HOURS: i64 = 24;
        const OBJECT_RETENTION_DAYS: i64 = 30;
        const FANOUT_QUEUE_CAPACITY: usize = 256;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let credentials = CredentialConfig {
            refresh_interval: Duration::from_secs(
                env::var("CREDENTIAL_REFRESH_INTERVAL_SECS")
                    .unwrap_or_else(|_| CREDENTIAL_REFRESH_INTERVAL_SECS.to_string())
                    .parse()
                    .unwrap_or(CREDENTIAL_REFRESH_INTERVAL_SECS),
            ),
            camera_ip_mapping: parse_camera_ip_mapping(
                &env::var("CAMERA_IP_MAPPING").unwrap_or_else(|_| "{}".to_string()),
            )?,
            default_region: env::var("DEFAULT_CAMERA_REGION")
                .unwrap_or_else(|_| "default".to_string()),
            regions: parse_region_credentials(
                &env::var("LOCATION_USER_PASS_MAPPING").unwrap_or_else(|_| "{}".to_string()),
            )?,
            scripted_networks: parse_scripted_networks(
                &env::var("SCRIPTED_NETWORKS").unwrap_or_else(|_| "{}".to_string()),
            )?,
            scripted_region: env::var("SCRIPTED_REGION")
                .unwrap_or_else(|_| DEFAULT_SCRIPTED_REGION.to_string()),
        };

        let retention = RetentionConfig {
            enabled: env::var("RETENTION_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            interval: Duration::from_secs(
                env::var("RETENTION_INTERVAL_SECS")
                    .unwrap_or_else(|_| RETENTION_INTERVAL_SECS.to_string())
                    .parse()
                    .unwrap_or(RETENTION_INTERVAL_SECS),
            ),
            local_max_age: retention_hours(
                env::var("LOCAL_RETENTION_HOURS")
                    .unwrap_or_else(|_| LOCAL_RETENTION_HOURS.to_string())
                    .parse()
                    .unwrap_or(LOCAL_RETENTION_HOURS),
            )?,
            object_max_age: retention_days(
                env::var("OBJECT_RETENTION_DAYS")
                    .unwrap_or_else(|_| OBJECT_RETENTION_DAYS.to_string())
                    .parse()
                    .unwrap_or(OBJECT_RETENTION_DAYS),
            )?,
        };

        let storage = StorageConfig {
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./data".to_string()),
            s3_bucket: env::var("S3_BUCKET").ok().filter(|s| !s.trim().is_empty()),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .unwrap_or_else(|_| "us-east-1".to_string()),
            s3_endpoint: env::var("S3_ENDPOINT")
                .or_else(|_| env::var("S3_ENDPOINT_URL"))
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        let fanout = FanoutConfig {
            exchange: env::var("FANOUT_EXCHANGE").unwrap_or_else(|_| "image_fanout".to_string()),
            archiver_queue: env::var("ARCHIVER_QUEUE")
                .unwrap_or_else(|_| "image-queue-image-archiver".to_string()),
            archiver_enabled: env::var("ARCHIVER_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            queue_capacity: env::var("FANOUT_QUEUE_CAPACITY")
                .unwrap_or_else(|_| FANOUT_QUEUE_CAPACITY.to_string())
                .parse()
                .unwrap_or(FANOUT_QUEUE_CAPACITY),
            relay: RelayConfig {
                enabled: env::var("FTP_RELAY_ENABLED")
                    .map(|v| v.to_lowercase() == "true")
                    .unwrap_or(false),
                queue: env::var("FTP_RELAY_QUEUE")
                    .unwrap_or_else(|_| "image-queue-ftp-relay".to_string()),
                target_dir: env::var("FTP_TARGET_DIR").unwrap_or_default(),
                drop_path: env::var("FTP_RELAY_PATH")
                    .unwrap_or_else(|_| "./data/ftp".to_string()),
            },
        };

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let rejection_policy = env::var("AUTH_REJECTION_POLICY")
            .unwrap_or_else(|_| "status".to_string())
            .parse()?;

        Ok(GatewayConfig {
            base,
            database_url,
            credentials,
            retention,
            storage,
            fanout,
            max_upload_size_bytes: upload_limit_bytes(max_upload_size_mb)?,
            rejection_policy,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.credentials.refresh_interval.is_zero() {
            return Err(anyhow::anyhow!(
                "CREDENTIAL_REFRESH_INTERVAL_SECS must be greater than 0"
            ));
        }

        if self.retention.interval.is_zero() {
            return Err(anyhow::anyhow!("RETENTION_INTERVAL_SECS must be greater than 0"));
        }

        if self.retention.local_max_age <= chrono::Duration::zero()
            || self.retention.object_max_age <= chrono::Duration::zero()
        {
            return Err(anyhow::anyhow!(
                "LOCAL_RETENTION_HOURS and OBJECT_RETENTION_DAYS must be greater than 0"
            ));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.fanout.queue_capacity == 0 {
            return Err(anyhow::anyhow!("FANOUT_QUEUE_CAPACITY must be greater than 0"));
        }

        if self.fanout.relay.enabled && self.fanout.relay.queue == self.fanout.archiver_queue {
            return Err(anyhow::anyhow!(
                "FTP_RELAY_QUEUE must differ from ARCHIVER_QUEUE ('{}')",
                self.fanout.archiver_queue
            ));
        }

        if !self.credentials.scripted_networks.is_empty()
            && !self
                .credentials
                .regions
                .contains_key(&self.credentials.scripted_region)
        {
            return Err(anyhow::anyhow!(
                "SCRIPTED_NETWORKS is set but LOCATION_USER_PASS_MAPPING has no '{}' region",
                self.credentials.scripted_region
            ));
        }

        Ok(())
    }
}

fn upload_limit_bytes(megabytes: usize) -> Result<usize, anyhow::Error> {
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_UPLOAD_SIZE_MB is out of range: {}", megabytes))
}

fn retention_hours(hours: i64) -> Result<chrono::Duration, anyhow::Error> {
    chrono::Duration::try_hours(hours)
        .ok_or_else(|| anyhow::anyhow!("LOCAL_RETENTION_HOURS is out of range: {}", hours))
}

fn retention_days(days: i64) -> Result<chrono::Duration, anyhow::Error> {
    chrono::Duration::try_days(days)
        .ok_or_else(|| anyhow::anyhow!("OBJECT_RETENTION_DAYS is out of range: {}", days))
}

/// Parse `CAMERA_IP_MAPPING`: `{"<camera_id>": "<ip or cidr>"}`.
pub fn parse_camera_ip_mapping(
    raw: &str,
) -> Result<BTreeMap<String, NetworkPattern>, anyhow::Error> {
    let mapping: BTreeMap<String, String> = serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("CAMERA_IP_MAPPING must be a JSON object: {}", e))?;

    mapping
        .into_iter()
        .map(|(camera_id, ip)| {
            let pattern = ip
                .parse::<NetworkPattern>()
                .map_err(|e| anyhow::anyhow!("CAMERA_IP_MAPPING[{}]: {}", camera_id, e))?;
            Ok((camera_id, pattern))
        })
        .collect()
}

#[derive(serde::Deserialize)]
struct UserPass {
    username: String,
    password: String,
}

/// Parse `LOCATION_USER_PASS_MAPPING`: `{"<region>": {"username": "...", "password": "..."}}`.
pub fn parse_region_credentials(
    raw: &str,
) -> Result<HashMap<String, RegionCredential>, anyhow::Error> {
    let mapping: HashMap<String, UserPass> = serde_json::from_str(raw).map_err(|e| {
        anyhow::anyhow!("LOCATION_USER_PASS_MAPPING must be a JSON object: {}", e)
    })?;

    Ok(mapping
        .into_iter()
        .map(|(region, creds)| {
            let credential = RegionCredential {
                region: region.clone(),
                username: creds.username,
                password: creds.password,
            };
            (region, credential)
        })
        .collect())
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Parse `SCRIPTED_NETWORKS`: `{"<name>": "<pattern>"}` or `{"<name>": ["<pattern>", ...]}`.
pub fn parse_scripted_networks(
    raw: &str,
) -> Result<BTreeMap<String, Vec<NetworkPattern>>, anyhow::Error> {
    let mapping: BTreeMap<String, OneOrMany> = serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("SCRIPTED_NETWORKS must be a JSON object: {}", e))?;

    mapping
        .into_iter()
        .map(|(name, value)| {
            let raw_patterns = match value {
                OneOrMany::One(pattern) => vec![pattern],
                OneOrMany::Many(patterns) => patterns,
            };
            if raw_patterns.is_empty() {
                return Err(anyhow::anyhow!(
                    "SCRIPTED_NETWORKS[{}] must list at least one pattern",
                    name
                ));
            }
            let patterns = raw_patterns
                .iter()
                .map(|p| NetworkPattern::parse_allowlist(p))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| anyhow::anyhow!("SCRIPTED_NETWORKS[{}]: {}", name, e))?;
            Ok((name, patterns))
        })
        .collect()
}
