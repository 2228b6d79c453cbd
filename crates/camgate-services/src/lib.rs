//! Camgate Services Layer
//!
//! Background and pipeline services: the credential cache refresh loop, the in-process
//! fan-out exchange, its archiver and FTP relay consumers, and the retention engine. HTTP
//! handling stays in camgate-api.

pub mod cache;
pub mod fanout;
pub mod retention;

pub use cache::{CacheStats, CredentialCache};
pub use fanout::{
    ArchiveConsumer, ArchiveError, ArchiveKeys, ArchiveStats, FanoutExchange, FtpClient,
    FtpRelayConsumer, PassthroughWatermarker, Publisher, RelayError, RelayStats,
    StorageFtpClient, Watermarker,
};
pub use retention::{CycleReport, RetentionService, RetentionStats, TierReport};
