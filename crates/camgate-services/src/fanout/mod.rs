//! Fan-out of accepted images to downstream consumers.

mod archiver;
mod exchange;
mod relay;

pub use archiver::{
    ArchiveConsumer, ArchiveError, ArchiveKeys, ArchiveStats, PassthroughWatermarker, Watermarker,
};
pub use exchange::{FanoutExchange, Publisher, PUBLISH_TIMEOUT};
pub use relay::{remote_path, FtpClient, FtpRelayConsumer, RelayError, RelayStats, StorageFtpClient};
