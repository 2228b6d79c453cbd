pub mod images;
pub mod ingest;
pub mod metrics;
