mod service;

pub use service::{CacheStats, CredentialCache};
