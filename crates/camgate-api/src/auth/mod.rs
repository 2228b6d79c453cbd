//! Camera upload authentication.
//!
//! The engine turns one upload's metadata plus the current credential snapshot into an
//! [`AuthDecision`](camgate_core::models::AuthDecision). It performs no I/O.

pub mod basic;
pub mod engine;
pub mod metrics;

pub use basic::parse_basic_authorization;
pub use engine::AuthEngine;
pub use metrics::{AuthMetrics, AuthMetricsSnapshot, IpCheck};
