//! Auth and publish counters.

use camgate_core::models::AuthRejection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of the client-address check for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpCheck {
    Matched,
    Mismatched,
    /// The camera declares no expected network
    Skipped,
}

#[derive(Debug, Default)]
pub struct AuthMetrics {
    ip_success: AtomicU64,
    ip_failure: AtomicU64,
    ip_skipped: AtomicU64,
    auth_success: AtomicU64,
    auth_failure: AtomicU64,
    rejections: [AtomicU64; AuthRejection::COUNT],
    publish_success: AtomicU64,
    publish_failure: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthMetricsSnapshot {
    pub ip_success: u64,
    pub ip_failure: u64,
    pub ip_skipped: u64,
    pub auth_success: u64,
    pub auth_failure: u64,
    pub rejections: BTreeMap<&'static str, u64>,
    pub publish_success: u64,
    pub publish_failure: u64,
}

impl AuthMetrics {
    pub fn record_ip(&self, check: IpCheck) {
        let counter = match check {
            IpCheck::Matched => &self.ip_success,
            IpCheck::Mismatched => &self.ip_failure,
            IpCheck::Skipped => &self.ip_skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_credentials(&self, valid: bool) {
        let counter = if valid {
            &self.auth_success
        } else {
            &self.auth_failure
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self, reason: &AuthRejection) {
        self.rejections[reason.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish(&self, delivered: bool) {
        let counter = if delivered {
            &self.publish_success
        } else {
            &self.publish_failure
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AuthMetricsSnapshot {
        let rejections = AuthRejection::CODES
            .iter()
            .zip(self.rejections.iter())
            .map(|(code, count)| (*code, count.load(Ordering::Relaxed)))
            .collect();

        AuthMetricsSnapshot {
            ip_success: self.ip_success.load(Ordering::Relaxed),
            ip_failure: self.ip_failure.load(Ordering::Relaxed),
            ip_skipped: self.ip_skipped.load(Ordering::Relaxed),
            auth_success: self.auth_success.load(Ordering::Relaxed),
            auth_failure: self.auth_failure.load(Ordering::Relaxed),
            rejections,
            publish_success: self.publish_success.load(Ordering::Relaxed),
            publish_failure: self.publish_failure.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_are_counted_per_reason() {
        let metrics = AuthMetrics::default();
        metrics.record_rejection(&AuthRejection::IpMismatch);
        metrics.record_rejection(&AuthRejection::IpMismatch);
        metrics.record_rejection(&AuthRejection::NoCredentialsConfigured {
            region: "north".to_string(),
        });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rejections["IP_MISMATCH"], 2);
        assert_eq!(snapshot.rejections["NO_CREDENTIALS_CONFIGURED"], 1);
        assert_eq!(snapshot.rejections["UNKNOWN_CAMERA"], 0);
        assert_eq!(snapshot.rejections.len(), AuthRejection::COUNT);
    }

    #[test]
    fn test_ip_and_publish_counters() {
        let metrics = AuthMetrics::default();
        metrics.record_ip(IpCheck::Matched);
        metrics.record_ip(IpCheck::Skipped);
        metrics.record_publish(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ip_success, 1);
        assert_eq!(snapshot.ip_skipped, 1);
        assert_eq!(snapshot.ip_failure, 0);
        assert_eq!(snapshot.publish_failure, 1);
    }
}
