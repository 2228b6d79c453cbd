//! Upload authorization.
//!
//! Checks run in a fixed order and the first failing check decides the rejection. The
//! scripted path applies when the client address falls inside a scripted network; every
//! other upload goes through the per-camera path.

use super::metrics::{AuthMetrics, IpCheck};
use camgate_core::models::{
    AcceptedUpload, AuthDecision, AuthRejection, BasicCredentials, CameraRecord,
    CredentialSnapshot, RegionCredential, UploadRequestMeta,
};
use camgate_core::validation::camera_id_from_filename;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Constant-time string comparison to avoid timing side-channels.
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub struct AuthEngine {
    scripted_region: String,
    metrics: Arc<AuthMetrics>,
}

impl AuthEngine {
    pub fn new(scripted_region: impl Into<String>, metrics: Arc<AuthMetrics>) -> Self {
        Self {
            scripted_region: scripted_region.into(),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<AuthMetrics> {
        &self.metrics
    }

    /// Classify one upload against `snapshot`.
    pub fn authorize(
        &self,
        snapshot: &CredentialSnapshot,
        request: &UploadRequestMeta,
    ) -> AuthDecision {
        match self.evaluate(snapshot, request) {
            Ok(accepted) => {
                tracing::debug!(
                    camera_id = %accepted.camera.id,
                    client_ip = %accepted.client_ip,
                    is_scripted = accepted.is_scripted,
                    "Upload authorized"
                );
                AuthDecision::Accepted(accepted)
            }
            Err(reason) => {
                self.metrics.record_rejection(&reason);
                AuthDecision::Rejected(reason)
            }
        }
    }

    fn evaluate(
        &self,
        snapshot: &CredentialSnapshot,
        request: &UploadRequestMeta,
    ) -> Result<AcceptedUpload, AuthRejection> {
        let camera_id = request
            .filename
            .as_deref()
            .and_then(camera_id_from_filename)
            .ok_or(AuthRejection::MalformedFilename)?;

        if let Some(ip) = request.client_ip {
            if let Some(network) = snapshot.scripted_network_for(ip) {
                return self.authorize_scripted(snapshot, request, camera_id, ip, network);
            }
        }

        self.authorize_camera(snapshot, request, camera_id)
    }

    fn authorize_scripted(
        &self,
        snapshot: &CredentialSnapshot,
        request: &UploadRequestMeta,
        camera_id: &str,
        client_ip: IpAddr,
        network: &str,
    ) -> Result<AcceptedUpload, AuthRejection> {
        self.metrics.record_ip(IpCheck::Matched);

        let is_https = request
            .forwarded_proto
            .as_deref()
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
        if !is_https {
            return Err(AuthRejection::InsecureScriptedUpload);
        }

        let credential = snapshot.region(&self.scripted_region).ok_or_else(|| {
            AuthRejection::NoCredentialsConfigured {
                region: self.scripted_region.clone(),
            }
        })?;
        self.verify_credentials(credential, request.credentials.as_ref())?;

        let camera = snapshot
            .camera(camera_id)
            .ok_or(AuthRejection::UnknownCamera)?;

        if let Some(expected) = &camera.expected_network {
            if !expected.matches(client_ip) {
                tracing::debug!(
                    camera_id = %camera.id,
                    expected_network = %expected,
                    scripted_network = network,
                    client_ip = %client_ip,
                    "Scripted network overrides camera's expected network"
                );
            }
        }

        Ok(AcceptedUpload {
            camera: camera.clone(),
            client_ip,
            is_scripted: true,
        })
    }

    fn authorize_camera(
        &self,
        snapshot: &CredentialSnapshot,
        request: &UploadRequestMeta,
        camera_id: &str,
    ) -> Result<AcceptedUpload, AuthRejection> {
        let camera = snapshot
            .camera(camera_id)
            .ok_or(AuthRejection::UnknownCamera)?;

        let client_ip = self.check_network(camera, request.client_ip)?;

        let credential =
            snapshot
                .region(&camera.region)
                .ok_or_else(|| AuthRejection::NoCredentialsConfigured {
                    region: camera.region.clone(),
                })?;
        self.verify_credentials(credential, request.credentials.as_ref())?;

        Ok(AcceptedUpload {
            camera: camera.clone(),
            client_ip,
            is_scripted: false,
        })
    }

    /// An unknown client address only passes when the camera opts out of pinning.
    fn check_network(
        &self,
        camera: &CameraRecord,
        client_ip: Option<IpAddr>,
    ) -> Result<IpAddr, AuthRejection> {
        let Some(expected) = &camera.expected_network else {
            self.metrics.record_ip(IpCheck::Skipped);
            return Ok(client_ip.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)));
        };

        match client_ip {
            Some(ip) if expected.matches(ip) => {
                self.metrics.record_ip(IpCheck::Matched);
                Ok(ip)
            }
            _ => {
                self.metrics.record_ip(IpCheck::Mismatched);
                Err(AuthRejection::IpMismatch)
            }
        }
    }

    fn verify_credentials(
        &self,
        expected: &RegionCredential,
        presented: Option<&BasicCredentials>,
    ) -> Result<(), AuthRejection> {
        // Both fields are compared so timing does not reveal which one differed.
        let valid = presented.is_some_and(|creds| {
            secure_compare(&creds.username, &expected.username)
                & secure_compare(&creds.password, &expected.password)
        });

        self.metrics.record_credentials(valid);
        if valid {
            Ok(())
        } else {
            Err(AuthRejection::CredentialMismatch)
        }
    }
}
