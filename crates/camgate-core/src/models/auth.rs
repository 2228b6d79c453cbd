use super::camera::CameraRecord;
use std::net::IpAddr;

/// Why an upload was rejected. Carries nothing beyond the reason, except the region
/// name operators need to fix a missing credential.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthRejection {
    #[error("upload filename is missing or malformed")]
    MalformedFilename,

    #[error("unknown camera")]
    UnknownCamera,

    #[error("client address does not match the camera's expected network")]
    IpMismatch,

    #[error("invalid credentials")]
    CredentialMismatch,

    #[error("no credentials configured for region {region}")]
    NoCredentialsConfigured { region: String },

    #[error("scripted uploads must use https")]
    InsecureScriptedUpload,
}

impl AuthRejection {
    pub const COUNT: usize = 6;

    /// Stable index used by per-reason counters.
    pub fn index(&self) -> usize {
        match self {
            AuthRejection::MalformedFilename => 0,
            AuthRejection::UnknownCamera => 1,
            AuthRejection::IpMismatch => 2,
            AuthRejection::CredentialMismatch => 3,
            AuthRejection::NoCredentialsConfigured { .. } => 4,
            AuthRejection::InsecureScriptedUpload => 5,
        }
    }

    pub fn code(&self) -> &'static str {
        Self::CODES[self.index()]
    }

    /// Message safe to return in production, without configuration details.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthRejection::MalformedFilename => "upload filename is missing or malformed",
            AuthRejection::InsecureScriptedUpload => "scripted uploads must use https",
            AuthRejection::NoCredentialsConfigured { .. } => {
                "no credentials configured for this camera's region"
            }
            AuthRejection::UnknownCamera
            | AuthRejection::IpMismatch
            | AuthRejection::CredentialMismatch => "upload not authorized",
        }
    }

    pub const CODES: [&'static str; Self::COUNT] = [
        "MALFORMED_FILENAME",
        "UNKNOWN_CAMERA",
        "IP_MISMATCH",
        "CREDENTIAL_MISMATCH",
        "NO_CREDENTIALS_CONFIGURED",
        "INSECURE_SCRIPTED_UPLOAD",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedUpload {
    pub camera: CameraRecord,
    pub client_ip: IpAddr,
    pub is_scripted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Accepted(AcceptedUpload),
    Rejected(AuthRejection),
}

impl AuthDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AuthDecision::Accepted(_))
    }

    pub fn rejection(&self) -> Option<&AuthRejection> {
        match self {
            AuthDecision::Rejected(reason) => Some(reason),
            AuthDecision::Accepted(_) => None,
        }
    }

    pub fn into_result(self) -> Result<AcceptedUpload, AuthRejection> {
        match self {
            AuthDecision::Accepted(accepted) => Ok(accepted),
            AuthDecision::Rejected(reason) => Err(reason),
        }
    }
}

/// Transport-independent description of one upload attempt.
#[derive(Debug, Clone, Default)]
pub struct UploadRequestMeta {
    pub client_ip: Option<IpAddr>,
    /// Scheme declared by the first proxy hop, lowercased.
    pub forwarded_proto: Option<String>,
    pub filename: Option<String>,
    pub credentials: Option<BasicCredentials>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
