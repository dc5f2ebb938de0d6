use serde::{Deserialize, Serialize};

use super::materializer::MaterializedPayload;

/// Answer to a pull request for pending shared content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingShareResponse {
    /// Local path of the shared file, if one was pending
    pub path: Option<String>,
    /// Whether there was pending content
    pub has_pending: bool,
}

impl From<Option<MaterializedPayload>> for PendingShareResponse {
    fn from(payload: Option<MaterializedPayload>) -> Self {
        match payload {
            Some(payload) => Self {
                path: Some(payload.local_path.to_string_lossy().into_owned()),
                has_pending: true,
            },
            None => Self::default(),
        }
    }
}

/// Pushed to an attached consumer when a share has been materialized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareReceivedPayload {
    pub path: String,
    /// Milliseconds since epoch at which the payload was materialized
    pub timestamp: i64,
}

impl From<&MaterializedPayload> for ShareReceivedPayload {
    fn from(payload: &MaterializedPayload) -> Self {
        Self {
            path: payload.local_path.to_string_lossy().into_owned(),
            timestamp: payload.created_at_millis(),
        }
    }
}
