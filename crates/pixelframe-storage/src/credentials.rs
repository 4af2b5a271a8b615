//! Short-lived upload credentials issued by the token service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Temporary access keys for the storage destination.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessCredentials {
    #[serde(alias = "accessKeyId")]
    pub access_key_id: String,
    #[serde(alias = "secretAccessKey")]
    pub secret_access_key: String,
    #[serde(default, alias = "sessionToken")]
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AccessCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Destination and access for one file upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCredentials {
    pub bucket_name: String,
    pub region: String,
    /// Key prefix every object of this upload is written under.
    #[serde(default)]
    pub path: String,
    pub credentials: AccessCredentials,
    /// Any further fields the token service returns.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}
