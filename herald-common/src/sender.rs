//! Sender configuration and the credential material it points at.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resource::ObjectMeta;

/// Named sender configuration referenced by `Email.spec.senderConfigRef`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderConfig {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: SenderConfigSpec,
    #[serde(default)]
    pub status: SenderConfigStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderConfigSpec {
    /// Vendor selector used when the email does not name one
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    /// Name of the `Secret` holding `api-token` and `from-email`
    #[serde(default)]
    pub api_token_secret_ref: String,
    /// Display name for the `from` mailbox
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
}

/// Advisory status; cleared whenever the credential resolves
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderConfigStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Externally managed credential object.
///
/// Values are base64 text, exactly as they arrive from the platform.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("metadata", &self.metadata)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Secret {
    pub const API_TOKEN: &'static str = "api-token";
    pub const FROM_EMAIL: &'static str = "from-email";
}

/// Decoded credential, alive for a single reconcile
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub auth_token: String,
    pub from_address: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("auth_token", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}
