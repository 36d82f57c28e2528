//! Object identity and metadata shared by every stored kind.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The resource kinds the controller knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    Email,
    #[serde(rename = "EmailSenderConfig")]
    SenderConfig,
    Secret,
}

impl Kind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::SenderConfig => "EmailSenderConfig",
            Self::Secret => "Secret",
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown resource kind '{0}'")]
pub struct UnknownKind(pub String);

impl std::str::FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Email" => Ok(Self::Email),
            "EmailSenderConfig" => Ok(Self::SenderConfig),
            "Secret" => Ok(Self::Secret),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Namespace + name identity of a single object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Metadata carried by every stored object.
///
/// `resource_version` changes on every write and is the optimistic
/// concurrency token. `generation` only changes when the spec does, which is
/// what lets status writes go unnoticed by watchers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default)]
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Fill in the server-assigned fields for a freshly created object
    pub fn initialise(&mut self) {
        self.uid = ulid::Ulid::new().to_string();
        self.resource_version = 1;
        self.generation = 1;
        self.creation_timestamp = Some(Utc::now());
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_key_display() {
        let key = ResourceKey::new("default", "sample-email");
        assert_eq!(key.to_string(), "default/sample-email");
    }

    #[test]
    fn test_kind_round_trip_names() {
        for kind in [Kind::Email, Kind::SenderConfig, Kind::Secret] {
            assert_eq!(kind.as_str().parse::<Kind>(), Ok(kind));
        }
        assert!("Pod".parse::<Kind>().is_err());
    }

    #[test]
    fn test_initialise_assigns_server_fields() {
        let mut meta = ObjectMeta::new("default", "x");
        meta.initialise();

        assert_eq!(meta.resource_version, 1);
        assert_eq!(meta.generation, 1);
        assert!(!meta.uid.is_empty());
        assert!(meta.creation_timestamp.is_some());
    }

    #[test]
    fn test_namespace_defaults_when_missing() {
        let meta: ObjectMeta = serde_json::from_str(r#"{"name":"x"}"#).expect("valid metadata");
        assert_eq!(meta.namespace, "default");
        assert_eq!(meta.resource_version, 0);
    }
}
