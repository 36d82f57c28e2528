//! Kind-tagged wrapper used by stores, and the trait tying each concrete
//! resource type to its `Kind`.

use serde::{Deserialize, Serialize};

use crate::{
    email::EmailIntent,
    resource::{Kind, ObjectMeta, ResourceKey},
    sender::{Secret, SenderConfig},
};

/// Any object the store can hold, tagged by `kind` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Object {
    Email(EmailIntent),
    #[serde(rename = "EmailSenderConfig")]
    SenderConfig(SenderConfig),
    Secret(Secret),
}

impl Object {
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Email(_) => Kind::Email,
            Self::SenderConfig(_) => Kind::SenderConfig,
            Self::Secret(_) => Kind::Secret,
        }
    }

    #[must_use]
    pub const fn meta(&self) -> &ObjectMeta {
        match self {
            Self::Email(o) => &o.metadata,
            Self::SenderConfig(o) => &o.metadata,
            Self::Secret(o) => &o.metadata,
        }
    }

    pub const fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::Email(o) => &mut o.metadata,
            Self::SenderConfig(o) => &mut o.metadata,
            Self::Secret(o) => &mut o.metadata,
        }
    }

    #[must_use]
    pub fn key(&self) -> ResourceKey {
        self.meta().key()
    }

    /// Whether the user-owned part of two objects differs
    #[must_use]
    pub fn spec_differs(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Email(a), Self::Email(b)) => a.spec != b.spec,
            (Self::SenderConfig(a), Self::SenderConfig(b)) => a.spec != b.spec,
            (Self::Secret(a), Self::Secret(b)) => a.data != b.data,
            _ => true,
        }
    }

    /// Copy the status of `other` onto `self`, leaving spec and metadata alone.
    ///
    /// Returns `false` when the kinds differ or the kind has no status.
    pub fn take_status_from(&mut self, other: &Self) -> bool {
        match (self, other) {
            (Self::Email(a), Self::Email(b)) => {
                a.status = b.status.clone();
                true
            }
            (Self::SenderConfig(a), Self::SenderConfig(b)) => {
                a.status = b.status.clone();
                true
            }
            _ => false,
        }
    }
}

/// A concrete resource type that can be moved in and out of [`Object`]
pub trait Resource: Clone + Send + Sync + Into<Object> + TryFrom<Object, Error = Object> + 'static {
    const KIND: Kind;

    fn meta(&self) -> &ObjectMeta;
}

macro_rules! resource {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Object {
            fn from(value: $ty) -> Self {
                Self::$variant(value)
            }
        }

        impl TryFrom<Object> for $ty {
            type Error = Object;

            fn try_from(value: Object) -> Result<Self, Self::Error> {
                match value {
                    Object::$variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }

        impl Resource for $ty {
            const KIND: Kind = Kind::$variant;

            fn meta(&self) -> &ObjectMeta {
                &self.metadata
            }
        }
    };
}

resource!(EmailIntent, Email);
resource!(SenderConfig, SenderConfig);
resource!(Secret, Secret);
