use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// Validates an opaque document id.
///
/// Ids are path segments in the document store, so they cannot be empty,
/// blank, or contain `/`.
pub fn validate_id(raw: &str) -> Result<&str, ReconcileError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() != raw.len() || raw.contains('/') {
        return Err(ReconcileError::InvalidEntityId(raw.to_string()));
    }
    Ok(raw)
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Result<Self, ReconcileError> {
                let raw = raw.into();
                validate_id(&raw)?;
                Ok(Self(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ReconcileError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ReconcileError;

            fn try_from(raw: &str) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Id of a likeable entity (product, listing).
    EntityId
);
string_id!(
    /// Stable user id from the authentication provider.
    UserId
);
string_id!(
    /// Id of a seller or brand that can be followed.
    SellerId
);
