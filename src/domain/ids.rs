//! Opaque string identifiers supplied by clients.
//!
//! [`UserId`] originates from the authentication collaborator and
//! [`RoomId`] from the conversation store. The relay never validates
//! either; it only compares them for equality.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Durable user identity as announced by `user_connected`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct UserId(String);

/// Conversation identifier used as a fan-out scope.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct RoomId(String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` for the empty identifier.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(UserId);
string_id!(RoomId);
