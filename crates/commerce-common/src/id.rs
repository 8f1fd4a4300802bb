//! Identifier value objects
//!
//! Every entity id is an opaque string: non-empty, compared by value,
//! generated as a UUID-v4 string when the platform mints a new one.
//! Numeric ids from older revisions of the data model are gone; callers
//! never parse or order these.

use crate::error::{CommerceError, CommerceResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing identifier string; rejects empty input.
            pub fn new(id: impl Into<String>) -> CommerceResult<Self> {
                let id = id.into();
                if id.is_empty() {
                    return Err(CommerceError::Invalid(concat!(
                        stringify!($name),
                        " cannot be empty"
                    )
                    .into()));
                }
                Ok(Self(id))
            }

            /// Mint a fresh identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Store (tenant) identifier.
    StoreId
);
string_id!(
    /// User identifier, issued by the authentication layer.
    UserId
);
string_id!(
    /// Subscription plan identifier.
    PlanId
);
string_id!(
    /// Subscription identifier.
    SubscriptionId
);
string_id!(
    /// Product identifier.
    ProductId
);
string_id!(
    /// Customization option identifier.
    OptionId
);
string_id!(
    /// Order identifier.
    OrderId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert!(StoreId::new("").is_err());
        assert!(StoreId::new("shop1").is_ok());
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(OrderId::generate(), OrderId::generate());
    }

    #[test]
    fn serializes_as_bare_string() {
        let id = ProductId::new("p-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"p-1\"");
    }
}
