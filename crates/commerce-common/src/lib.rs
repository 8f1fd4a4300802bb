//! OpenCommerce Common - Shared types for the multi-tenant commerce core
//!
//! This crate provides the vocabulary every other crate speaks:
//! - Opaque string identifiers (value objects, validated on construction)
//! - The platform-wide error taxonomy
//! - Money as integer minor currency units
//!
//! Nothing in here touches storage or the payment processor.

#![warn(missing_docs)]

pub mod error;
pub mod id;

pub use error::{CommerceError, CommerceResult, ErrorKind};
pub use id::{OptionId, OrderId, PlanId, ProductId, StoreId, SubscriptionId, UserId};

use serde::{Deserialize, Serialize};

/// Money amount in minor currency units (cents).
///
/// All pricing arithmetic is exact-integer; floating point never enters a
/// money path.
pub type Cents = i64;

/// Caller role attached by the (out-of-scope) authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Platform administrator; bypasses subscription gating.
    Admin,
    /// Store owner/operator.
    Merchant,
    /// Storefront customer.
    Customer,
}

/// Resource classes governed by plan quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// Live products in the store catalog.
    Products,
    /// Orders placed within the current billing period.
    Orders,
    /// Estimated media storage, in megabytes.
    Storage,
}

impl std::fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Products => write!(f, "products"),
            Self::Orders => write!(f, "orders"),
            Self::Storage => write!(f, "storage"),
        }
    }
}
