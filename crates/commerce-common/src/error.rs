//! Error types for the commerce core

use crate::id::{OptionId, OrderId, PlanId, ProductId, StoreId};
use crate::ResourceClass;
use thiserror::Error;

/// Platform-wide error type.
///
/// Variants carry enough structure for the caller to act (offending id,
/// current vs. limit) but never another tenant's data: lookups that miss,
/// hit an unavailable row, or hit a row owned by a different store all
/// collapse into the same not-found variant.
#[derive(Debug, Clone, Error)]
pub enum CommerceError {
    /// No store matched the request (or it belongs to someone else).
    #[error("store not found")]
    TenantNotFound,

    /// The store exists but has been deactivated.
    #[error("store {0} is deactivated")]
    TenantInactive(StoreId),

    /// The store has no subscription on file.
    #[error("no subscription on file")]
    SubscriptionRequired,

    /// The subscription exists but does not grant access.
    #[error("subscription inactive (status {status})")]
    SubscriptionInactive {
        /// Processor-style status name, e.g. `past_due`.
        status: String,
    },

    /// No subscription row matched.
    #[error("subscription not found")]
    SubscriptionNotFound,

    /// No plan row matched.
    #[error("plan {0} not found")]
    PlanNotFound(PlanId),

    /// Product missing, unavailable, or owned by a different store.
    #[error("product {product_id} not found or unavailable")]
    ProductUnavailable {
        /// The requested product id.
        product_id: ProductId,
    },

    /// A customization option referenced by an order item does not exist.
    #[error("customization option {option_id} not found")]
    CustomizationNotFound {
        /// The requested option id.
        option_id: OptionId,
    },

    /// No order row matched.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The plan's feature bundle does not include this capability.
    #[error("feature '{feature}' not available on plan {plan}")]
    FeatureNotAvailable {
        /// Feature flag name.
        feature: String,
        /// Plan type the tenant is on.
        plan: String,
    },

    /// A plan quota would be exceeded.
    #[error("{resource} limit reached ({current}/{limit})")]
    LimitExceeded {
        /// Which quota was hit.
        resource: ResourceClass,
        /// Usage counted at check time.
        current: u64,
        /// The plan's quota.
        limit: i64,
    },

    /// Stock dropped below the requested quantity inside the commit
    /// transaction. Retryable: the client may resubmit.
    #[error("insufficient stock for product {product_id} (requested {requested}, available {available})")]
    InsufficientStock {
        /// Product whose stock ran out.
        product_id: ProductId,
        /// Quantity the order asked for.
        requested: u32,
        /// Stock remaining at commit time.
        available: u32,
    },

    /// Client-submitted customization price disagrees with the catalog.
    #[error("price mismatch on customization option {option_id}")]
    PriceMismatch {
        /// Option whose price was tampered with or stale.
        option_id: OptionId,
    },

    /// Zero or nonsense quantity on an order line.
    #[error("invalid quantity for product {product_id}")]
    InvalidQuantity {
        /// Product on the offending line.
        product_id: ProductId,
    },

    /// A status string outside the closed enum.
    #[error("unknown status value '{0}'")]
    UnknownStatus(String),

    /// A uniqueness rule was violated (subdomain, custom domain, one store
    /// per owner).
    #[error("{0} already in use")]
    AlreadyInUse(&'static str),

    /// Generic validation failure.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// Payment processor call failed.
    #[error("payment processor error: {0}")]
    Upstream(String),

    /// Payment processor call exceeded its deadline; the unit of work
    /// fails closed.
    #[error("payment processor timed out")]
    UpstreamTimeout,
}

/// Coarse classification used by transport layers for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 404-class: the resource does not exist for this caller.
    NotFound,
    /// 403-class: exists, but access is switched off.
    Inactive,
    /// 400-class: the request itself is malformed or inconsistent.
    Invalid,
    /// 403-class: a plan quota or capability denies the action.
    LimitExceeded,
    /// 409-class: lost a race inside the commit transaction; retryable.
    Conflict,
    /// 502-class: an external collaborator failed or timed out.
    Upstream,
}

impl CommerceError {
    /// Map the variant onto the error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TenantNotFound
            | Self::SubscriptionNotFound
            | Self::PlanNotFound(_)
            | Self::ProductUnavailable { .. }
            | Self::CustomizationNotFound { .. }
            | Self::OrderNotFound(_) => ErrorKind::NotFound,
            Self::TenantInactive(_)
            | Self::SubscriptionRequired
            | Self::SubscriptionInactive { .. } => ErrorKind::Inactive,
            Self::PriceMismatch { .. }
            | Self::InvalidQuantity { .. }
            | Self::UnknownStatus(_)
            | Self::AlreadyInUse(_)
            | Self::Invalid(_) => ErrorKind::Invalid,
            Self::FeatureNotAvailable { .. } | Self::LimitExceeded { .. } => {
                ErrorKind::LimitExceeded
            }
            Self::InsufficientStock { .. } => ErrorKind::Conflict,
            Self::Upstream(_) | Self::UpstreamTimeout => ErrorKind::Upstream,
        }
    }

    /// Whether the caller may safely resubmit the same request.
    pub fn retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

/// Result alias used across the platform.
pub type CommerceResult<T> = Result<T, CommerceError>;
