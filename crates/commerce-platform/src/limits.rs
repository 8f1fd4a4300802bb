//! Plan limit engine
//!
//! Read-only quota decisions against live counts. Checks are advisory:
//! they are deliberately not linearized with order commits, so two
//! requests racing the same quota can both pass and overshoot it by one.
//! That is accepted: quotas are a business constraint, not a safety
//! invariant. Stock, the hard invariant, is enforced inside the commit
//! engine's transaction instead.

use commerce_common::{CommerceError, CommerceResult, ResourceClass};
use commerce_orders::{OrderEngine, ProductCatalog};
use commerce_tenant::TenantContext;
use std::sync::Arc;

/// Documented approximation: storage usage is estimated as a flat
/// 512 KB per product photo, not exact bytes.
pub const STORAGE_PER_PHOTO_KB: u64 = 512;

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitDecision {
    /// Under quota (or the quota is unlimited).
    Allow,
    /// Over quota; carries what the caller needs to explain itself.
    Deny {
        /// Usage counted at check time.
        current: u64,
        /// The plan's quota.
        limit: i64,
    },
}

impl LimitDecision {
    /// Convenience for gates that only need a boolean.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Plan limit engine
pub struct LimitEngine {
    catalog: Arc<ProductCatalog>,
    orders: Arc<OrderEngine>,
}

impl LimitEngine {
    pub fn new(catalog: Arc<ProductCatalog>, orders: Arc<OrderEngine>) -> Self {
        Self { catalog, orders }
    }

    /// Check whether adding `requested_delta` of a resource stays within
    /// the tenant's plan. Delta is a row count for products and orders,
    /// and megabytes for storage.
    ///
    /// A quota of `-1` always allows without counting anything.
    pub fn check_limit(
        &self,
        ctx: &TenantContext,
        resource: ResourceClass,
        requested_delta: u64,
    ) -> CommerceResult<LimitDecision> {
        let subscription = ctx
            .subscription
            .as_ref()
            .ok_or(CommerceError::SubscriptionRequired)?;
        let features = &subscription.features;

        let limit = match resource {
            ResourceClass::Products => features.max_products,
            ResourceClass::Orders => features.max_orders,
            ResourceClass::Storage => features.max_storage_mb,
        };
        if limit < 0 {
            return Ok(LimitDecision::Allow);
        }

        let current = match resource {
            ResourceClass::Products => self.catalog.count_for_store(ctx.store_id()),
            ResourceClass::Orders => self.orders.count_in_window(
                ctx.store_id(),
                subscription.current_period_start,
                subscription.current_period_end,
            ),
            ResourceClass::Storage => {
                self.catalog.photo_count_for_store(ctx.store_id()) * STORAGE_PER_PHOTO_KB / 1024
            }
        };

        if current + requested_delta > limit as u64 {
            Ok(LimitDecision::Deny { current, limit })
        } else {
            Ok(LimitDecision::Allow)
        }
    }

    /// Like [`check_limit`](Self::check_limit) but turns a denial into a
    /// [`CommerceError::LimitExceeded`].
    pub fn ensure(
        &self,
        ctx: &TenantContext,
        resource: ResourceClass,
        requested_delta: u64,
    ) -> CommerceResult<()> {
        match self.check_limit(ctx, resource, requested_delta)? {
            LimitDecision::Allow => Ok(()),
            LimitDecision::Deny { current, limit } => Err(CommerceError::LimitExceeded {
                resource,
                current,
                limit,
            }),
        }
    }
}
