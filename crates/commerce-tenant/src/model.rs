//! Store (tenant) data model

use chrono::{DateTime, Utc};
use commerce_billing::{ConnectedAccountStatus, PlanFeatures, PlanType, SubscriptionStatus};
use commerce_common::{StoreId, SubscriptionId, UserId};
use serde::{Deserialize, Serialize};

/// A store: the unit of data isolation.
///
/// Stores are soft-deleted only (deactivated with the subdomain
/// scrambled) so orders and payout history stay reachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    /// Subdomain under the platform's base domain, unique across stores.
    pub subdomain: Option<String>,
    /// Optional fully-qualified custom domain, unique across stores.
    pub custom_domain: Option<String>,
    pub owner_id: UserId,
    pub is_active: bool,
    pub setup_completed: bool,
    /// Connected payout account, populated by the payments onboarding flow.
    pub processor_account_id: Option<String>,
    pub processor_account_status: Option<ConnectedAccountStatus>,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    /// New active store awaiting setup.
    pub fn new(name: &str, subdomain: &str, owner_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: StoreId::generate(),
            name: name.to_string(),
            subdomain: Some(subdomain.to_string()),
            custom_domain: None,
            owner_id,
            is_active: true,
            setup_completed: false,
            processor_account_id: None,
            processor_account_status: None,
            charges_enabled: false,
            payouts_enabled: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The subscription view attached to a resolved tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub id: SubscriptionId,
    pub status: SubscriptionStatus,
    pub plan_type: PlanType,
    pub features: PlanFeatures,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

/// What the resolver hands downstream: the store plus a read-only
/// snapshot of its current subscription, if it has one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    pub store: Store,
    pub subscription: Option<SubscriptionSnapshot>,
}

impl TenantContext {
    /// The store id, for callers that only need scoping.
    pub fn store_id(&self) -> &StoreId {
        &self.store.id
    }

    /// Plan features, when a subscription is attached.
    pub fn features(&self) -> Option<&PlanFeatures> {
        self.subscription.as_ref().map(|s| &s.features)
    }
}
