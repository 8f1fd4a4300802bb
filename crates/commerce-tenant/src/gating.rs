//! Subscription and feature gating
//!
//! Pure checks over a resolved [`TenantContext`]. Administrators bypass
//! subscription gating; everyone else needs a counts-as-active
//! subscription, and premium capabilities additionally need the plan's
//! feature flag.

use crate::model::TenantContext;
use commerce_billing::PlanFeatures;
use commerce_common::{CommerceError, CommerceResult, Role};
use serde::{Deserialize, Serialize};

/// Plan capability flags that can gate an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    CustomDomain,
    PremiumThemes,
    Analytics,
    ApiAccess,
    PrioritySupport,
}

impl Feature {
    fn enabled_in(&self, features: &PlanFeatures) -> bool {
        match self {
            Self::CustomDomain => features.custom_domain,
            Self::PremiumThemes => features.premium_themes,
            Self::Analytics => features.analytics,
            Self::ApiAccess => features.api_access,
            Self::PrioritySupport => features.priority_support,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::CustomDomain => "custom_domain",
            Self::PremiumThemes => "premium_themes",
            Self::Analytics => "analytics",
            Self::ApiAccess => "api_access",
            Self::PrioritySupport => "priority_support",
        }
    }
}

/// Require a counts-as-active subscription (ACTIVE or TRIALING).
///
/// Distinguishes "no subscription on file" from "subscription exists but
/// is inactive", so callers can render the right recovery path.
pub fn require_active_subscription(ctx: &TenantContext, role: Role) -> CommerceResult<()> {
    if role == Role::Admin {
        return Ok(());
    }
    let subscription = ctx
        .subscription
        .as_ref()
        .ok_or(CommerceError::SubscriptionRequired)?;
    if !subscription.status.counts_as_active() {
        return Err(CommerceError::SubscriptionInactive {
            status: subscription.status.to_string(),
        });
    }
    Ok(())
}

/// Require a plan feature flag on top of an active subscription.
pub fn require_feature(ctx: &TenantContext, feature: Feature) -> CommerceResult<()> {
    let subscription = ctx
        .subscription
        .as_ref()
        .ok_or(CommerceError::SubscriptionRequired)?;
    if !feature.enabled_in(&subscription.features) {
        return Err(CommerceError::FeatureNotAvailable {
            feature: feature.name().to_string(),
            plan: subscription.plan_type.to_string(),
        });
    }
    Ok(())
}
