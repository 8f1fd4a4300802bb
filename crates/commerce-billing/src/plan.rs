//! Subscription plan catalog
//!
//! Plans are immutable catalog entries: administrators create and edit
//! them, nothing else ever mutates one. The feature bundle is a closed
//! struct validated at creation time; a quota of `-1` means unlimited.

use commerce_common::{Cents, CommerceError, CommerceResult, PlanId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Quota value meaning "no limit".
pub const UNLIMITED: i64 = -1;

/// Plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "FREE"),
            Self::Basic => write!(f, "BASIC"),
            Self::Pro => write!(f, "PRO"),
            Self::Enterprise => write!(f, "ENTERPRISE"),
        }
    }
}

/// Billing interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanInterval {
    Monthly,
    Yearly,
}

impl PlanInterval {
    /// Length of one billing period in days.
    pub fn days(&self) -> i64 {
        match self {
            Self::Monthly => 30,
            Self::Yearly => 365,
        }
    }
}

/// Closed feature/quota bundle carried by every plan.
///
/// Replaces the untyped `features` blob of earlier data-model revisions;
/// every field is named, and unknown keys are a deserialization error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFeatures {
    /// Max live products per store; `-1` = unlimited.
    pub max_products: i64,
    /// Max orders per billing period; `-1` = unlimited.
    pub max_orders: i64,
    /// Storage quota in megabytes; `-1` = unlimited.
    pub max_storage_mb: i64,
    /// May attach a custom domain.
    pub custom_domain: bool,
    /// May use premium storefront themes.
    pub premium_themes: bool,
    /// Analytics dashboard enabled.
    pub analytics: bool,
    /// Programmatic API access enabled.
    pub api_access: bool,
    /// Priority support channel.
    pub priority_support: bool,
}

impl PlanFeatures {
    /// Validate quota fields; called when an administrator creates or
    /// edits a plan.
    pub fn validate(&self) -> CommerceResult<()> {
        for (name, value) in [
            ("max_products", self.max_products),
            ("max_orders", self.max_orders),
            ("max_storage_mb", self.max_storage_mb),
        ] {
            if value < UNLIMITED {
                return Err(CommerceError::Invalid(format!(
                    "{name} must be -1 (unlimited) or a non-negative count, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Immutable plan catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: PlanId,
    pub name: String,
    pub description: String,
    pub plan_type: PlanType,
    pub interval: PlanInterval,
    /// Price per interval in minor currency units.
    pub price: Cents,
    /// Processor price id, absent for the free tier.
    pub processor_price_id: Option<String>,
    /// Processor product id, absent for the free tier.
    pub processor_product_id: Option<String>,
    pub features: PlanFeatures,
    pub is_active: bool,
}

/// Fields an administrator may edit on an existing plan.
#[derive(Debug, Clone, Default)]
pub struct PlanUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Cents>,
    pub features: Option<PlanFeatures>,
    pub is_active: Option<bool>,
}

/// Plan catalog
pub struct PlanCatalog {
    plans: Arc<RwLock<HashMap<PlanId, SubscriptionPlan>>>,
}

impl PlanCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self {
            plans: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Catalog pre-seeded with the standard tiers.
    pub fn with_default_plans() -> Self {
        let catalog = Self::new();
        catalog.load_default_plans();
        catalog
    }

    fn load_default_plans(&self) {
        let mut plans = self.plans.write();

        let mut insert = |id: &str,
                          name: &str,
                          description: &str,
                          plan_type: PlanType,
                          interval: PlanInterval,
                          price: Cents,
                          price_id: Option<&str>,
                          product_id: Option<&str>,
                          features: PlanFeatures| {
            let id = PlanId::new(id).expect("static plan id");
            plans.insert(
                id.clone(),
                SubscriptionPlan {
                    id,
                    name: name.into(),
                    description: description.into(),
                    plan_type,
                    interval,
                    price,
                    processor_price_id: price_id.map(String::from),
                    processor_product_id: product_id.map(String::from),
                    features,
                    is_active: true,
                },
            );
        };

        let free = PlanFeatures {
            max_products: 10,
            max_orders: 50,
            max_storage_mb: 100,
            custom_domain: false,
            premium_themes: false,
            analytics: false,
            api_access: false,
            priority_support: false,
        };
        let basic = PlanFeatures {
            max_products: 100,
            max_orders: 500,
            max_storage_mb: 1000,
            custom_domain: false,
            premium_themes: true,
            analytics: true,
            api_access: false,
            priority_support: false,
        };
        let pro = PlanFeatures {
            max_products: 500,
            max_orders: 2000,
            max_storage_mb: 5000,
            custom_domain: true,
            premium_themes: true,
            analytics: true,
            api_access: true,
            priority_support: true,
        };
        let enterprise = PlanFeatures {
            max_products: UNLIMITED,
            max_orders: UNLIMITED,
            max_storage_mb: UNLIMITED,
            custom_domain: true,
            premium_themes: true,
            analytics: true,
            api_access: true,
            priority_support: true,
        };

        insert(
            "free-monthly",
            "Free",
            "Starter plan for trying the platform",
            PlanType::Free,
            PlanInterval::Monthly,
            0,
            None,
            None,
            free,
        );
        insert(
            "basic-monthly",
            "Basic",
            "For small shops getting started",
            PlanType::Basic,
            PlanInterval::Monthly,
            2900,
            Some("price_basic_monthly"),
            Some("prod_basic"),
            basic.clone(),
        );
        insert(
            "pro-monthly",
            "Pro",
            "For growing businesses",
            PlanType::Pro,
            PlanInterval::Monthly,
            5900,
            Some("price_pro_monthly"),
            Some("prod_pro"),
            pro.clone(),
        );
        insert(
            "enterprise-monthly",
            "Enterprise",
            "For large operations",
            PlanType::Enterprise,
            PlanInterval::Monthly,
            9900,
            Some("price_enterprise_monthly"),
            Some("prod_enterprise"),
            enterprise.clone(),
        );

        // Yearly tiers: twelve months for the price of ten.
        insert(
            "basic-yearly",
            "Basic (yearly)",
            "Basic plan billed yearly",
            PlanType::Basic,
            PlanInterval::Yearly,
            29000,
            Some("price_basic_yearly"),
            Some("prod_basic"),
            basic,
        );
        insert(
            "pro-yearly",
            "Pro (yearly)",
            "Pro plan billed yearly",
            PlanType::Pro,
            PlanInterval::Yearly,
            59000,
            Some("price_pro_yearly"),
            Some("prod_pro"),
            pro,
        );
        insert(
            "enterprise-yearly",
            "Enterprise (yearly)",
            "Enterprise plan billed yearly",
            PlanType::Enterprise,
            PlanInterval::Yearly,
            99000,
            Some("price_enterprise_yearly"),
            Some("prod_enterprise"),
            enterprise,
        );
    }

    /// Register a new plan (administrators only).
    pub fn create_plan(&self, plan: SubscriptionPlan) -> CommerceResult<SubscriptionPlan> {
        plan.features.validate()?;
        let mut plans = self.plans.write();
        if plans.contains_key(&plan.id) {
            return Err(CommerceError::AlreadyInUse("plan id"));
        }
        plans.insert(plan.id.clone(), plan.clone());
        Ok(plan)
    }

    /// Edit an existing plan (administrators only).
    pub fn update_plan(&self, id: &PlanId, update: PlanUpdate) -> CommerceResult<SubscriptionPlan> {
        if let Some(features) = &update.features {
            features.validate()?;
        }
        let mut plans = self.plans.write();
        let plan = plans
            .get_mut(id)
            .ok_or_else(|| CommerceError::PlanNotFound(id.clone()))?;

        if let Some(name) = update.name {
            plan.name = name;
        }
        if let Some(description) = update.description {
            plan.description = description;
        }
        if let Some(price) = update.price {
            plan.price = price;
        }
        if let Some(features) = update.features {
            plan.features = features;
        }
        if let Some(is_active) = update.is_active {
            plan.is_active = is_active;
        }
        Ok(plan.clone())
    }

    /// Get plan by id.
    pub fn get(&self, id: &PlanId) -> Option<SubscriptionPlan> {
        self.plans.read().get(id).cloned()
    }

    /// Find the active plan for a tier and interval (signup path).
    pub fn find(&self, plan_type: PlanType, interval: PlanInterval) -> Option<SubscriptionPlan> {
        self.plans
            .read()
            .values()
            .find(|p| p.is_active && p.plan_type == plan_type && p.interval == interval)
            .cloned()
    }

    /// Active plans, ordered by tier then price.
    pub fn list_active(&self) -> Vec<SubscriptionPlan> {
        let mut plans: Vec<_> = self
            .plans
            .read()
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        plans.sort_by_key(|p| (p.plan_type as u8, p.price));
        plans
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::with_default_plans()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_matches_seed() {
        let catalog = PlanCatalog::with_default_plans();
        let plans = catalog.list_active();
        assert_eq!(plans.len(), 7);

        let free = catalog.find(PlanType::Free, PlanInterval::Monthly).unwrap();
        assert_eq!(free.price, 0);
        assert_eq!(free.features.max_products, 10);
        assert_eq!(free.features.max_orders, 50);
        assert!(!free.features.custom_domain);

        let enterprise = catalog
            .find(PlanType::Enterprise, PlanInterval::Monthly)
            .unwrap();
        assert_eq!(enterprise.features.max_products, UNLIMITED);
        assert!(enterprise.features.priority_support);
    }

    #[test]
    fn yearly_price_is_ten_months() {
        let catalog = PlanCatalog::with_default_plans();
        let monthly = catalog.find(PlanType::Pro, PlanInterval::Monthly).unwrap();
        let yearly = catalog.find(PlanType::Pro, PlanInterval::Yearly).unwrap();
        assert_eq!(yearly.price, monthly.price * 10);
    }

    #[test]
    fn create_rejects_bad_quota() {
        let catalog = PlanCatalog::new();
        let mut plan = PlanCatalog::with_default_plans()
            .find(PlanType::Basic, PlanInterval::Monthly)
            .unwrap();
        plan.features.max_products = -2;
        assert!(catalog.create_plan(plan).is_err());
    }

    #[test]
    fn features_reject_unknown_keys() {
        let raw = r#"{
            "max_products": 1, "max_orders": 1, "max_storage_mb": 1,
            "custom_domain": false, "premium_themes": false, "analytics": false,
            "api_access": false, "priority_support": false, "surprise": true
        }"#;
        assert!(serde_json::from_str::<PlanFeatures>(raw).is_err());
    }
}
