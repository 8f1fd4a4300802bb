//! OpenCommerce Platform
//!
//! Wires the tenant, billing and order engines into one platform and
//! owns the cross-cutting pieces: plan limit checks and usage
//! reconciliation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        COMMERCE PLATFORM                         │
//! │                                                                  │
//! │  request ─► TenantResolver ─► gating ─► LimitEngine ─► OrderEngine│
//! │                  │                │          │             │     │
//! │            TenantRegistry   Subscription  Product       Orders   │
//! │                             Manager ◄──┐  Catalog                │
//! │                                        │                         │
//! │  processor webhooks ───────────────────┘   (status is processor- │
//! │                                             driven, read by all) │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![allow(dead_code)]

pub mod limits;
pub mod usage;

pub use limits::{LimitDecision, LimitEngine, STORAGE_PER_PHOTO_KB};
pub use usage::{PlanUsage, UsageLedger, UsageStats};

use commerce_billing::{
    EventOutcome, PlanCatalog, PlanInterval, PlanType, Subscription, SubscriptionManager,
    WebhookEvent,
};
use commerce_common::{CommerceError, CommerceResult, ResourceClass, Role, UserId};
use commerce_orders::{NewProduct, Order, OrderEngine, Product, ProductCatalog, RequestedItem};
use commerce_tenant::{
    gating, ResolverConfig, Store, TenantContext, TenantRegistry, TenantResolver,
    TokenRevocationList,
};
use std::sync::Arc;

/// The assembled platform. Every component receives its collaborators
/// explicitly; there is no ambient global state.
pub struct Platform {
    pub plans: Arc<PlanCatalog>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub tenants: Arc<TenantRegistry>,
    pub catalog: Arc<ProductCatalog>,
    pub orders: Arc<OrderEngine>,
    pub resolver: TenantResolver,
    pub limits: LimitEngine,
    pub usage: UsageLedger,
    pub revoked_tokens: TokenRevocationList,
}

impl Platform {
    /// Assemble a platform with the default plan catalog.
    pub fn new(resolver_config: ResolverConfig) -> Self {
        let plans = Arc::new(PlanCatalog::with_default_plans());
        let subscriptions = Arc::new(SubscriptionManager::new());
        let tenants = Arc::new(TenantRegistry::new());
        let catalog = Arc::new(ProductCatalog::new());
        let orders = Arc::new(OrderEngine::new((*catalog).clone()));

        let resolver = TenantResolver::new(
            tenants.clone(),
            subscriptions.clone(),
            plans.clone(),
            resolver_config,
        );
        let limits = LimitEngine::new(catalog.clone(), orders.clone());
        let usage = UsageLedger::new(
            catalog.clone(),
            orders.clone(),
            subscriptions.clone(),
            plans.clone(),
        );

        Self {
            plans,
            subscriptions,
            tenants,
            catalog,
            orders,
            resolver,
            limits,
            usage,
            revoked_tokens: TokenRevocationList::new(),
        }
    }

    /// Create a store with its signup subscription and a zeroed usage
    /// snapshot.
    pub fn signup(
        &self,
        store_name: &str,
        subdomain: &str,
        owner_id: UserId,
        tier: PlanType,
        interval: PlanInterval,
    ) -> CommerceResult<(Store, Subscription)> {
        let plan = self.plans.find(tier, interval).ok_or_else(|| {
            CommerceError::Invalid(format!("no active {tier} plan for that interval"))
        })?;
        let store = self.tenants.create(store_name, subdomain, owner_id)?;
        let subscription = self.subscriptions.create_for_signup(&store.id, &plan)?;
        self.usage.init_for_store(&store.id);
        Ok((store, subscription))
    }

    /// Resolve a request to its tenant context.
    pub fn resolve(
        &self,
        host: Option<&str>,
        tenant_header: Option<&str>,
        dev_override: Option<&str>,
    ) -> CommerceResult<TenantContext> {
        self.resolver.resolve(host, tenant_header, dev_override)
    }

    /// Decode and apply one processor webhook delivery.
    pub fn handle_webhook(&self, raw: &str) -> CommerceResult<EventOutcome> {
        let event = WebhookEvent::from_json(raw)?;
        self.subscriptions.apply_event(&event, &self.plans)
    }

    /// Create a product behind subscription gating and the product quota.
    pub fn create_product(
        &self,
        ctx: &TenantContext,
        role: Role,
        input: NewProduct,
    ) -> CommerceResult<Product> {
        gating::require_active_subscription(ctx, role)?;
        self.limits.ensure(ctx, ResourceClass::Products, 1)?;
        self.catalog.create_product(ctx.store_id(), input)
    }

    /// Place an order: subscription gate, advisory order quota, then the
    /// atomic commit.
    pub fn place_order(
        &self,
        ctx: &TenantContext,
        user_id: &UserId,
        items: &[RequestedItem],
        payment_method: &str,
        delivery_address: Option<String>,
    ) -> CommerceResult<Order> {
        gating::require_active_subscription(ctx, Role::Customer)?;
        self.limits.ensure(ctx, ResourceClass::Orders, 1)?;
        self.orders.commit_order(
            ctx.store_id(),
            user_id,
            items,
            payment_method,
            delivery_address,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commerce_common::{PlanId, ProductId};
    use commerce_orders::{ProductType, RequestedCustomization};

    fn platform() -> Platform {
        Platform::new(ResolverConfig::for_base_domain("example.com"))
    }

    fn physical(name: &str, price: i64, stock: u32) -> NewProduct {
        NewProduct {
            name: name.into(),
            description: String::new(),
            price,
            product_type: ProductType::Physical,
            stock: Some(stock),
            category: None,
            photos: vec![],
        }
    }

    fn signup_basic(platform: &Platform, subdomain: &str, owner: &str) -> TenantContext {
        platform
            .signup(
                subdomain,
                subdomain,
                UserId::new(owner).unwrap(),
                PlanType::Basic,
                PlanInterval::Monthly,
            )
            .unwrap();
        platform
            .resolve(Some(&format!("{subdomain}.example.com")), None, None)
            .unwrap()
    }

    #[test]
    fn order_flow_derives_totals_from_catalog() {
        let platform = platform();
        let ctx = signup_basic(&platform, "shop1", "u1");
        let buyer = UserId::new("buyer").unwrap();

        let product = platform
            .create_product(&ctx, Role::Merchant, physical("Mug", 2500, 10))
            .unwrap();
        let option = platform
            .catalog
            .add_option(ctx.store_id(), &product.id, "Engraving", 700)
            .unwrap();

        let order = platform
            .place_order(
                &ctx,
                &buyer,
                &[RequestedItem {
                    product_id: product.id.clone(),
                    quantity: 2,
                    customizations: vec![RequestedCustomization {
                        option_id: option.id,
                        quantity: 1,
                        price: 700,
                    }],
                }],
                "card",
                Some("1 Harbor St".into()),
            )
            .unwrap();

        assert_eq!(order.total, 2 * 2500 + 700);
        assert_eq!(
            platform.catalog.get(ctx.store_id(), &product.id).unwrap().stock,
            Some(8)
        );
    }

    #[test]
    fn tampered_price_leaves_nothing_behind() {
        let platform = platform();
        let ctx = signup_basic(&platform, "shop1", "u1");
        let buyer = UserId::new("buyer").unwrap();

        let product = platform
            .create_product(&ctx, Role::Merchant, physical("Mug", 2500, 10))
            .unwrap();
        let option = platform
            .catalog
            .add_option(ctx.store_id(), &product.id, "Engraving", 700)
            .unwrap();

        let err = platform
            .place_order(
                &ctx,
                &buyer,
                &[RequestedItem {
                    product_id: product.id.clone(),
                    quantity: 1,
                    customizations: vec![RequestedCustomization {
                        option_id: option.id,
                        quantity: 1,
                        price: 1, // catalog says 700
                    }],
                }],
                "card",
                None,
            )
            .unwrap_err();

        assert!(matches!(err, CommerceError::PriceMismatch { .. }));
        assert!(platform.orders.orders_for_user(&buyer).is_empty());
        assert_eq!(
            platform.catalog.get(ctx.store_id(), &product.id).unwrap().stock,
            Some(10)
        );
    }

    #[test]
    fn webhook_replay_flips_status_once_and_gates_access() {
        let platform = platform();
        let ctx = signup_basic(&platform, "shop1", "u1");
        let store_id = ctx.store_id().clone();

        // checkout attaches the processor subscription id
        let checkout = format!(
            r#"{{"id":"evt_co","type":"checkout.session.completed","data":{{"object":{{
                "status":"complete","subscription":"sub_w1","customer":"cus_1",
                "metadata":{{"storeId":"{store_id}","planId":"basic-monthly"}}}}}}}}"#
        );
        assert_eq!(
            platform.handle_webhook(&checkout).unwrap(),
            EventOutcome::Applied
        );

        let failed = r#"{"id":"evt_pf","type":"invoice.payment_failed","data":{"object":{"subscription":"sub_w1"}}}"#;
        assert_eq!(platform.handle_webhook(failed).unwrap(), EventOutcome::Applied);
        assert_eq!(
            platform.handle_webhook(failed).unwrap(),
            EventOutcome::Duplicate
        );

        let sub = platform.subscriptions.current_for_store(&store_id).unwrap();
        assert_eq!(
            sub.status,
            commerce_billing::SubscriptionStatus::PastDue
        );

        // PAST_DUE fails gating with Inactive, not NotFound
        let ctx = platform
            .resolve(Some("shop1.example.com"), None, None)
            .unwrap();
        let err = platform
            .place_order(
                &ctx,
                &UserId::new("buyer").unwrap(),
                &[RequestedItem {
                    product_id: ProductId::new("whatever").unwrap(),
                    quantity: 1,
                    customizations: vec![],
                }],
                "card",
                None,
            )
            .unwrap_err();
        assert!(matches!(err, CommerceError::SubscriptionInactive { .. }));

        // a succeeded invoice restores access
        let paid = r#"{"id":"evt_ps","type":"invoice.payment_succeeded","data":{"object":{"subscription":"sub_w1"}}}"#;
        platform.handle_webhook(paid).unwrap();
        let ctx = platform
            .resolve(Some("shop1.example.com"), None, None)
            .unwrap();
        assert!(gating::require_active_subscription(&ctx, Role::Merchant).is_ok());
    }

    #[test]
    fn product_quota_boundary() {
        let platform = platform();
        // free tier: 10 products
        platform
            .signup(
                "Tiny",
                "tiny",
                UserId::new("u1").unwrap(),
                PlanType::Free,
                PlanInterval::Monthly,
            )
            .unwrap();
        let ctx = platform.resolve(None, Some("tiny"), None).unwrap();

        for i in 0..10 {
            platform
                .create_product(&ctx, Role::Merchant, physical(&format!("P{i}"), 100, 1))
                .unwrap();
        }
        let err = platform
            .create_product(&ctx, Role::Merchant, physical("P10", 100, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            CommerceError::LimitExceeded {
                resource: ResourceClass::Products,
                current: 10,
                limit: 10,
            }
        ));

        // unlimited tier never denies
        platform
            .signup(
                "Big",
                "big",
                UserId::new("u2").unwrap(),
                PlanType::Enterprise,
                PlanInterval::Monthly,
            )
            .unwrap();
        let big = platform.resolve(None, Some("big"), None).unwrap();
        for i in 0..25 {
            platform
                .create_product(&big, Role::Merchant, physical(&format!("B{i}"), 100, 1))
                .unwrap();
        }
        assert_eq!(
            platform
                .limits
                .check_limit(&big, ResourceClass::Products, 1)
                .unwrap(),
            LimitDecision::Allow
        );
    }

    #[test]
    fn order_quota_counts_current_period_only() {
        let platform = platform();
        // custom plan with a tiny order quota
        let mut plan = platform
            .plans
            .find(PlanType::Basic, PlanInterval::Monthly)
            .unwrap();
        plan.id = PlanId::new("basic-tiny").unwrap();
        plan.features.max_orders = 2;
        let plan = platform.plans.create_plan(plan).unwrap();

        let store = platform
            .tenants
            .create("Shop", "shop1", UserId::new("u1").unwrap())
            .unwrap();
        platform
            .subscriptions
            .create_for_signup(&store.id, &plan)
            .unwrap();
        let ctx = platform.resolve(None, Some("shop1"), None).unwrap();

        let product = platform
            .create_product(&ctx, Role::Merchant, physical("Mug", 100, 100))
            .unwrap();
        let buyer = UserId::new("buyer").unwrap();
        let items = vec![RequestedItem {
            product_id: product.id.clone(),
            quantity: 1,
            customizations: vec![],
        }];

        platform.place_order(&ctx, &buyer, &items, "card", None).unwrap();
        platform.place_order(&ctx, &buyer, &items, "card", None).unwrap();
        let err = platform
            .place_order(&ctx, &buyer, &items, "card", None)
            .unwrap_err();
        assert!(matches!(
            err,
            CommerceError::LimitExceeded {
                resource: ResourceClass::Orders,
                ..
            }
        ));
    }

    #[test]
    fn storage_quota_uses_photo_estimate() {
        let platform = platform();
        let ctx = signup_basic(&platform, "shop1", "u1");

        // basic tier: 1000 MB = 2000 photos at 512 KB each
        let mut product = physical("Gallery", 100, 1);
        product.photos = (0..100).map(|i| format!("p{i}.jpg")).collect();
        platform
            .create_product(&ctx, Role::Merchant, product)
            .unwrap();

        // 100 photos ≈ 50 MB
        assert_eq!(
            platform
                .limits
                .check_limit(&ctx, ResourceClass::Storage, 1)
                .unwrap(),
            LimitDecision::Allow
        );
        match platform
            .limits
            .check_limit(&ctx, ResourceClass::Storage, 960)
            .unwrap()
        {
            LimitDecision::Deny { current, limit } => {
                assert_eq!(current, 50);
                assert_eq!(limit, 1000);
            }
            LimitDecision::Allow => panic!("expected denial"),
        }
    }

    #[test]
    fn usage_reconciliation_matches_primary_rows() {
        let platform = platform();
        let ctx = signup_basic(&platform, "shop1", "u1");
        let buyer = UserId::new("buyer").unwrap();

        let mut input = physical("Mug", 2500, 10);
        input.photos = vec!["a.jpg".into(), "b.jpg".into()];
        let product = platform
            .create_product(&ctx, Role::Merchant, input)
            .unwrap();
        platform
            .place_order(
                &ctx,
                &buyer,
                &[RequestedItem {
                    product_id: product.id.clone(),
                    quantity: 1,
                    customizations: vec![],
                }],
                "card",
                None,
            )
            .unwrap();

        let usage = platform.usage.reconcile(ctx.store_id()).unwrap();
        assert_eq!(usage.products_count, 1);
        assert_eq!(usage.orders_count, 1);
        assert_eq!(usage.storage_mb, 2 * 512 / 1024);

        let stats = platform.usage.usage_stats(ctx.store_id()).unwrap();
        assert_eq!(stats.products.current, 1);
        assert_eq!(stats.products.limit, Some(100));
        assert_eq!(stats.orders.current, 1);
    }

    #[test]
    fn soft_deleted_store_stops_resolving() {
        let platform = platform();
        let ctx = signup_basic(&platform, "shop1", "u1");

        platform.tenants.soft_delete(ctx.store_id()).unwrap();
        let err = platform
            .resolve(Some("shop1.example.com"), None, None)
            .unwrap_err();
        // the scrambled subdomain no longer matches anything
        assert!(matches!(err, CommerceError::TenantNotFound));
    }
}
