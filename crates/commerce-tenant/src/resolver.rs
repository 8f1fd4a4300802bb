//! Tenant resolution
//!
//! Maps an inbound request to a store. Resolution order, first match
//! wins: custom domain, subdomain of a base domain, explicit tenant
//! header, development-only override. Pure lookup, one read of
//! store + subscription + plan, no side effects.

use crate::model::{SubscriptionSnapshot, TenantContext};
use crate::registry::TenantRegistry;
use commerce_billing::{PlanCatalog, SubscriptionManager};
use commerce_common::{CommerceError, CommerceResult, StoreId};
use serde::Deserialize;
use std::sync::Arc;

/// Resolver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Domains that are the platform itself, never a tenant: the base
    /// domain plus loopback names.
    pub base_domains: Vec<String>,
    /// Honor the `?tenant=` style override (development only).
    pub dev_override_enabled: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_domains: vec!["localhost".into(), "127.0.0.1".into()],
            dev_override_enabled: false,
        }
    }
}

impl ResolverConfig {
    /// Config for a platform served under `base_domain`.
    pub fn for_base_domain(base_domain: &str) -> Self {
        Self {
            base_domains: vec![
                "localhost".into(),
                "127.0.0.1".into(),
                base_domain.to_string(),
            ],
            dev_override_enabled: false,
        }
    }
}

/// Tenant resolver
pub struct TenantResolver {
    registry: Arc<TenantRegistry>,
    subscriptions: Arc<SubscriptionManager>,
    plans: Arc<PlanCatalog>,
    config: ResolverConfig,
}

impl TenantResolver {
    pub fn new(
        registry: Arc<TenantRegistry>,
        subscriptions: Arc<SubscriptionManager>,
        plans: Arc<PlanCatalog>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            registry,
            subscriptions,
            plans,
            config,
        }
    }

    /// Resolve a request to its tenant.
    ///
    /// `host` is the raw Host header; `tenant_header` the explicit
    /// tenant id/subdomain header; `dev_override` the development query
    /// override, ignored unless enabled in config.
    pub fn resolve(
        &self,
        host: Option<&str>,
        tenant_header: Option<&str>,
        dev_override: Option<&str>,
    ) -> CommerceResult<TenantContext> {
        // 1. Custom domain exact match.
        if let Some(domain) = host.map(strip_port) {
            if !self.is_base_domain(domain) {
                if let Some(store) = self.registry.get_by_custom_domain(domain) {
                    return self.context_for(store);
                }
            }
        }

        // 2. Subdomain of a base domain.
        if let Some(subdomain) = host.and_then(|h| self.extract_subdomain(h)) {
            if let Some(store) = self.registry.get_by_subdomain(subdomain) {
                return self.context_for(store);
            }
        }

        // 3. Explicit header: subdomain or store id.
        if let Some(identifier) = tenant_header {
            if let Some(store) = self.lookup_identifier(identifier) {
                return self.context_for(store);
            }
            return Err(CommerceError::TenantNotFound);
        }

        // 4. Development override.
        if self.config.dev_override_enabled {
            if let Some(identifier) = dev_override {
                if let Some(store) = self.lookup_identifier(identifier) {
                    return self.context_for(store);
                }
            }
        }

        tracing::debug!(host = host.unwrap_or(""), "no tenant matched request");
        Err(CommerceError::TenantNotFound)
    }

    /// Resolve directly by store id (internal callers, jobs).
    pub fn resolve_by_id(&self, store_id: &StoreId) -> CommerceResult<TenantContext> {
        let store = self.registry.get(store_id).ok_or(CommerceError::TenantNotFound)?;
        self.context_for(store)
    }

    fn lookup_identifier(&self, identifier: &str) -> Option<crate::model::Store> {
        self.registry.get_by_subdomain(identifier).or_else(|| {
            StoreId::new(identifier)
                .ok()
                .and_then(|id| self.registry.get(&id))
        })
    }

    fn context_for(&self, store: crate::model::Store) -> CommerceResult<TenantContext> {
        if !store.is_active {
            return Err(CommerceError::TenantInactive(store.id));
        }

        // A store with no subscription still resolves; gating decides
        // what it may do.
        let subscription = self
            .subscriptions
            .current_for_store(&store.id)
            .and_then(|sub| match self.plans.get(&sub.plan_id) {
                Some(plan) => Some(SubscriptionSnapshot {
                    id: sub.id,
                    status: sub.status,
                    plan_type: plan.plan_type,
                    features: plan.features,
                    current_period_start: sub.current_period_start,
                    current_period_end: sub.current_period_end,
                }),
                None => {
                    tracing::warn!(store = %store.id, plan = %sub.plan_id, "subscription references missing plan");
                    None
                }
            });

        Ok(TenantContext {
            store,
            subscription,
        })
    }

    fn is_base_domain(&self, domain: &str) -> bool {
        self.config.base_domains.iter().any(|d| d == domain)
    }

    /// Parse a tenant subdomain out of a Host header. Returns `None` for
    /// base domains and for hosts without at least three dot-separated
    /// labels (`sub.domain.tld`).
    fn extract_subdomain<'a>(&self, host: &'a str) -> Option<&'a str> {
        let domain = strip_port(host);
        if self.is_base_domain(domain) {
            return None;
        }
        let mut parts = domain.split('.');
        let first = parts.next()?;
        if parts.count() >= 2 {
            Some(first)
        } else {
            None
        }
    }
}

fn strip_port(host: &str) -> &str {
    host.split(':').next().unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TenantUpdate;
    use commerce_billing::{PlanInterval, PlanType};
    use commerce_common::UserId;

    struct Fixture {
        registry: Arc<TenantRegistry>,
        subscriptions: Arc<SubscriptionManager>,
        plans: Arc<PlanCatalog>,
        resolver: TenantResolver,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(TenantRegistry::new());
        let subscriptions = Arc::new(SubscriptionManager::new());
        let plans = Arc::new(PlanCatalog::with_default_plans());
        let resolver = TenantResolver::new(
            registry.clone(),
            subscriptions.clone(),
            plans.clone(),
            ResolverConfig::for_base_domain("example.com"),
        );
        Fixture {
            registry,
            subscriptions,
            plans,
            resolver,
        }
    }

    #[test]
    fn subdomain_resolves_under_base_domain() {
        let f = fixture();
        let store = f
            .registry
            .create("Shop One", "shop1", UserId::new("u1").unwrap())
            .unwrap();

        let ctx = f
            .resolver
            .resolve(Some("shop1.example.com"), None, None)
            .unwrap();
        assert_eq!(ctx.store.id, store.id);

        // port noise is stripped
        let ctx = f
            .resolver
            .resolve(Some("shop1.example.com:8443"), None, None)
            .unwrap();
        assert_eq!(ctx.store.id, store.id);
    }

    #[test]
    fn bare_base_domain_is_not_a_tenant() {
        let f = fixture();
        f.registry
            .create("Shop One", "shop1", UserId::new("u1").unwrap())
            .unwrap();
        let err = f.resolver.resolve(Some("example.com"), None, None).unwrap_err();
        assert!(matches!(err, CommerceError::TenantNotFound));
    }

    #[test]
    fn custom_domain_wins_over_subdomain() {
        let f = fixture();
        // store B owns the subdomain "shop1"…
        let b = f
            .registry
            .create("B", "shop1", UserId::new("u2").unwrap())
            .unwrap();
        // …but store A claimed "shop1.example.com" as its custom domain.
        let a = f
            .registry
            .create("A", "other", UserId::new("u1").unwrap())
            .unwrap();
        f.registry
            .update(
                &a.id,
                TenantUpdate {
                    custom_domain: Some("shop1.example.com".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let ctx = f
            .resolver
            .resolve(Some("shop1.example.com"), None, None)
            .unwrap();
        assert_eq!(ctx.store.id, a.id);
        assert_ne!(ctx.store.id, b.id);
    }

    #[test]
    fn header_matches_subdomain_or_id() {
        let f = fixture();
        let store = f
            .registry
            .create("Shop", "shop1", UserId::new("u1").unwrap())
            .unwrap();

        let ctx = f.resolver.resolve(None, Some("shop1"), None).unwrap();
        assert_eq!(ctx.store.id, store.id);

        let ctx = f
            .resolver
            .resolve(None, Some(store.id.as_str()), None)
            .unwrap();
        assert_eq!(ctx.store.id, store.id);
    }

    #[test]
    fn dev_override_requires_opt_in() {
        let f = fixture();
        f.registry
            .create("Shop", "shop1", UserId::new("u1").unwrap())
            .unwrap();
        // disabled by default config in fixture
        assert!(f.resolver.resolve(None, None, Some("shop1")).is_err());

        let dev_resolver = TenantResolver::new(
            f.registry.clone(),
            f.subscriptions.clone(),
            f.plans.clone(),
            ResolverConfig {
                dev_override_enabled: true,
                ..ResolverConfig::for_base_domain("example.com")
            },
        );
        assert!(dev_resolver.resolve(None, None, Some("shop1")).is_ok());
    }

    #[test]
    fn inactive_store_is_distinct_from_missing() {
        let f = fixture();
        let store = f
            .registry
            .create("Shop", "shop1", UserId::new("u1").unwrap())
            .unwrap();
        f.registry.set_active(&store.id, false).unwrap();

        let err = f
            .resolver
            .resolve(Some("shop1.example.com"), None, None)
            .unwrap_err();
        assert!(matches!(err, CommerceError::TenantInactive(_)));
    }

    #[test]
    fn missing_subscription_is_tolerated() {
        let f = fixture();
        f.registry
            .create("Shop", "shop1", UserId::new("u1").unwrap())
            .unwrap();
        let ctx = f
            .resolver
            .resolve(Some("shop1.example.com"), None, None)
            .unwrap();
        assert!(ctx.subscription.is_none());
    }

    #[test]
    fn subscription_snapshot_is_attached() {
        let f = fixture();
        let store = f
            .registry
            .create("Shop", "shop1", UserId::new("u1").unwrap())
            .unwrap();
        let plan = f.plans.find(PlanType::Basic, PlanInterval::Monthly).unwrap();
        f.subscriptions.create_for_signup(&store.id, &plan).unwrap();

        let ctx = f
            .resolver
            .resolve(Some("shop1.example.com"), None, None)
            .unwrap();
        let snapshot = ctx.subscription.unwrap();
        assert_eq!(snapshot.plan_type, PlanType::Basic);
        assert_eq!(snapshot.features.max_products, 100);
    }
}
