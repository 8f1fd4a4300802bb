//! Plan usage reconciliation
//!
//! Per-store, per-billing-month usage snapshots. These are derived data
//! for reporting and the periodic reconciliation job, recomputable from
//! the primary entities at any time, never consulted for enforcement
//! (the limit engine counts live rows itself).

use crate::limits::STORAGE_PER_PHOTO_KB;
use chrono::{DateTime, Datelike, Utc};
use commerce_billing::SubscriptionManager;
use commerce_common::{CommerceError, CommerceResult, StoreId};
use commerce_orders::{OrderEngine, ProductCatalog};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One usage snapshot, keyed by store and billing month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanUsage {
    pub store_id: StoreId,
    pub month: u32,
    pub year: i32,
    pub products_count: u64,
    pub orders_count: u64,
    /// Estimated, per the flat per-photo size.
    pub storage_mb: u64,
    pub updated_at: DateTime<Utc>,
}

/// Usage figures for one resource in a stats report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub current: u64,
    /// `None` means unlimited.
    pub limit: Option<u64>,
    /// Percent of quota used; `None` when unlimited.
    pub percent_used: Option<f64>,
}

impl ResourceUsage {
    fn new(current: u64, limit: i64) -> Self {
        if limit < 0 {
            Self {
                current,
                limit: None,
                percent_used: None,
            }
        } else {
            let percent = if limit == 0 {
                100.0
            } else {
                current as f64 / limit as f64 * 100.0
            };
            Self {
                current,
                limit: Some(limit as u64),
                percent_used: Some(percent),
            }
        }
    }
}

/// A store's usage report for its current billing period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageStats {
    pub store_id: StoreId,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub products: ResourceUsage,
    pub orders: ResourceUsage,
    pub storage: ResourceUsage,
}

/// Usage ledger
pub struct UsageLedger {
    catalog: Arc<ProductCatalog>,
    orders: Arc<OrderEngine>,
    subscriptions: Arc<SubscriptionManager>,
    plans: Arc<commerce_billing::PlanCatalog>,
    snapshots: RwLock<HashMap<(StoreId, u32, i32), PlanUsage>>,
}

impl UsageLedger {
    pub fn new(
        catalog: Arc<ProductCatalog>,
        orders: Arc<OrderEngine>,
        subscriptions: Arc<SubscriptionManager>,
        plans: Arc<commerce_billing::PlanCatalog>,
    ) -> Self {
        Self {
            catalog,
            orders,
            subscriptions,
            plans,
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    /// Zeroed snapshot written at signup.
    pub fn init_for_store(&self, store_id: &StoreId) {
        let now = Utc::now();
        let key = (store_id.clone(), now.month(), now.year());
        self.snapshots.write().insert(
            key,
            PlanUsage {
                store_id: store_id.clone(),
                month: now.month(),
                year: now.year(),
                products_count: 0,
                orders_count: 0,
                storage_mb: 0,
                updated_at: now,
            },
        );
    }

    /// Recompute the current period's snapshot from primary entities and
    /// upsert it. Called by the periodic reconciliation job.
    pub fn reconcile(&self, store_id: &StoreId) -> CommerceResult<PlanUsage> {
        let subscription = self
            .subscriptions
            .current_for_store(store_id)
            .ok_or(CommerceError::SubscriptionNotFound)?;

        let products_count = self.catalog.count_for_store(store_id);
        let orders_count = self.orders.count_in_window(
            store_id,
            subscription.current_period_start,
            subscription.current_period_end,
        );
        let storage_mb = self.catalog.photo_count_for_store(store_id) * STORAGE_PER_PHOTO_KB / 1024;

        let period = subscription.current_period_start;
        let usage = PlanUsage {
            store_id: store_id.clone(),
            month: period.month(),
            year: period.year(),
            products_count,
            orders_count,
            storage_mb,
            updated_at: Utc::now(),
        };
        self.snapshots
            .write()
            .insert((store_id.clone(), usage.month, usage.year), usage.clone());
        Ok(usage)
    }

    /// Fetch a stored snapshot.
    pub fn get(&self, store_id: &StoreId, month: u32, year: i32) -> Option<PlanUsage> {
        self.snapshots
            .read()
            .get(&(store_id.clone(), month, year))
            .cloned()
    }

    /// Live usage report against the plan's quotas.
    pub fn usage_stats(&self, store_id: &StoreId) -> CommerceResult<UsageStats> {
        let subscription = self
            .subscriptions
            .current_for_store(store_id)
            .ok_or(CommerceError::SubscriptionNotFound)?;
        let plan = self
            .plans
            .get(&subscription.plan_id)
            .ok_or_else(|| CommerceError::PlanNotFound(subscription.plan_id.clone()))?;

        let products = self.catalog.count_for_store(store_id);
        let orders = self.orders.count_in_window(
            store_id,
            subscription.current_period_start,
            subscription.current_period_end,
        );
        let storage_mb = self.catalog.photo_count_for_store(store_id) * STORAGE_PER_PHOTO_KB / 1024;

        Ok(UsageStats {
            store_id: store_id.clone(),
            period_start: subscription.current_period_start,
            period_end: subscription.current_period_end,
            products: ResourceUsage::new(products, plan.features.max_products),
            orders: ResourceUsage::new(orders, plan.features.max_orders),
            storage: ResourceUsage::new(storage_mb, plan.features.max_storage_mb),
        })
    }
}
