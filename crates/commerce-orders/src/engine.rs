//! Order commit engine
//!
//! Turns a validated cart into persisted rows atomically. The catalog
//! write lock is the transaction boundary: items are re-validated under
//! it (the pre-flight check may be stale by commit time), stock is
//! decremented, and the order with all its item rows becomes visible in
//! one insert. Every check happens before the first mutation, so a
//! rejected commit leaves no trace, and concurrent commits serialize;
//! stock can never go negative.

use crate::catalog::ProductCatalog;
use crate::model::{Order, OrderItem, OrderStatus, ProductType};
use crate::validate::{self, RequestedItem};
use chrono::{DateTime, Utc};
use commerce_common::{Cents, CommerceError, CommerceResult, OrderId, StoreId, UserId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Order commit engine
pub struct OrderEngine {
    catalog: ProductCatalog,
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl OrderEngine {
    pub fn new(catalog: ProductCatalog) -> Self {
        Self {
            catalog,
            orders: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The catalog this engine commits against.
    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Commit an order: validate, decrement stock, persist, all or
    /// nothing. Returns the hydrated order (item rows carry the product
    /// names current at commit time).
    pub fn commit_order(
        &self,
        store_id: &StoreId,
        user_id: &UserId,
        items: &[RequestedItem],
        payment_method: &str,
        delivery_address: Option<String>,
    ) -> CommerceResult<Order> {
        let mut tables = self.catalog.tables_mut();

        // Re-validate inside the critical section; the authoritative
        // view here is the one the decrements below will mutate.
        let validated = validate::validate_items(&tables, store_id, items)?;

        for item in &validated.items {
            if item.product_type != ProductType::Physical {
                continue;
            }
            let product = tables
                .products
                .get_mut(&item.product_id)
                .expect("validated against this table");
            if let Some(stock) = product.stock.as_mut() {
                // validate_items checked quantity <= stock under this
                // same guard
                *stock -= item.quantity;
            }
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::generate(),
            store_id: store_id.clone(),
            user_id: user_id.clone(),
            status: OrderStatus::InPreparation,
            total: validated.total,
            payment_method: payment_method.to_string(),
            delivery_address,
            items: validated
                .items
                .into_iter()
                .map(|item| OrderItem {
                    product_id: item.product_id,
                    product_name: item.product_name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    subtotal: item.subtotal,
                    customizations: item.customizations,
                })
                .collect(),
            platform_fee: None,
            merchant_amount: None,
            processor_transfer_id: None,
            created_at: now,
            updated_at: now,
        };

        // Insert while still holding the catalog guard: no window where
        // stock is decremented but the order is not yet visible.
        self.orders.write().insert(order.id.clone(), order.clone());
        drop(tables);

        tracing::info!(
            order = %order.id,
            store = %order.store_id,
            total = order.total,
            "order committed"
        );
        Ok(order)
    }

    /// Get order by id.
    pub fn get(&self, id: &OrderId) -> Option<Order> {
        self.orders.read().get(id).cloned()
    }

    /// A user's orders, newest first.
    pub fn orders_for_user(&self, user_id: &UserId) -> Vec<Order> {
        let mut orders: Vec<_> = self
            .orders
            .read()
            .values()
            .filter(|o| o.user_id == *user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// A store's orders, newest first.
    pub fn list_for_store(&self, store_id: &StoreId) -> Vec<Order> {
        let mut orders: Vec<_> = self
            .orders
            .read()
            .values()
            .filter(|o| o.store_id == *store_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Orders a store took inside [start, end), the quota input.
    pub fn count_in_window(
        &self,
        store_id: &StoreId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> u64 {
        self.orders
            .read()
            .values()
            .filter(|o| o.store_id == *store_id && o.created_at >= start && o.created_at < end)
            .count() as u64
    }

    /// Summed totals of delivered orders (financial reporting).
    pub fn delivered_revenue(&self, store_id: &StoreId) -> Cents {
        self.orders
            .read()
            .values()
            .filter(|o| o.store_id == *store_id && o.status == OrderStatus::Delivered)
            .map(|o| o.total)
            .sum()
    }

    /// Operator-driven status change. Unknown orders fail, and the
    /// status graph only moves forward.
    pub fn update_status(&self, id: &OrderId, to: OrderStatus) -> CommerceResult<Order> {
        let mut orders = self.orders.write();
        let order = orders
            .get_mut(id)
            .ok_or_else(|| CommerceError::OrderNotFound(id.clone()))?;
        if !order.status.can_transition(to) {
            return Err(CommerceError::Invalid(format!(
                "cannot transition order from {} to {}",
                order.status, to
            )));
        }
        order.status = to;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    /// Record the processor's fee split once its transfer webhook lands.
    pub fn record_payment_split(
        &self,
        id: &OrderId,
        platform_fee: Cents,
        merchant_amount: Cents,
        transfer_id: &str,
    ) -> CommerceResult<Order> {
        let mut orders = self.orders.write();
        let order = orders
            .get_mut(id)
            .ok_or_else(|| CommerceError::OrderNotFound(id.clone()))?;
        order.platform_fee = Some(platform_fee);
        order.merchant_amount = Some(merchant_amount);
        order.processor_transfer_id = Some(transfer_id.to_string());
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
