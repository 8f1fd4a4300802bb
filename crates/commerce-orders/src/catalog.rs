//! Product catalog
//!
//! Per-store products and their customization options, behind one lock
//! so order validation always sees an atomic view. Lookups are tenant
//! scoped: asking for another store's product behaves exactly like
//! asking for one that does not exist.

use crate::model::{CustomizationOption, Photo, Product, ProductType};
use crate::validate::{self, RequestedItem, ValidatedOrder};
use chrono::Utc;
use commerce_common::{Cents, CommerceError, CommerceResult, OptionId, ProductId, StoreId};
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::Arc;

/// Catalog rows. One lock covers both tables.
pub(crate) struct CatalogTables {
    pub(crate) products: HashMap<ProductId, Product>,
    pub(crate) options: HashMap<OptionId, CustomizationOption>,
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Cents,
    pub product_type: ProductType,
    pub stock: Option<u32>,
    pub category: Option<String>,
    pub photos: Vec<String>,
}

/// Fields a merchant may edit on an existing product.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Cents>,
    pub is_available: Option<bool>,
    pub stock: Option<u32>,
    /// Replaces the photo set wholesale when present.
    pub photos: Option<Vec<String>>,
}

/// Product catalog
#[derive(Clone)]
pub struct ProductCatalog {
    inner: Arc<RwLock<CatalogTables>>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CatalogTables {
                products: HashMap::new(),
                options: HashMap::new(),
            })),
        }
    }

    /// Create a product for a store. Physical products must declare
    /// stock; digital and service products never track it.
    pub fn create_product(&self, store_id: &StoreId, input: NewProduct) -> CommerceResult<Product> {
        if input.price < 0 {
            return Err(CommerceError::Invalid("price cannot be negative".into()));
        }
        let stock = match input.product_type {
            ProductType::Physical => Some(input.stock.ok_or_else(|| {
                CommerceError::Invalid("physical products require a stock count".into())
            })?),
            ProductType::Digital | ProductType::Service => None,
        };

        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            store_id: store_id.clone(),
            name: input.name,
            description: input.description,
            price: input.price,
            product_type: input.product_type,
            stock,
            is_available: true,
            category: input.category,
            photos: input.photos.into_iter().map(|url| Photo { url }).collect(),
            created_at: now,
            updated_at: now,
        };

        self.inner
            .write()
            .products
            .insert(product.id.clone(), product.clone());
        Ok(product)
    }

    /// Tenant-scoped lookup.
    pub fn get(&self, store_id: &StoreId, product_id: &ProductId) -> Option<Product> {
        self.inner
            .read()
            .products
            .get(product_id)
            .filter(|p| p.store_id == *store_id)
            .cloned()
    }

    /// Edit a product owned by the store.
    pub fn update_product(
        &self,
        store_id: &StoreId,
        product_id: &ProductId,
        update: ProductUpdate,
    ) -> CommerceResult<Product> {
        let mut tables = self.inner.write();
        let product = tables
            .products
            .get_mut(product_id)
            .filter(|p| p.store_id == *store_id)
            .ok_or_else(|| CommerceError::ProductUnavailable {
                product_id: product_id.clone(),
            })?;

        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            if price < 0 {
                return Err(CommerceError::Invalid("price cannot be negative".into()));
            }
            product.price = price;
        }
        if let Some(is_available) = update.is_available {
            product.is_available = is_available;
        }
        if let Some(stock) = update.stock {
            if product.product_type == ProductType::Physical {
                product.stock = Some(stock);
            }
        }
        if let Some(photos) = update.photos {
            product.photos = photos.into_iter().map(|url| Photo { url }).collect();
        }
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    /// Attach a customization option to a store's product.
    pub fn add_option(
        &self,
        store_id: &StoreId,
        product_id: &ProductId,
        name: &str,
        price: Cents,
    ) -> CommerceResult<CustomizationOption> {
        if price < 0 {
            return Err(CommerceError::Invalid("price cannot be negative".into()));
        }
        let mut tables = self.inner.write();
        if !tables
            .products
            .get(product_id)
            .is_some_and(|p| p.store_id == *store_id)
        {
            return Err(CommerceError::ProductUnavailable {
                product_id: product_id.clone(),
            });
        }

        let option = CustomizationOption {
            id: OptionId::generate(),
            product_id: product_id.clone(),
            name: name.to_string(),
            price,
        };
        tables.options.insert(option.id.clone(), option.clone());
        Ok(option)
    }

    /// Options declared for one product.
    pub fn options_for_product(&self, product_id: &ProductId) -> Vec<CustomizationOption> {
        self.inner
            .read()
            .options
            .values()
            .filter(|o| o.product_id == *product_id)
            .cloned()
            .collect()
    }

    /// All products of a store.
    pub fn list_for_store(&self, store_id: &StoreId) -> Vec<Product> {
        let mut products: Vec<_> = self
            .inner
            .read()
            .products
            .values()
            .filter(|p| p.store_id == *store_id)
            .cloned()
            .collect();
        products.sort_by_key(|p| p.created_at);
        products
    }

    /// Live product count for a store (quota input).
    pub fn count_for_store(&self, store_id: &StoreId) -> u64 {
        self.inner
            .read()
            .products
            .values()
            .filter(|p| p.store_id == *store_id)
            .count() as u64
    }

    /// Total photos across a store's products (storage-estimate input).
    pub fn photo_count_for_store(&self, store_id: &StoreId) -> u64 {
        self.inner
            .read()
            .products
            .values()
            .filter(|p| p.store_id == *store_id)
            .map(|p| p.photos.len() as u64)
            .sum()
    }

    /// Validate a cart against the live catalog without mutating
    /// anything. The commit engine repeats this inside its transaction;
    /// this entry point exists for pre-flight checks and quotes.
    pub fn validate_order(
        &self,
        store_id: &StoreId,
        items: &[RequestedItem],
    ) -> CommerceResult<ValidatedOrder> {
        validate::validate_items(&self.inner.read(), store_id, items)
    }

    /// Write access for the commit engine's critical section.
    pub(crate) fn tables_mut(&self) -> RwLockWriteGuard<'_, CatalogTables> {
        self.inner.write()
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::new()
    }
}
