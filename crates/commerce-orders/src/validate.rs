//! Pricing & inventory validation
//!
//! Re-derives every amount from the catalog. The only client-submitted
//! price anywhere in an order request is the per-customization price,
//! and it is used solely for an equality check against the catalog;
//! it is never persisted. A product the store does not own, does not
//! have, or has switched off all answer with the same error.

use crate::catalog::CatalogTables;
use crate::model::{OrderItemCustomization, ProductType};
use commerce_common::{Cents, CommerceError, CommerceResult, OptionId, ProductId, StoreId};
use serde::{Deserialize, Serialize};

/// One requested order line, as it arrives from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedItem {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub customizations: Vec<RequestedCustomization>,
}

/// A requested customization. `price` is what the client believes the
/// option costs; a disagreement with the catalog rejects the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedCustomization {
    pub option_id: OptionId,
    pub quantity: u32,
    pub price: Cents,
}

/// An order line rewritten with authoritative prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_type: ProductType,
    pub quantity: u32,
    pub unit_price: Cents,
    pub customizations: Vec<OrderItemCustomization>,
    pub subtotal: Cents,
}

/// A fully validated cart with its derived grand total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedOrder {
    pub items: Vec<ValidatedItem>,
    pub total: Cents,
}

/// Validate requested items against one consistent view of the catalog.
///
/// Pure: no stock is touched here. The commit engine calls this again
/// under its write lock so the view it validates is the view it mutates.
pub(crate) fn validate_items(
    tables: &CatalogTables,
    store_id: &StoreId,
    items: &[RequestedItem],
) -> CommerceResult<ValidatedOrder> {
    if items.is_empty() {
        return Err(CommerceError::Invalid(
            "order must contain at least one item".into(),
        ));
    }

    let mut validated = Vec::with_capacity(items.len());
    let mut total: Cents = 0;

    for item in items {
        let product = tables
            .products
            .get(&item.product_id)
            .filter(|p| p.store_id == *store_id && p.is_available)
            .ok_or_else(|| CommerceError::ProductUnavailable {
                product_id: item.product_id.clone(),
            })?;

        if item.quantity == 0 {
            return Err(CommerceError::InvalidQuantity {
                product_id: item.product_id.clone(),
            });
        }

        if product.product_type == ProductType::Physical {
            if let Some(stock) = product.stock {
                if item.quantity > stock {
                    return Err(CommerceError::InsufficientStock {
                        product_id: item.product_id.clone(),
                        requested: item.quantity,
                        available: stock,
                    });
                }
            }
        }

        let mut customizations = Vec::with_capacity(item.customizations.len());
        let mut customization_total: Cents = 0;
        for requested in &item.customizations {
            let option = tables
                .options
                .get(&requested.option_id)
                .filter(|o| o.product_id == item.product_id)
                .ok_or_else(|| CommerceError::CustomizationNotFound {
                    option_id: requested.option_id.clone(),
                })?;

            if requested.quantity == 0 {
                return Err(CommerceError::InvalidQuantity {
                    product_id: item.product_id.clone(),
                });
            }
            if requested.price != option.price {
                return Err(CommerceError::PriceMismatch {
                    option_id: requested.option_id.clone(),
                });
            }

            customization_total += option.price * requested.quantity as Cents;
            customizations.push(OrderItemCustomization {
                option_id: option.id.clone(),
                name: option.name.clone(),
                price: option.price,
                quantity: requested.quantity,
            });
        }

        let subtotal = product.price * item.quantity as Cents + customization_total;
        total += subtotal;

        validated.push(ValidatedItem {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            product_type: product.product_type,
            quantity: item.quantity,
            unit_price: product.price,
            customizations,
            subtotal,
        });
    }

    Ok(ValidatedOrder {
        items: validated,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewProduct, ProductCatalog};
    use crate::model::ProductType;

    fn seeded() -> (ProductCatalog, StoreId, ProductId, OptionId) {
        let catalog = ProductCatalog::new();
        let store = StoreId::new("s1").unwrap();
        let product = catalog
            .create_product(
                &store,
                NewProduct {
                    name: "Burger".into(),
                    description: String::new(),
                    price: 3000,
                    product_type: ProductType::Physical,
                    stock: Some(10),
                    category: Some("food".into()),
                    photos: vec![],
                },
            )
            .unwrap();
        let option = catalog
            .add_option(&store, &product.id, "Extra cheese", 300)
            .unwrap();
        (catalog, store, product.id, option.id)
    }

    fn item(product_id: &ProductId, quantity: u32) -> RequestedItem {
        RequestedItem {
            product_id: product_id.clone(),
            quantity,
            customizations: vec![],
        }
    }

    #[test]
    fn totals_come_from_the_catalog() {
        let (catalog, store, product_id, option_id) = seeded();
        let order = catalog
            .validate_order(
                &store,
                &[RequestedItem {
                    product_id: product_id.clone(),
                    quantity: 2,
                    customizations: vec![RequestedCustomization {
                        option_id,
                        quantity: 1,
                        price: 300,
                    }],
                }],
            )
            .unwrap();

        // 2 × 3000 + 1 × 300
        assert_eq!(order.total, 6300);
        assert_eq!(order.items[0].unit_price, 3000);
        assert_eq!(order.items[0].product_name, "Burger");
    }

    #[test]
    fn tampered_customization_price_rejects() {
        let (catalog, store, product_id, option_id) = seeded();
        let err = catalog
            .validate_order(
                &store,
                &[RequestedItem {
                    product_id,
                    quantity: 1,
                    customizations: vec![RequestedCustomization {
                        option_id,
                        quantity: 1,
                        price: 1, // catalog says 300
                    }],
                }],
            )
            .unwrap_err();
        assert!(matches!(err, CommerceError::PriceMismatch { .. }));
    }

    #[test]
    fn foreign_and_missing_products_look_identical() {
        let (catalog, store, product_id, _) = seeded();
        let other_store = StoreId::new("s2").unwrap();

        let foreign = catalog
            .validate_order(&other_store, &[item(&product_id, 1)])
            .unwrap_err();
        let missing = catalog
            .validate_order(&store, &[item(&ProductId::new("ghost").unwrap(), 1)])
            .unwrap_err();

        assert!(matches!(foreign, CommerceError::ProductUnavailable { .. }));
        assert!(matches!(missing, CommerceError::ProductUnavailable { .. }));
    }

    #[test]
    fn unavailable_product_rejects() {
        let (catalog, store, product_id, _) = seeded();
        catalog
            .update_product(
                &store,
                &product_id,
                crate::catalog::ProductUpdate {
                    is_available: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        let err = catalog
            .validate_order(&store, &[item(&product_id, 1)])
            .unwrap_err();
        assert!(matches!(err, CommerceError::ProductUnavailable { .. }));
    }

    #[test]
    fn over_stock_rejects_without_mutation() {
        let (catalog, store, product_id, _) = seeded();
        let err = catalog
            .validate_order(&store, &[item(&product_id, 11)])
            .unwrap_err();
        assert!(matches!(
            err,
            CommerceError::InsufficientStock {
                requested: 11,
                available: 10,
                ..
            }
        ));
        // validation never touches stock
        assert_eq!(catalog.get(&store, &product_id).unwrap().stock, Some(10));
    }

    #[test]
    fn zero_quantity_rejects() {
        let (catalog, store, product_id, _) = seeded();
        let err = catalog
            .validate_order(&store, &[item(&product_id, 0)])
            .unwrap_err();
        assert!(matches!(err, CommerceError::InvalidQuantity { .. }));
    }

    #[test]
    fn option_of_other_product_is_not_found() {
        let (catalog, store, product_id, _) = seeded();
        let second = catalog
            .create_product(
                &store,
                NewProduct {
                    name: "Fries".into(),
                    description: String::new(),
                    price: 1200,
                    product_type: ProductType::Physical,
                    stock: Some(5),
                    category: None,
                    photos: vec![],
                },
            )
            .unwrap();
        let fries_option = catalog
            .add_option(&store, &second.id, "Extra salt", 0)
            .unwrap();

        // option belongs to fries, requested against the burger
        let err = catalog
            .validate_order(
                &store,
                &[RequestedItem {
                    product_id,
                    quantity: 1,
                    customizations: vec![RequestedCustomization {
                        option_id: fries_option.id,
                        quantity: 1,
                        price: 0,
                    }],
                }],
            )
            .unwrap_err();
        assert!(matches!(err, CommerceError::CustomizationNotFound { .. }));
    }
}
