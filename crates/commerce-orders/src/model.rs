//! Catalog and order data model

use chrono::{DateTime, Utc};
use commerce_common::{Cents, CommerceError, CommerceResult, OptionId, OrderId, ProductId, StoreId, UserId};
use serde::{Deserialize, Serialize};

/// What kind of thing a product is; only physical goods track stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Physical,
    Digital,
    Service,
}

/// A product photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
}

/// A catalog entry. `price` and `stock` are authoritative for order
/// computation; client-submitted amounts are never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    pub description: String,
    /// Unit price in minor currency units.
    pub price: Cents,
    pub product_type: ProductType,
    /// Units on hand; required for physical products, ignored otherwise.
    pub stock: Option<u32>,
    pub is_available: bool,
    pub category: Option<String>,
    pub photos: Vec<Photo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A priced add-on a customer can attach to an order item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomizationOption {
    pub id: OptionId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Cents,
}

/// Order lifecycle. Orders are created in `InPreparation` and only move
/// forward; they are never created in a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    InPreparation,
    Ready,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// Parse a wire status; anything outside the closed set is rejected.
    pub fn parse(s: &str) -> CommerceResult<Self> {
        match s {
            "IN_PREPARATION" => Ok(Self::InPreparation),
            "READY" => Ok(Self::Ready),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELED" => Ok(Self::Canceled),
            other => Err(CommerceError::UnknownStatus(other.to_string())),
        }
    }

    /// Legal forward transitions.
    pub fn can_transition(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (InPreparation, Ready)
                | (InPreparation, Shipped)
                | (InPreparation, Canceled)
                | (Ready, Shipped)
                | (Ready, Delivered)
                | (Ready, Canceled)
                | (Shipped, Delivered)
                | (Shipped, Canceled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InPreparation => "IN_PREPARATION",
            Self::Ready => "READY",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Canceled => "CANCELED",
        };
        write!(f, "{s}")
    }
}

/// Customization snapshot on an order item: name and price captured at
/// order time, decoupled from later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemCustomization {
    pub option_id: OptionId,
    pub name: String,
    pub price: Cents,
    pub quantity: u32,
}

/// One order line, snapshotting the product price at order time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    /// Product name at order time, for display.
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Cents,
    pub subtotal: Cents,
    pub customizations: Vec<OrderItemCustomization>,
}

/// An order. Immutable once created except for status transitions and
/// the payment-split fields the processor webhooks fill in afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub store_id: StoreId,
    pub user_id: UserId,
    pub status: OrderStatus,
    /// Derived total; never client-supplied.
    pub total: Cents,
    pub payment_method: String,
    pub delivery_address: Option<String>,
    pub items: Vec<OrderItem>,
    /// Populated post-facto from the processor's transfer webhook.
    pub platform_fee: Option<Cents>,
    pub merchant_amount: Option<Cents>,
    pub processor_transfer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_string_is_rejected() {
        assert!(OrderStatus::parse("SHIPPED").is_ok());
        let err = OrderStatus::parse("EN_ROUTE").unwrap_err();
        assert!(matches!(err, CommerceError::UnknownStatus(_)));
    }

    #[test]
    fn transitions_only_move_forward() {
        use OrderStatus::*;
        assert!(InPreparation.can_transition(Ready));
        assert!(Ready.can_transition(Delivered));
        assert!(Shipped.can_transition(Delivered));
        assert!(!Delivered.can_transition(InPreparation));
        assert!(!Canceled.can_transition(Ready));
        assert!(!Delivered.can_transition(Canceled));
    }
}
