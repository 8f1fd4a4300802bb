//! OpenCommerce Orders
//!
//! The order-taking side of the platform: the per-store product catalog
//! (prices and stock are the sole source of truth), the pricing &
//! inventory validator that re-derives every amount from the catalog,
//! and the commit engine that turns a validated cart into an order
//! atomically: stock decrement and order rows succeed or fail together.

#![allow(dead_code)]

pub mod catalog;
pub mod engine;
pub mod model;
pub mod validate;

pub use catalog::{NewProduct, ProductCatalog, ProductUpdate};
pub use engine::OrderEngine;
pub use model::{
    CustomizationOption, Order, OrderItem, OrderItemCustomization, OrderStatus, Photo, Product,
    ProductType,
};
pub use validate::{RequestedCustomization, RequestedItem, ValidatedItem, ValidatedOrder};
