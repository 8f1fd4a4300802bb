//! OpenCommerce Billing
//!
//! Subscription plans, the processor-driven subscription state machine,
//! webhook event decoding, platform-fee arithmetic and the outbound
//! payment-gateway seam.
//!
//! The payment processor is authoritative for subscription state: every
//! transition in [`subscription::SubscriptionManager`] is driven by a
//! decoded [`events::ProcessorEvent`]. This crate never talks HTTP; the
//! webhook envelope arrives as raw JSON and outbound calls go through the
//! [`gateway::PaymentGateway`] trait.

#![allow(dead_code)]

pub mod events;
pub mod fees;
pub mod gateway;
pub mod plan;
pub mod subscription;

pub use events::{ProcessorEvent, WebhookEvent};
pub use fees::{split, FeeSplit, DEFAULT_PLATFORM_FEE_PERCENT};
pub use gateway::{ConnectedAccountStatus, PaymentGateway, ProcessorClient};
pub use plan::{PlanCatalog, PlanFeatures, PlanInterval, PlanType, SubscriptionPlan};
pub use subscription::{EventOutcome, Subscription, SubscriptionManager, SubscriptionStatus};
