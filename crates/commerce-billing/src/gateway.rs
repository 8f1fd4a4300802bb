//! Outbound payment-gateway seam
//!
//! The processor API (customers, checkout sessions, connected accounts,
//! payment intents) lives behind [`PaymentGateway`]; the real HTTP
//! implementation belongs to the transport layer. [`ProcessorClient`]
//! wraps every call in a bounded timeout and fails closed: a call that
//! does not answer in time is a processing error, never a silent success.

use crate::fees::{self, FeeSplit};
use async_trait::async_trait;
use commerce_common::{Cents, CommerceError, CommerceResult, OrderId, PlanId, StoreId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Onboarding state of a store's connected payout account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectedAccountStatus {
    /// Details not yet submitted.
    Pending,
    /// Details submitted, capabilities not fully granted.
    Restricted,
    /// Fully enabled for charges and payouts.
    Active,
}

/// Derive the account status from processor capability flags.
pub fn account_status(
    details_submitted: bool,
    charges_enabled: bool,
    payouts_enabled: bool,
) -> ConnectedAccountStatus {
    if details_submitted && charges_enabled && payouts_enabled {
        ConnectedAccountStatus::Active
    } else if details_submitted {
        ConnectedAccountStatus::Restricted
    } else {
        ConnectedAccountStatus::Pending
    }
}

/// Parameters for a subscription checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_email: String,
    pub store_id: StoreId,
    pub plan_id: PlanId,
    /// Processor price id of the chosen plan.
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub trial_days: Option<u32>,
}

/// A hosted checkout session the customer is redirected to.
#[derive(Debug, Clone)]
pub struct CheckoutSessionLink {
    pub session_id: String,
    pub url: String,
}

/// Parameters for creating a store's connected payout account.
#[derive(Debug, Clone)]
pub struct ConnectedAccountRequest {
    pub store_id: StoreId,
    pub email: String,
    pub country: String,
    pub refresh_url: String,
    pub return_url: String,
}

/// A freshly created connected account plus its onboarding link.
#[derive(Debug, Clone)]
pub struct ConnectedAccountLink {
    pub account_id: String,
    pub onboarding_url: String,
}

/// Parameters for a destination charge with an application fee.
#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub amount: Cents,
    pub currency: String,
    /// Connected account receiving the transfer.
    pub destination_account: String,
    pub order_id: OrderId,
    pub store_id: StoreId,
    pub customer_email: String,
    pub description: String,
}

/// Handle to a created payment intent.
#[derive(Debug, Clone)]
pub struct PaymentIntentHandle {
    pub intent_id: String,
    pub client_secret: String,
    /// How the gross amount was divided.
    pub split: FeeSplit,
}

/// The subset of the processor API this core consumes.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Find-or-create a processor customer for an email.
    async fn create_customer(&self, email: &str, name: Option<&str>) -> CommerceResult<String>;

    /// Create a hosted subscription checkout session.
    async fn create_checkout_session(
        &self,
        customer_id: &str,
        request: &CheckoutRequest,
    ) -> CommerceResult<CheckoutSessionLink>;

    /// Create a connected payout account with an onboarding link.
    async fn create_connected_account(
        &self,
        request: &ConnectedAccountRequest,
    ) -> CommerceResult<ConnectedAccountLink>;

    /// Create a payment intent carrying an application fee and a
    /// transfer destination.
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
        split: FeeSplit,
    ) -> CommerceResult<PaymentIntentHandle>;

    /// Ask the processor to cancel a subscription.
    async fn cancel_subscription(
        &self,
        processor_subscription_id: &str,
        at_period_end: bool,
    ) -> CommerceResult<()>;
}

/// Gateway wrapper enforcing a deadline on every processor call.
pub struct ProcessorClient {
    gateway: Arc<dyn PaymentGateway>,
    timeout: Duration,
    fee_percent: u32,
}

impl ProcessorClient {
    /// Wrap a gateway with the default fee and a call deadline.
    pub fn new(gateway: Arc<dyn PaymentGateway>, timeout: Duration) -> Self {
        Self {
            gateway,
            timeout,
            fee_percent: fees::DEFAULT_PLATFORM_FEE_PERCENT,
        }
    }

    /// Override the platform fee percentage.
    pub fn with_fee_percent(mut self, fee_percent: u32) -> Self {
        self.fee_percent = fee_percent;
        self
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = CommerceResult<T>>,
    ) -> CommerceResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| CommerceError::UpstreamTimeout)?
    }

    /// Create (or reuse) a customer and open a checkout session.
    pub async fn checkout(&self, request: CheckoutRequest) -> CommerceResult<CheckoutSessionLink> {
        let customer_id = self
            .bounded(self.gateway.create_customer(&request.customer_email, None))
            .await?;
        self.bounded(self.gateway.create_checkout_session(&customer_id, &request))
            .await
    }

    /// Open a connected payout account for a store.
    pub async fn connect_account(
        &self,
        request: ConnectedAccountRequest,
    ) -> CommerceResult<ConnectedAccountLink> {
        self.bounded(self.gateway.create_connected_account(&request))
            .await
    }

    /// Charge with the platform's cut withheld and the remainder routed
    /// to the store's account.
    pub async fn charge_with_split(
        &self,
        request: PaymentIntentRequest,
    ) -> CommerceResult<PaymentIntentHandle> {
        let split = fees::split(request.amount, self.fee_percent);
        self.bounded(self.gateway.create_payment_intent(&request, split))
            .await
    }

    /// Cancel a subscription on the processor side.
    pub async fn cancel_subscription(
        &self,
        processor_subscription_id: &str,
        at_period_end: bool,
    ) -> CommerceResult<()> {
        self.bounded(
            self.gateway
                .cancel_subscription(processor_subscription_id, at_period_end),
        )
        .await
    }
}
