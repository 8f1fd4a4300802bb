//! Subscription lifecycle
//!
//! A subscription binds one store to one plan for a billing period. The
//! payment processor is the source of truth: after signup, every status
//! change comes from a webhook event. Handlers are idempotent (delivery
//! is at-least-once), and event ids are only marked processed after a
//! successful apply, so a failed apply is retried by the processor.

use crate::events::{CheckoutSession, ProcessorEvent, ProcessorInvoice, ProcessorSubscription, WebhookEvent};
use crate::plan::{PlanCatalog, PlanType, SubscriptionPlan};
use chrono::{DateTime, Duration, Utc};
use commerce_common::{CommerceError, CommerceResult, PlanId, StoreId, SubscriptionId};
use dashmap::DashSet;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Subscription status, mirroring the processor's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
}

impl SubscriptionStatus {
    /// Whether this status grants tenant access.
    pub fn counts_as_active(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }

    /// Parse a processor status string; rejects anything outside the
    /// closed set.
    pub fn from_processor_str(s: &str) -> CommerceResult<Self> {
        match s {
            "incomplete" => Ok(Self::Incomplete),
            "incomplete_expired" => Ok(Self::IncompleteExpired),
            "trialing" => Ok(Self::Trialing),
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "canceled" => Ok(Self::Canceled),
            "unpaid" => Ok(Self::Unpaid),
            other => Err(CommerceError::UnknownStatus(other.to_string())),
        }
    }

    /// The processor-side spelling.
    pub fn as_processor_str(&self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_processor_str())
    }
}

/// A store's binding to a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub store_id: StoreId,
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    /// Processor correlation ids, attached once checkout completes.
    pub processor_subscription_id: Option<String>,
    pub processor_customer_id: Option<String>,
    /// Billing period: [start, end).
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub last_payment_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// What a webhook delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// State was changed.
    Applied,
    /// Event id already processed; nothing done.
    Duplicate,
    /// Recognized (or unknown) event with nothing to change; logged.
    Ignored,
}

/// Subscription manager
///
/// Exclusive writer of subscription rows. The resolver and the limit
/// engine only ever read through it.
pub struct SubscriptionManager {
    subscriptions: Arc<RwLock<HashMap<SubscriptionId, Subscription>>>,
    processed_events: DashSet<String>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            processed_events: DashSet::new(),
        }
    }

    /// Create the signup subscription for a store.
    ///
    /// Free and Basic tiers have nothing to collect before the first
    /// invoice and start `ACTIVE`; Pro and Enterprise start `TRIALING`
    /// until `checkout.session.completed` confirms payment.
    pub fn create_for_signup(
        &self,
        store_id: &StoreId,
        plan: &SubscriptionPlan,
    ) -> CommerceResult<Subscription> {
        let mut subs = self.subscriptions.write();
        let already_active = subs
            .values()
            .any(|s| s.store_id == *store_id && s.status.counts_as_active());
        if already_active {
            return Err(CommerceError::Invalid(
                "store already has an active subscription".into(),
            ));
        }

        let status = match plan.plan_type {
            PlanType::Free | PlanType::Basic => SubscriptionStatus::Active,
            PlanType::Pro | PlanType::Enterprise => SubscriptionStatus::Trialing,
        };

        let now = Utc::now();
        let subscription = Subscription {
            id: SubscriptionId::generate(),
            store_id: store_id.clone(),
            plan_id: plan.id.clone(),
            status,
            processor_subscription_id: None,
            processor_customer_id: None,
            current_period_start: now,
            current_period_end: now + Duration::days(plan.interval.days()),
            cancel_at_period_end: false,
            canceled_at: None,
            last_payment_at: None,
            created_at: now,
        };

        subs.insert(subscription.id.clone(), subscription.clone());
        Ok(subscription)
    }

    /// Get subscription by id.
    pub fn get(&self, id: &SubscriptionId) -> Option<Subscription> {
        self.subscriptions.read().get(id).cloned()
    }

    /// The store's counts-as-active subscription, if any.
    pub fn active_for_store(&self, store_id: &StoreId) -> Option<Subscription> {
        self.subscriptions
            .read()
            .values()
            .find(|s| s.store_id == *store_id && s.status.counts_as_active())
            .cloned()
    }

    /// The store's current subscription for reporting: the newest row in
    /// ACTIVE, TRIALING or PAST_DUE, so gating can say *why* access fails.
    pub fn current_for_store(&self, store_id: &StoreId) -> Option<Subscription> {
        self.subscriptions
            .read()
            .values()
            .filter(|s| {
                s.store_id == *store_id
                    && matches!(
                        s.status,
                        SubscriptionStatus::Active
                            | SubscriptionStatus::Trialing
                            | SubscriptionStatus::PastDue
                    )
            })
            .max_by_key(|s| s.created_at)
            .cloned()
    }

    /// The newest subscription row for a store regardless of status.
    pub fn latest_for_store(&self, store_id: &StoreId) -> Option<Subscription> {
        self.subscriptions
            .read()
            .values()
            .filter(|s| s.store_id == *store_id)
            .max_by_key(|s| s.created_at)
            .cloned()
    }

    fn find_by_processor_id(
        subs: &HashMap<SubscriptionId, Subscription>,
        processor_id: &str,
    ) -> Option<SubscriptionId> {
        subs.values()
            .find(|s| s.processor_subscription_id.as_deref() == Some(processor_id))
            .map(|s| s.id.clone())
    }

    /// Cancel the store's current subscription, immediately or at the
    /// period boundary. The outbound processor cancel goes through the
    /// gateway; this records the platform's side.
    pub fn cancel(&self, store_id: &StoreId, at_period_end: bool) -> CommerceResult<Subscription> {
        let mut subs = self.subscriptions.write();
        let id = subs
            .values()
            .filter(|s| s.store_id == *store_id && s.status != SubscriptionStatus::Canceled)
            .max_by_key(|s| s.created_at)
            .map(|s| s.id.clone())
            .ok_or(CommerceError::SubscriptionNotFound)?;

        let sub = subs.get_mut(&id).expect("id from same map");
        if at_period_end {
            sub.cancel_at_period_end = true;
        } else {
            sub.status = SubscriptionStatus::Canceled;
            sub.canceled_at = Some(Utc::now());
        }
        Ok(sub.clone())
    }

    /// Apply one webhook delivery.
    ///
    /// Duplicate event ids are skipped. The id is recorded only after the
    /// handler succeeds, so an errored apply stays unacknowledged and the
    /// processor's retry gets another chance.
    pub fn apply_event(
        &self,
        event: &WebhookEvent,
        plans: &PlanCatalog,
    ) -> CommerceResult<EventOutcome> {
        if self.processed_events.contains(&event.id) {
            tracing::debug!(event_id = %event.id, "duplicate processor event ignored");
            return Ok(EventOutcome::Duplicate);
        }
        let outcome = self.dispatch(&event.event, plans)?;
        self.processed_events.insert(event.id.clone());
        Ok(outcome)
    }

    fn dispatch(&self, event: &ProcessorEvent, plans: &PlanCatalog) -> CommerceResult<EventOutcome> {
        match event {
            ProcessorEvent::CheckoutCompleted(session) => self.on_checkout_completed(session, plans),
            ProcessorEvent::SubscriptionCreated(sub) | ProcessorEvent::SubscriptionUpdated(sub) => {
                self.on_subscription_updated(sub)
            }
            ProcessorEvent::SubscriptionDeleted(sub) => self.on_subscription_deleted(sub),
            ProcessorEvent::InvoicePaymentSucceeded(invoice) => self.on_invoice_outcome(invoice, true),
            ProcessorEvent::InvoicePaymentFailed(invoice) => self.on_invoice_outcome(invoice, false),
            ProcessorEvent::TrialWillEnd(sub) => {
                tracing::info!(processor_subscription = %sub.id, "trial ending soon");
                Ok(EventOutcome::Ignored)
            }
            ProcessorEvent::Unknown { event_type } => {
                tracing::warn!(%event_type, "unhandled processor event type");
                Ok(EventOutcome::Ignored)
            }
        }
    }

    fn on_checkout_completed(
        &self,
        session: &CheckoutSession,
        plans: &PlanCatalog,
    ) -> CommerceResult<EventOutcome> {
        if session.status.as_deref() != Some("complete") {
            return Ok(EventOutcome::Ignored);
        }
        let processor_sub_id = session.subscription.clone().ok_or_else(|| {
            CommerceError::Invalid("checkout session missing subscription id".into())
        })?;
        let store_id = session
            .metadata
            .store_id
            .as_deref()
            .map(StoreId::new)
            .transpose()?
            .ok_or_else(|| CommerceError::Invalid("checkout session missing store metadata".into()))?;
        let plan_id = session
            .metadata
            .plan_id
            .as_deref()
            .map(PlanId::new)
            .transpose()?
            .ok_or_else(|| CommerceError::Invalid("checkout session missing plan metadata".into()))?;
        let plan = plans
            .get(&plan_id)
            .ok_or_else(|| CommerceError::PlanNotFound(plan_id.clone()))?;

        let mut subs = self.subscriptions.write();

        // Redelivery after the dedup set was lost, or an out-of-order
        // update already attached the ids: just refresh the correlation.
        if let Some(id) = Self::find_by_processor_id(&subs, &processor_sub_id) {
            let sub = subs.get_mut(&id).expect("id from same map");
            sub.processor_customer_id = session.customer.clone();
            return Ok(EventOutcome::Applied);
        }

        let now = Utc::now();
        // Bind to the signup row when the store has one that is not
        // canceled; otherwise this checkout creates the first row.
        let existing = subs
            .values()
            .filter(|s| s.store_id == store_id && s.status != SubscriptionStatus::Canceled)
            .max_by_key(|s| s.created_at)
            .map(|s| s.id.clone());

        match existing {
            Some(id) => {
                let sub = subs.get_mut(&id).expect("id from same map");
                sub.plan_id = plan.id.clone();
                sub.status = SubscriptionStatus::Active;
                sub.processor_subscription_id = Some(processor_sub_id);
                sub.processor_customer_id = session.customer.clone();
                sub.current_period_start = now;
                sub.current_period_end = now + Duration::days(plan.interval.days());
            }
            None => {
                let sub = Subscription {
                    id: SubscriptionId::generate(),
                    store_id,
                    plan_id: plan.id.clone(),
                    status: SubscriptionStatus::Active,
                    processor_subscription_id: Some(processor_sub_id),
                    processor_customer_id: session.customer.clone(),
                    current_period_start: now,
                    current_period_end: now + Duration::days(plan.interval.days()),
                    cancel_at_period_end: false,
                    canceled_at: None,
                    last_payment_at: None,
                    created_at: now,
                };
                subs.insert(sub.id.clone(), sub);
            }
        }
        Ok(EventOutcome::Applied)
    }

    /// Processor payload is authoritative: overwrite status, period
    /// bounds and the cancel flag verbatim.
    fn on_subscription_updated(&self, obj: &ProcessorSubscription) -> CommerceResult<EventOutcome> {
        let status = match SubscriptionStatus::from_processor_str(&obj.status) {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(status = %obj.status, "unrecognized subscription status in event");
                return Ok(EventOutcome::Ignored);
            }
        };

        let mut subs = self.subscriptions.write();
        let Some(id) = Self::find_by_processor_id(&subs, &obj.id) else {
            tracing::warn!(processor_subscription = %obj.id, "event for unknown subscription");
            return Ok(EventOutcome::Ignored);
        };
        let sub = subs.get_mut(&id).expect("id from same map");

        sub.status = status;
        if let Some(start) = obj.current_period_start.and_then(|ts| DateTime::from_timestamp(ts, 0)) {
            sub.current_period_start = start;
        }
        if let Some(end) = obj.current_period_end.and_then(|ts| DateTime::from_timestamp(ts, 0)) {
            sub.current_period_end = end;
        }
        sub.cancel_at_period_end = obj.cancel_at_period_end;
        if let Some(customer) = &obj.customer {
            sub.processor_customer_id = Some(customer.clone());
        }
        Ok(EventOutcome::Applied)
    }

    fn on_subscription_deleted(&self, obj: &ProcessorSubscription) -> CommerceResult<EventOutcome> {
        let mut subs = self.subscriptions.write();
        let Some(id) = Self::find_by_processor_id(&subs, &obj.id) else {
            tracing::warn!(processor_subscription = %obj.id, "delete event for unknown subscription");
            return Ok(EventOutcome::Ignored);
        };
        let sub = subs.get_mut(&id).expect("id from same map");
        sub.status = SubscriptionStatus::Canceled;
        sub.canceled_at = Some(Utc::now());
        Ok(EventOutcome::Applied)
    }

    fn on_invoice_outcome(
        &self,
        invoice: &ProcessorInvoice,
        succeeded: bool,
    ) -> CommerceResult<EventOutcome> {
        let Some(processor_sub_id) = invoice.subscription.as_deref() else {
            return Ok(EventOutcome::Ignored);
        };
        let mut subs = self.subscriptions.write();
        let Some(id) = Self::find_by_processor_id(&subs, processor_sub_id) else {
            tracing::warn!(processor_subscription = %processor_sub_id, "invoice event for unknown subscription");
            return Ok(EventOutcome::Ignored);
        };
        let sub = subs.get_mut(&id).expect("id from same map");

        if succeeded {
            sub.status = SubscriptionStatus::Active;
            sub.last_payment_at = Some(Utc::now());
        } else {
            sub.status = SubscriptionStatus::PastDue;
            tracing::info!(store = %sub.store_id, "invoice payment failed, subscription past due");
        }
        Ok(EventOutcome::Applied)
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
