//! Payment-processor webhook events
//!
//! The processor pushes lifecycle events as a JSON envelope
//! `{ id, type, data: { object } }`. Event type strings are the
//! processor's wire contract and are matched verbatim here; anything
//! outside the known set decodes to [`ProcessorEvent::Unknown`], which
//! handlers log and ignore rather than fail.

use commerce_common::{CommerceError, CommerceResult};
use serde::Deserialize;

/// A decoded webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Processor event id, used for at-least-once deduplication.
    pub id: String,
    /// The decoded payload.
    pub event: ProcessorEvent,
}

/// Tagged union of processor lifecycle events.
#[derive(Debug, Clone)]
pub enum ProcessorEvent {
    /// `checkout.session.completed`
    CheckoutCompleted(CheckoutSession),
    /// `customer.subscription.created`
    SubscriptionCreated(ProcessorSubscription),
    /// `customer.subscription.updated`
    SubscriptionUpdated(ProcessorSubscription),
    /// `customer.subscription.deleted`
    SubscriptionDeleted(ProcessorSubscription),
    /// `invoice.payment_succeeded`
    InvoicePaymentSucceeded(ProcessorInvoice),
    /// `invoice.payment_failed`
    InvoicePaymentFailed(ProcessorInvoice),
    /// `customer.subscription.trial_will_end`
    TrialWillEnd(ProcessorSubscription),
    /// Any event type this platform does not consume.
    Unknown {
        /// The unrecognized wire type string.
        event_type: String,
    },
}

/// `data.object` of a checkout session event.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session status; only `complete` sessions are acted on.
    #[serde(default)]
    pub status: Option<String>,
    /// Processor subscription id created by the session.
    #[serde(default)]
    pub subscription: Option<String>,
    /// Processor customer id.
    #[serde(default)]
    pub customer: Option<String>,
    /// Caller-supplied reference (the platform sets the owner's user id).
    #[serde(default)]
    pub client_reference_id: Option<String>,
    /// Metadata the platform attached when creating the session.
    #[serde(default)]
    pub metadata: SessionMetadata,
}

/// Metadata attached to checkout sessions at creation time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionMetadata {
    #[serde(default, rename = "storeId")]
    pub store_id: Option<String>,
    #[serde(default, rename = "planId")]
    pub plan_id: Option<String>,
}

/// `data.object` of a subscription lifecycle event.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorSubscription {
    /// Processor subscription id.
    pub id: String,
    /// Processor customer id.
    #[serde(default)]
    pub customer: Option<String>,
    /// Processor status string, e.g. `active`, `past_due`.
    pub status: String,
    /// Period start, unix seconds.
    #[serde(default)]
    pub current_period_start: Option<i64>,
    /// Period end, unix seconds.
    #[serde(default)]
    pub current_period_end: Option<i64>,
    /// Whether the subscription ends at the period boundary.
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

/// `data.object` of an invoice event; only the correlation ids matter.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorInvoice {
    /// Processor subscription the invoice bills.
    #[serde(default)]
    pub subscription: Option<String>,
    /// Processor customer id.
    #[serde(default)]
    pub customer: Option<String>,
}

#[derive(Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

impl WebhookEvent {
    /// Decode a raw webhook body.
    ///
    /// Signature verification happens at the HTTP layer before the body
    /// reaches this function. A malformed envelope or a payload that does
    /// not match its declared type is an error; an unknown type is not.
    pub fn from_json(raw: &str) -> CommerceResult<Self> {
        let envelope: Envelope = serde_json::from_str(raw)
            .map_err(|e| CommerceError::Invalid(format!("malformed webhook envelope: {e}")))?;

        let object = envelope.data.object;
        let decode_err =
            |e: serde_json::Error| CommerceError::Invalid(format!("malformed event payload: {e}"));

        let event = match envelope.event_type.as_str() {
            "checkout.session.completed" => {
                ProcessorEvent::CheckoutCompleted(serde_json::from_value(object).map_err(decode_err)?)
            }
            "customer.subscription.created" => {
                ProcessorEvent::SubscriptionCreated(serde_json::from_value(object).map_err(decode_err)?)
            }
            "customer.subscription.updated" => {
                ProcessorEvent::SubscriptionUpdated(serde_json::from_value(object).map_err(decode_err)?)
            }
            "customer.subscription.deleted" => {
                ProcessorEvent::SubscriptionDeleted(serde_json::from_value(object).map_err(decode_err)?)
            }
            "invoice.payment_succeeded" => {
                ProcessorEvent::InvoicePaymentSucceeded(serde_json::from_value(object).map_err(decode_err)?)
            }
            "invoice.payment_failed" => {
                ProcessorEvent::InvoicePaymentFailed(serde_json::from_value(object).map_err(decode_err)?)
            }
            "customer.subscription.trial_will_end" => {
                ProcessorEvent::TrialWillEnd(serde_json::from_value(object).map_err(decode_err)?)
            }
            other => ProcessorEvent::Unknown {
                event_type: other.to_string(),
            },
        };

        Ok(Self {
            id: envelope.id,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_subscription_updated() {
        let raw = r#"{
            "id": "evt_1",
            "type": "customer.subscription.updated",
            "data": { "object": {
                "id": "sub_123",
                "customer": "cus_9",
                "status": "past_due",
                "current_period_start": 1700000000,
                "current_period_end": 1702592000,
                "cancel_at_period_end": true
            }}
        }"#;
        let event = WebhookEvent::from_json(raw).unwrap();
        assert_eq!(event.id, "evt_1");
        match event.event {
            ProcessorEvent::SubscriptionUpdated(sub) => {
                assert_eq!(sub.id, "sub_123");
                assert_eq!(sub.status, "past_due");
                assert!(sub.cancel_at_period_end);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_decodes_to_unknown() {
        let raw = r#"{
            "id": "evt_2",
            "type": "charge.refunded",
            "data": { "object": {} }
        }"#;
        let event = WebhookEvent::from_json(raw).unwrap();
        match event.event {
            ProcessorEvent::Unknown { event_type } => assert_eq!(event_type, "charge.refunded"),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn malformed_envelope_is_an_error() {
        assert!(WebhookEvent::from_json("{\"nope\": true}").is_err());
    }
}
