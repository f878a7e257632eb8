//! Event fixtures for the message broker publish contract

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use shared::{CorrelationId, unique_token};

pub fn generate_event_id() -> String {
    format!("evt-{}", unique_token())
}

/// Body of `POST /api/v1/publish`; `source`, `eventType` and `data` are required
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFixture {
    pub source: String,
    pub event_type: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

impl EventFixture {
    /// Fully populated event from `test-service`
    pub fn new(event_type: &str, data: Value) -> Self {
        Self {
            source: "test-service".to_string(),
            event_type: event_type.to_string(),
            data,
            event_version: Some("v1".to_string()),
            event_id: Some(generate_event_id()),
            timestamp: Some(Utc::now().to_rfc3339()),
            correlation_id: Some(CorrelationId::generate()),
            metadata: Some(json!({
                "userId": "test-user-123",
                "environment": "test",
            })),
            priority: None,
        }
    }

    /// Only the required fields
    pub fn minimal(source: &str, event_type: &str, data: Value) -> Self {
        Self {
            source: source.to_string(),
            event_type: event_type.to_string(),
            data,
            event_version: None,
            event_id: None,
            timestamp: None,
            correlation_id: None,
            metadata: None,
            priority: None,
        }
    }

    pub fn user_created(user_id: &str, email: &str) -> Self {
        Self::new(
            "user.created",
            json!({ "userId": user_id, "email": email, "firstName": "Test", "lastName": "User" }),
        )
    }

    pub fn user_updated(user_id: &str, updates: Value) -> Self {
        Self::new("user.updated", json!({ "userId": user_id, "updates": updates }))
    }

    pub fn user_deleted(user_id: &str) -> Self {
        Self::new("user.deleted", json!({ "userId": user_id }))
    }

    pub fn order_created(order_id: &str, customer_id: &str, total_amount: f64) -> Self {
        Self::new(
            "order.created",
            json!({ "orderId": order_id, "customerId": customer_id, "totalAmount": total_amount, "status": "pending" }),
        )
    }

    pub fn order_completed(order_id: &str) -> Self {
        Self::new(
            "order.completed",
            json!({ "orderId": order_id, "status": "completed", "completedAt": Utc::now().to_rfc3339() }),
        )
    }

    pub fn payment_processed(payment_id: &str, order_id: &str, amount: f64) -> Self {
        Self::new(
            "payment.processed",
            json!({ "paymentId": payment_id, "orderId": order_id, "amount": amount, "status": "success" }),
        )
    }

    pub fn notification_sent(notification_id: &str, user_id: &str, kind: &str) -> Self {
        Self::new(
            "notification.sent",
            json!({ "notificationId": notification_id, "userId": user_id, "type": kind, "sentAt": Utc::now().to_rfc3339() }),
        )
    }

    /// Missing `source` and `data`
    pub fn invalid() -> Value {
        json!({ "eventType": "test.invalid" })
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_event_wire_shape() {
        let event = EventFixture::order_created("o-1", "c-1", 42.5);
        let wire = serde_json::to_value(&event).unwrap();

        assert_eq!(wire["eventType"], "order.created");
        assert_eq!(wire["eventVersion"], "v1");
        assert!(wire["eventId"].as_str().unwrap().starts_with("evt-"));
        assert!(wire["correlationId"].as_str().unwrap().starts_with("corr-"));
        assert_eq!(wire["data"]["status"], "pending");
        assert!(wire.get("priority").is_none());
    }

    #[test]
    fn test_minimal_event_has_only_required_fields() {
        let wire = serde_json::to_value(EventFixture::minimal("svc", "t.created", json!({ "a": 1 }))).unwrap();
        let keys: Vec<&String> = wire.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_invalid_event_missing_required() {
        let invalid = EventFixture::invalid();
        assert!(invalid.get("source").is_none());
        assert!(invalid.get("data").is_none());
    }

    #[test]
    fn test_event_ids_unique() {
        assert_ne!(generate_event_id(), generate_event_id());
    }
}
