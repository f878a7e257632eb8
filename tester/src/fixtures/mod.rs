//! Fixture Generator
//!
//! Schema-valid sample payloads for the platform's domain entities. Every
//! generated fixture carries a uniqueness token (timestamp, process sequence
//! and random suffix) so parallel and repeated runs never collide on email,
//! sku or product id. Generation does no I/O and cannot fail.
//!
//! Typed overrides use struct update syntax:
//!
//! ```rust
//! use tester::fixtures::UserFixture;
//!
//! let user = UserFixture {
//!     first_name: "Cart".to_string(),
//!     ..UserFixture::generate()
//! };
//! ```
//!
//! Untyped overrides merge over the JSON payload, override winning:
//!
//! ```rust
//! use tester::fixtures::{Fixture, ProductFixture};
//!
//! let payload = ProductFixture::generate().with_overrides(serde_json::json!({ "stock": 0 }));
//! assert_eq!(payload["stock"], 0);
//! ```

pub mod events;
pub mod orders;
pub mod products;
pub mod users;

pub use events::{EventFixture, generate_event_id};
pub use orders::{Address, OrderFixture, OrderItem};
pub use products::ProductFixture;
pub use users::{DEFAULT_PASSWORD, UserFixture};

use serde::Serialize;
use serde_json::Value;

pub use shared::unique_token;

pub trait Fixture: Serialize {
    /// The fixture as a JSON payload
    fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Payload with `overrides` merged last; overriding keys win
    fn with_overrides(&self, overrides: Value) -> Value {
        merge_overrides(self.to_payload(), overrides)
    }

    /// Payload with one top-level field removed, for negative tests
    fn without(&self, field: &str) -> Value {
        let mut payload = self.to_payload();
        if let Value::Object(map) = &mut payload {
            map.remove(field);
        }
        payload
    }
}

impl Fixture for UserFixture {}
impl Fixture for ProductFixture {}
impl Fixture for OrderFixture {}
impl Fixture for EventFixture {}

/// Shallow merge: top-level keys of `overrides` replace those of `base`
///
/// A `null` override leaves the base untouched; a non-object override
/// replaces the whole payload.
pub fn merge_overrides(base: Value, overrides: Value) -> Value {
    match (base, overrides) {
        (base, Value::Null) => base,
        (Value::Object(mut base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, overrides) => overrides,
    }
}

pub fn generate_user(overrides: Option<Value>) -> Value {
    UserFixture::generate().with_overrides(overrides.unwrap_or(Value::Null))
}

pub fn generate_product(overrides: Option<Value>) -> Value {
    ProductFixture::generate().with_overrides(overrides.unwrap_or(Value::Null))
}

pub fn generate_order(customer_id: &str, overrides: Option<Value>) -> Value {
    OrderFixture::generate(customer_id).with_overrides(overrides.unwrap_or(Value::Null))
}

pub fn generate_event(event_type: &str, data: Value, overrides: Option<Value>) -> Value {
    EventFixture::new(event_type, data).with_overrides(overrides.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_override_wins_on_collision() {
        let payload = generate_user(Some(json!({ "firstName": "Override", "role": "admin" })));
        assert_eq!(payload["firstName"], "Override");
        assert_eq!(payload["role"], "admin");
        assert!(payload["email"].as_str().unwrap().ends_with("@example.com"));
    }

    #[test]
    fn test_null_override_keeps_base() {
        let base = json!({ "a": 1 });
        assert_eq!(merge_overrides(base.clone(), Value::Null), base);
        assert_eq!(merge_overrides(base, json!("replaced")), json!("replaced"));
    }

    #[test]
    fn test_without_removes_field() {
        let payload = EventFixture::minimal("svc", "t.created", json!({ "a": 1 })).without("source");
        assert!(payload.get("source").is_none());
        assert_eq!(payload["eventType"], "t.created");
    }

    #[test]
    fn test_uniqueness_keys_pairwise_distinct() {
        let mut emails = HashSet::new();
        let mut skus = HashSet::new();
        let mut product_ids = HashSet::new();

        for _ in 0..200 {
            let user = UserFixture::generate();
            let product = ProductFixture::generate();
            assert!(emails.insert(user.email));
            assert!(skus.insert(product.sku));
            assert!(product_ids.insert(product.product_id));
        }
    }

    #[test]
    fn test_generated_order_and_event_payloads() {
        let order = generate_order("cust-1", Some(json!({ "notes": "leave at door" })));
        assert_eq!(order["customerId"], "cust-1");
        assert_eq!(order["items"].as_array().unwrap().len(), 2);
        assert_eq!(order["notes"], "leave at door");

        let event = generate_event("order.created", json!({ "orderId": "o-1" }), None);
        assert_eq!(event["source"], "test-service");
        assert_eq!(event["data"]["orderId"], "o-1");
    }
}
