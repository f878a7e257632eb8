//! JSON helpers for loosely shaped platform responses

use serde_json::Value;

/// Strip up to two levels of `{ "data": ... }` wrapping
///
/// The BFF wraps service responses, sometimes twice.
pub fn unwrap_envelope(body: &Value) -> &Value {
    let mut current = body;
    for _ in 0..2 {
        match current.get("data") {
            Some(inner) if !inner.is_null() => current = inner,
            _ => break,
        }
    }
    current
}

/// First string found at any of the given JSON pointers
pub fn first_string(body: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .find_map(|value| value.as_str().map(str::to_string))
}

/// Entity id under `_id` or `id`
pub fn id_of(entity: &Value) -> Option<String> {
    first_string(entity, &["/_id", "/id"])
}

pub fn items_of(cart: &Value) -> &[Value] {
    cart.get("items").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

pub fn number_or_zero(entity: &Value, field: &str) -> f64 {
    entity.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_envelope_levels() {
        let cart = json!({ "items": [] });
        assert_eq!(unwrap_envelope(&json!({ "data": { "data": cart.clone() } })), &cart);
        assert_eq!(unwrap_envelope(&json!({ "data": cart.clone() })), &cart);
        assert_eq!(unwrap_envelope(&cart), &cart);
        assert_eq!(unwrap_envelope(&json!({ "data": null, "x": 1 })), &json!({ "data": null, "x": 1 }));
    }

    #[test]
    fn test_id_and_first_string() {
        assert_eq!(id_of(&json!({ "_id": "a" })).as_deref(), Some("a"));
        assert_eq!(id_of(&json!({ "id": "b" })).as_deref(), Some("b"));
        assert_eq!(id_of(&json!({ "id": 7 })), None);
        assert_eq!(
            first_string(&json!({ "data": { "jwt": "t" } }), &["/token", "/data/jwt"]).as_deref(),
            Some("t")
        );
    }

    #[test]
    fn test_items_and_numbers() {
        let cart = json!({ "items": [{ "price": 2.5 }] });
        assert_eq!(items_of(&cart).len(), 1);
        assert!(items_of(&json!({})).is_empty());
        assert_eq!(number_or_zero(&items_of(&cart)[0], "price"), 2.5);
        assert_eq!(number_or_zero(&json!({}), "review_count"), 0.0);
    }
}
