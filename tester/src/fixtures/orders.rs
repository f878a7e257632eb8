//! Order fixtures

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl OrderItem {
    pub fn new(product_id: impl Into<String>, product_name: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl Address {
    pub fn test() -> Self {
        Self {
            address_line1: "123 Test Street".to_string(),
            address_line2: Some("Apt 4B".to_string()),
            city: "Test City".to_string(),
            state: "TC".to_string(),
            zip_code: "12345".to_string(),
            country: "USA".to_string(),
        }
    }

    pub fn sample() -> Self {
        Self {
            address_line1: "456 Main Street".to_string(),
            address_line2: Some("Suite 100".to_string()),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            country: "USA".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFixture {
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    pub billing_address: Address,
}

impl OrderFixture {
    /// Two-item order shipped and billed to the test address
    pub fn generate(customer_id: &str) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            items: vec![
                OrderItem::new("test-product-001", "Test Product 1", 2, 29.99),
                OrderItem::new("test-product-002", "Test Product 2", 1, 49.99),
            ],
            shipping_address: Address::test(),
            billing_address: Address::test(),
        }
    }

    pub fn simple(customer_id: &str) -> Self {
        let address = Address {
            address_line1: "123 Test St".to_string(),
            address_line2: None,
            ..Address::test()
        };
        Self {
            customer_id: customer_id.to_string(),
            items: vec![OrderItem::new("test-product-001", "Test Product", 1, 29.99)],
            shipping_address: address.clone(),
            billing_address: address,
        }
    }

    /// Ten items with random quantities (1-5) and prices (10-109)
    pub fn large(customer_id: &str) -> Self {
        let mut rng = rand::thread_rng();
        let items = (0..10)
            .map(|i| {
                OrderItem::new(
                    format!("test-product-{i}"),
                    format!("Test Product {i}"),
                    rng.gen_range(1..=5),
                    rng.gen_range(10..110) as f64,
                )
            })
            .collect();
        let address = Address {
            address_line2: None,
            ..Address::test()
        };
        Self {
            customer_id: customer_id.to_string(),
            items,
            shipping_address: address.clone(),
            billing_address: address,
        }
    }

    /// Empty items and no addresses
    pub fn invalid(customer_id: &str) -> Value {
        json!({
            "customerId": customer_id,
            "items": [],
        })
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}
