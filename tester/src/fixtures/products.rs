//! Product fixtures

use serde::{Deserialize, Serialize};

use shared::unique_token;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFixture {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock: u32,
    pub sku: String,
}

impl ProductFixture {
    /// Fresh product with unique id and sku
    pub fn generate() -> Self {
        let token = unique_token();
        Self {
            product_id: format!("test-product-{token}"),
            name: format!("Test Product {token}"),
            description: "A test product for automated testing".to_string(),
            price: 29.99,
            category: "test-category".to_string(),
            stock: 100,
            sku: format!("SKU-{}", token.to_uppercase()),
        }
    }

    /// `count` unique products priced 10, 20, 30, ...
    pub fn batch(count: usize) -> Vec<Self> {
        (0..count)
            .map(|i| Self {
                name: format!("Batch Product {i}"),
                price: 10.0 + i as f64 * 10.0,
                ..Self::generate()
            })
            .collect()
    }

    pub fn electronics() -> Self {
        Self::sample("test-electronics-001", "Test Laptop", "High-performance test laptop", 999.99, "electronics", 50, "LAPTOP-001")
    }

    pub fn clothing() -> Self {
        Self::sample("test-clothing-001", "Test T-Shirt", "Comfortable test t-shirt", 19.99, "clothing", 200, "TSHIRT-001")
    }

    pub fn out_of_stock() -> Self {
        Self::sample("test-out-of-stock", "Out of Stock Product", "This product is out of stock", 49.99, "test", 0, "OOS-001")
    }

    pub fn expensive() -> Self {
        Self::sample("test-expensive-001", "Expensive Test Product", "Very expensive test product", 9999.99, "luxury", 5, "LUXURY-001")
    }

    #[allow(clippy::too_many_arguments)]
    fn sample(
        product_id: &str,
        name: &str,
        description: &str,
        price: f64,
        category: &str,
        stock: u32,
        sku: &str,
    ) -> Self {
        Self {
            product_id: product_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            category: category.to_string(),
            stock,
            sku: sku.to_string(),
        }
    }
}
