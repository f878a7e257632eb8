//! Known platform services and their localhost defaults

use super::{DEFAULT_HEALTH_PATH, ServiceDescriptor};

#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    /// Short key used on the command line and in `READINESS_SERVICES`
    pub key: &'static str,
    pub name: &'static str,
    /// Prefix of the `<PREFIX>_SERVICE_URL`, `<PREFIX>_SERVICE_HEALTH_PATH` and
    /// `<PREFIX>_SERVICE_HEALTH_URL` variables
    pub env_prefix: &'static str,
    pub default_url: &'static str,
}

impl CatalogEntry {
    pub fn url_var(&self) -> String {
        format!("{}_SERVICE_URL", self.env_prefix)
    }

    pub fn health_path_var(&self) -> String {
        format!("{}_SERVICE_HEALTH_PATH", self.env_prefix)
    }

    pub fn health_url_var(&self) -> String {
        format!("{}_SERVICE_HEALTH_URL", self.env_prefix)
    }

    pub fn default_descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor::new(self.name, self.default_url, DEFAULT_HEALTH_PATH)
    }
}

pub const SERVICE_CATALOG: &[CatalogEntry] = &[
    CatalogEntry { key: "auth", name: "Auth Service", env_prefix: "AUTH", default_url: "http://localhost:3001" },
    CatalogEntry { key: "user", name: "User Service", env_prefix: "USER", default_url: "http://localhost:3002" },
    CatalogEntry { key: "product", name: "Product Service", env_prefix: "PRODUCT", default_url: "http://localhost:8003" },
    CatalogEntry { key: "inventory", name: "Inventory Service", env_prefix: "INVENTORY", default_url: "http://localhost:5000" },
    CatalogEntry { key: "cart", name: "Cart Service", env_prefix: "CART", default_url: "http://localhost:8085" },
    CatalogEntry { key: "order", name: "Order Service", env_prefix: "ORDER", default_url: "http://localhost:5088" },
    CatalogEntry { key: "payment", name: "Payment Service", env_prefix: "PAYMENT", default_url: "http://localhost:5089" },
    CatalogEntry { key: "order-processor", name: "Order Processor Service", env_prefix: "ORDER_PROCESSOR", default_url: "http://localhost:5007" },
    CatalogEntry { key: "review", name: "Review Service", env_prefix: "REVIEW", default_url: "http://localhost:9001" },
    CatalogEntry { key: "admin", name: "Admin Service", env_prefix: "ADMIN", default_url: "http://localhost:3010" },
    CatalogEntry { key: "audit", name: "Audit Service", env_prefix: "AUDIT", default_url: "http://localhost:4010" },
    CatalogEntry { key: "notification", name: "Notification Service", env_prefix: "NOTIFICATION", default_url: "http://localhost:3003" },
    CatalogEntry { key: "message-broker", name: "Message Broker", env_prefix: "MESSAGE_BROKER", default_url: "http://localhost:4000" },
];
