//! User fixtures

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use shared::unique_token;

pub const DEFAULT_PASSWORD: &str = "Test@123456";

/// Registration payload for the auth service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFixture {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserFixture {
    /// Fresh user with a unique e-mail address
    pub fn generate() -> Self {
        Self::with_email(format!("test.{}@example.com", unique_token()))
    }

    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: DEFAULT_PASSWORD.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        }
    }

    /// Fails validation in several ways at once
    pub fn invalid() -> Value {
        json!({
            "email": "invalid-email",
            "password": "123",
            "firstName": "",
            "lastName": "",
        })
    }

    pub fn missing_email() -> Value {
        json!({
            "password": DEFAULT_PASSWORD,
            "firstName": "Test",
            "lastName": "User",
        })
    }

    pub fn malformed_email() -> Value {
        json!({
            "email": "invalid-email",
            "password": DEFAULT_PASSWORD,
            "firstName": "Test",
            "lastName": "User",
        })
    }

    pub fn weak_password() -> Value {
        json!({
            "email": Self::generate().email,
            "password": "123",
            "firstName": "Test",
            "lastName": "User",
        })
    }

    pub fn missing_first_name() -> Value {
        json!({
            "email": Self::generate().email,
            "password": DEFAULT_PASSWORD,
            "lastName": "User",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_user_shape() {
        let user = UserFixture::generate();
        assert!(user.email.starts_with("test."));
        assert!(user.email.ends_with("@example.com"));
        assert_eq!(user.password, DEFAULT_PASSWORD);

        let wire = serde_json::to_value(&user).unwrap();
        assert_eq!(wire["firstName"], "Test");
        assert_eq!(wire["lastName"], "User");
    }

    #[test]
    fn test_invalid_variants_omit_or_break_fields() {
        assert!(UserFixture::missing_email().get("email").is_none());
        assert!(UserFixture::missing_first_name().get("firstName").is_none());
        assert_eq!(UserFixture::weak_password()["password"], "123");
        assert_eq!(UserFixture::malformed_email()["email"], "invalid-email");
    }
}
