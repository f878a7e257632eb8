//! End-to-End Suites
//!
//! Journeys whose effects surface asynchronously in another service: a
//! welcome e-mail, an order in the customer's history, a product aggregate.
//! Every wait is a bounded poll.

use std::time::Duration;

use serde_json::{Value, json};

use super::integration::{addressed_to, order_payload};
use super::{authenticated_session, skip_all};
use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::{UserFixture, generate_user};
use crate::runner::{HarnessContext, SuiteRun};
use crate::runtime::{CleanupTask, RequestOptions, RetryPolicy, poll_until};
use crate::testing::assertions::{ensure, expect_eq, expect_field, expect_rejected, status};
use crate::testing::json::{id_of, number_or_zero, unwrap_envelope};

const WELCOME_EMAIL_TIMEOUT: Duration = Duration::from_secs(15);
const WELCOME_EMAIL_INTERVAL: Duration = Duration::from_secs(2);
const AGGREGATE_TIMEOUT: Duration = Duration::from_secs(15);
const AGGREGATE_INTERVAL: Duration = Duration::from_secs(1);

/// First Mailpit message whose subject contains `subject` and that is addressed to `email`
async fn find_email(ctx: &HarnessContext, subject: &str, email: &str) -> Option<Value> {
    let response = ctx.client.get(&ctx.mailpit("/messages"), &RequestOptions::new()).await.ok()?;
    response
        .data
        .get("messages")?
        .as_array()?
        .iter()
        .find(|message| {
            let subject_matches = message.get("Subject").and_then(Value::as_str).is_some_and(|s| s.contains(subject));
            subject_matches && addressed_to(message, email)
        })
        .cloned()
}

pub async fn user_registration(run: &SuiteRun<'_>) -> HarnessResult<()> {
    let ctx = run.ctx();
    let auth = &ctx.auth;

    if let Err(e) = ctx.client.delete(&ctx.mailpit("/messages"), &RequestOptions::new()).await {
        tracing::warn!("⚠️ Could not clear Mailpit: {}", e);
    }

    let registered = run
        .case("register a new user", async {
            let payload = generate_user(None);
            let registration = auth.register(&payload).await?;
            run.cleanup(CleanupTask::DeleteUser { user_id: registration.user_id.clone(), token: None });

            let message = registration.body.get("message").and_then(Value::as_str).unwrap_or_default();
            ensure(message.contains("Registration successful"), format!("unexpected message '{message}'"))?;
            ensure(registration.requires_verification, "registration should require verification")?;
            expect_eq(registration.user().get("email"), payload.get("email"), "registered email")?;
            Ok(registration)
        })
        .await;

    match &registered {
        Some(registration) => {
            let email = registration.email.as_str();

            run.case("user is stored in the user service", async {
                let stored = auth.find_user_by_email(email, None).await?;
                expect_eq(id_of(&stored).as_deref(), Some(registration.user_id.as_str()), "user id")?;
                expect_eq(stored.get("email"), Some(&json!(email)), "email")?;
                expect_eq(stored.get("isActive"), Some(&json!(true)), "isActive")
            })
            .await;

            run.case("welcome e-mail is delivered", async {
                let policy = RetryPolicy::within(WELCOME_EMAIL_TIMEOUT, WELCOME_EMAIL_INTERVAL);
                let message = poll_until("welcome e-mail", &policy, || find_email(ctx, "Welcome", email)).await?;
                let subject = message.get("Subject").and_then(Value::as_str).unwrap_or_default();
                tracing::info!("📧 Welcome e-mail received: {}", subject);
                ensure(addressed_to(&message, email), "welcome e-mail has the wrong recipient")
            })
            .await;

            run.case("reject duplicate registration", async {
                let payload = json!({
                    "email": email,
                    "password": registration.password,
                    "firstName": "Test",
                    "lastName": "User",
                });
                expect_rejected(auth.register_raw(&payload).await, status::DUPLICATE).map(|_| ())
            })
            .await;
        }
        None => skip_all(
            run,
            &["user is stored in the user service", "welcome e-mail is delivered", "reject duplicate registration"],
            "registration failed",
        ),
    }

    run.case("validate required fields", async {
        expect_rejected(auth.register_raw(&UserFixture::invalid()).await, status::VALIDATION).map(|_| ())
    })
    .await;

    Ok(())
}

pub async fn order_placement(run: &SuiteRun<'_>) -> HarnessResult<()> {
    let ctx = run.ctx();
    let client = &ctx.client;
    let products = ctx.service("product")?;

    run.case("catalogue lists products", async {
        let response = client.get(&products.endpoint("/api/products"), &RequestOptions::new().query("limit", 5)).await?;
        let listed = response.data.get("products").and_then(Value::as_array).map_or(0, Vec::len);
        ensure(listed > 0, "catalogue should not be empty")
    })
    .await;

    let dependent_cases = ["order is placed", "order appears in customer history"];
    let Some(session) = run.case("customer can log in", authenticated_session(run, None)).await else {
        skip_all(run, &dependent_cases, "no authenticated session");
        return Ok(());
    };
    let options = RequestOptions::authenticated(&session);
    let options = &options;

    let placed = run
        .case("order is placed", async {
            let response = client.post(&ctx.bff("/api/orders"), &order_payload(&session.user_id), options).await?;
            let order = unwrap_envelope(&response.data).clone();
            expect_eq(order.get("customerId"), Some(&json!(session.user_id)), "customerId")?;
            let order_id = expect_field(&order, "/id")?
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| HarnessError::assertion("order id should be a string"))?;
            Ok(order_id)
        })
        .await;

    let Some(order_id) = placed else {
        skip_all(run, &dependent_cases[1..], "order was not placed");
        return Ok(());
    };

    let order_id = order_id.as_str();
    run.case("order appears in customer history", async {
        let policy = RetryPolicy::within(AGGREGATE_TIMEOUT, AGGREGATE_INTERVAL);
        poll_until("order in customer history", &policy, move || async move {
            let response = client.get(&ctx.bff("/api/orders/my"), options).await.ok()?;
            unwrap_envelope(&response.data)
                .as_array()?
                .iter()
                .any(|order| order.get("id").and_then(Value::as_str) == Some(order_id))
                .then_some(())
        })
        .await
    })
    .await;

    Ok(())
}

/// Product aggregates as the product service reports them
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReviewAggregate {
    review_count: u64,
    average_rating: f64,
}

impl ReviewAggregate {
    fn of(product: &Value) -> Self {
        Self {
            review_count: product.get("review_count").and_then(Value::as_u64).unwrap_or(0),
            average_rating: number_or_zero(product, "average_rating"),
        }
    }
}

pub async fn product_review(run: &SuiteRun<'_>) -> HarnessResult<()> {
    let ctx = run.ctx();
    let client = &ctx.client;
    let products = ctx.service("product")?;
    let reviews = ctx.service("review")?;
    let none = RequestOptions::new();
    let none = &none;

    let aggregate_of = move |product_id: String| async move {
        let url = products.endpoint(&format!("/api/products/{product_id}"));
        client.get(&url, none).await.ok().map(|response| ReviewAggregate::of(&response.data))
    };

    let setup = run
        .case("pick a product and a reviewer", async {
            let listing = client.get(&products.endpoint("/api/products"), &RequestOptions::new().query("limit", 1)).await?;
            let product = listing
                .data
                .pointer("/products/0")
                .ok_or_else(|| HarnessError::skipped("catalogue is empty"))?;
            let product_id = id_of(product).ok_or_else(|| HarnessError::assertion("listed product has no id"))?;

            let registration = ctx.auth.register(&generate_user(None)).await?;
            run.cleanup(CleanupTask::DeleteUser { user_id: registration.user_id.clone(), token: None });
            Ok((product_id, registration.user_id, ReviewAggregate::of(product)))
        })
        .await;

    let review_cases = [
        "create a review",
        "product aggregate counts the review",
        "update the review",
        "delete the review",
        "product aggregate returns to its initial count",
    ];
    let Some((product_id, user_id, initial)) = setup else {
        skip_all(run, &review_cases, "no product or reviewer");
        return Ok(());
    };
    let product_id = product_id.as_str();
    tracing::info!(
        "📦 Product {}: {} review(s), rating {}",
        product_id,
        initial.review_count,
        initial.average_rating
    );

    let created = run
        .case("create a review", async {
            let review = json!({
                "productId": product_id,
                "userId": user_id,
                "rating": 5,
                "title": "Excellent Product!",
                "comment": "This is an automated E2E test review. Product quality is amazing!",
                "verified": true,
            });
            let response = client.post(&reviews.endpoint("/api/reviews"), &review, none).await?;
            expect_eq(response.status, 201, "review status")?;
            expect_eq(response.data.pointer("/review/rating"), Some(&json!(5)), "review rating")?;
            let review_id = id_of(expect_field(&response.data, "/review")?)
                .ok_or_else(|| HarnessError::assertion("created review has no id"))?;
            run.cleanup(CleanupTask::DeleteReview { review_id: review_id.clone(), token: None });
            Ok(review_id)
        })
        .await;

    let Some(review_id) = created else {
        skip_all(run, &review_cases[1..], "review was not created");
        return Ok(());
    };
    let review_url = reviews.endpoint(&format!("/api/reviews/{review_id}"));
    let review_url = review_url.as_str();
    let policy = RetryPolicy::within(AGGREGATE_TIMEOUT, AGGREGATE_INTERVAL);
    let policy = &policy;

    run.case("product aggregate counts the review", async {
        let expected = initial.review_count + 1;
        let updated = poll_until("review count increment", policy, move || async move {
            aggregate_of(product_id.to_string()).await.filter(|a| a.review_count == expected)
        })
        .await?;
        ensure(updated.average_rating > 0.0, "average rating should be positive")
    })
    .await;

    run.case("update the review", async {
        let update = json!({ "rating": 4, "title": "Good Product", "comment": "Updated review after more use." });
        let response = client.put(review_url, &update, none).await?;
        expect_eq(response.data.pointer("/review/rating"), Some(&json!(4)), "updated rating")
    })
    .await;

    run.case("delete the review", async {
        let response = client.delete(review_url, none).await?;
        expect_eq(response.status, 200, "delete status")
    })
    .await;

    run.case("product aggregate returns to its initial count", async {
        poll_until("review count restore", policy, move || async move {
            aggregate_of(product_id.to_string())
                .await
                .filter(|a| a.review_count == initial.review_count)
        })
        .await
        .map(|_| ())
    })
    .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_aggregate_defaults() {
        assert_eq!(
            ReviewAggregate::of(&json!({ "name": "x" })),
            ReviewAggregate { review_count: 0, average_rating: 0.0 }
        );
        let product = json!({ "review_count": 3, "average_rating": 4.5 });
        assert_eq!(ReviewAggregate::of(&product).review_count, 3);
    }
}
