use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;

use crate::{api::ApiUrls, app_error::AppError};

#[derive(Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// Create a payment intent at the gateway for an integer amount of cents.
/// The caller validates the amount before calling.
pub async fn create_payment_intent(
    client: &Client,
    secret_key: &str,
    amount_in_cents: i64,
) -> Result<PaymentIntent, AppError> {
    let url = ApiUrls::get_payment_gateway_url();
    let params = [
        ("amount", amount_in_cents.to_string()),
        ("currency", "usd".to_string()),
        ("automatic_payment_methods[enabled]", "true".to_string()),
    ];

    let response = client
        .post(format!("{}/v1/payment_intents", url))
        .basic_auth(secret_key, None::<&str>)
        .form(&params)
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("PaymentGateway".into()))?;

    let response = response
        .error_for_status()
        .context("Payment gateway rejected the intent request")?;

    let intent: PaymentIntent = response
        .json()
        .await
        .context("Failed to parse payment gateway response")?;

    Ok(intent)
}
