use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, Document, doc, oid::ObjectId};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    api,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, AuthClaims},
    models::{LineItem, PaymentDoc},
    reports::{self, PaymentSummary, SalesReportRow},
};

/// Defines the payment-intent route and all payment routes. The whole
/// `/payments` group requires a verified bearer token.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_payment_intent))
        .nest(
            "/payments",
            OpenApiRouter::new()
                .routes(utoipa_axum::routes!(create_payment))
                .routes(utoipa_axum::routes!(list_payments))
                .routes(utoipa_axum::routes!(user_payments))
                .routes(utoipa_axum::routes!(seller_payments))
                .routes(utoipa_axum::routes!(mark_paid))
                .routes(utoipa_axum::routes!(sales_report))
                .routes(utoipa_axum::routes!(admin_summary))
                .routes(utoipa_axum::routes!(seller_summary))
                .route_layer(axum::middleware::from_fn(middleware::verify_token)),
        )
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentReq {
    pub amount_in_cents: i64,
}

fn validate_amount_in_cents(amount: i64) -> Result<i64, AppError> {
    if amount <= 0 {
        return Err(AppError::BadRequest(
            "amountInCents must be a positive integer".into(),
        ));
    }
    Ok(amount)
}

/// Forward an integer cents amount to the payment gateway and hand the
/// resulting client secret back to the frontend. Non-integer amounts are
/// rejected by deserialization, non-positive ones here.
#[utoipa::path(
    post,
    path = "/create-payment-intent",
    tags = ["Payments"],
    request_body = CreateIntentReq,
    responses(
        (status = 200, description = "Client secret for the created intent"),
        (status = 400, description = "Non-positive amount"),
        (status = 502, description = "Payment gateway unreachable")
    )
)]
async fn create_payment_intent(
    State(state): State<AppState>,
    Json(body): Json<CreateIntentReq>,
) -> Result<impl IntoResponse, AppError> {
    let amount = validate_amount_in_cents(body.amount_in_cents)?;

    let intent = api::stripe::create_payment_intent(
        &state.http_client,
        &state.config.stripe_secret_key,
        amount,
    )
    .await?;

    Ok(Json(json!({ "clientSecret": intent.client_secret })))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentReq {
    pub buyer_email: String,
    pub transaction_id: Option<String>,
    pub total_price: Option<f64>,
    #[serde(default)]
    pub cart_items: Vec<LineItem>,
}

/// Record a payment. Payments always start `pending` and dated now; the
/// guarded mark-paid update is the only way to finalize one.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    request_body = CreatePaymentReq,
    responses(
        (status = 201, description = "Payment recorded"),
        (status = 400, description = "Buyer email missing")
    )
)]
async fn create_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Json(body): Json<CreatePaymentReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.buyer_email.trim().is_empty() {
        return Err(AppError::BadRequest("buyerEmail is required".into()));
    }

    let payment = PaymentDoc {
        id: None,
        buyer_email: body.buyer_email,
        transaction_id: body.transaction_id,
        total_price: body.total_price.unwrap_or(0.0),
        status: "pending".to_string(),
        date: Utc::now(),
        paid_date: None,
        cart_items: body.cart_items,
    };

    let result = state
        .payments()
        .insert_one(&payment)
        .await
        .context("Failed to create payment")?;

    tracing::info!(
        buyer = payment.buyer_email,
        requested_by = ?claims.email,
        "Payment recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "insertedId": result.inserted_id })),
    ))
}

/// Fetch all payments, newest first (admin listing).
#[utoipa::path(
    get,
    path = "/",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List all payments", body = Vec<PaymentDoc>)
    )
)]
async fn list_payments(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let payments = fetch_payments(&state, doc! {}).await?;
    Ok(Json(payments))
}

/// Fetch a buyer's payments, newest first.
#[utoipa::path(
    get,
    path = "/user/{email}",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("email" = String, Path, description = "Buyer email")
    ),
    responses(
        (status = 200, description = "The buyer's payments", body = Vec<PaymentDoc>)
    )
)]
async fn user_payments(
    Path(email): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let payments = fetch_payments(&state, doc! { "buyerEmail": &email }).await?;
    Ok(Json(payments))
}

/// Fetch the payments containing a line item sold by this seller, newest
/// first. Seller attribution lives on the embedded cart items.
#[utoipa::path(
    get,
    path = "/seller/{email}",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("email" = String, Path, description = "Seller email")
    ),
    responses(
        (status = 200, description = "Payments involving the seller", body = Vec<PaymentDoc>)
    )
)]
async fn seller_payments(
    Path(email): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let payments = fetch_payments(&state, doc! { "cartItems.sellerEmail": &email }).await?;
    Ok(Json(payments))
}

/// Mark a payment paid. The update is conditioned on the current status
/// still being a pending one, so a payment transitions to `paid` exactly
/// once and `paidDate` is set exactly once; repeated attempts (and unknown
/// ids) fall through to 404.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("id" = String, Path, description = "Id of the payment to finalize")
    ),
    responses(
        (status = 200, description = "Payment marked paid", body = StdResponse<String, String>),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Unknown id or already paid")
    )
)]
async fn mark_paid(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let oid =
        ObjectId::parse_str(&id).map_err(|_| AppError::BadRequest("Invalid payment id".into()))?;

    let (filter, update) = mark_paid_update(oid, bson::DateTime::now());
    let result = state
        .payments()
        .update_one(filter, update)
        .await
        .context("Failed to update payment status")?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: None::<String>,
        message: Some("Payment marked as paid"),
    })
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// Inclusive range start, `YYYY-MM-DD` or RFC 3339.
    pub start_date: Option<String>,
    /// Inclusive range end, `YYYY-MM-DD` or RFC 3339.
    pub end_date: Option<String>,
}

/// Flattened per-item sales ledger over the (optionally date-filtered)
/// payments, newest payment first. Both bounds must be present for the
/// filter to apply.
#[utoipa::path(
    get,
    path = "/report",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(ReportQuery),
    responses(
        (status = 200, description = "Per-line-item sales rows", body = Vec<SalesReportRow>),
        (status = 400, description = "Malformed date bound")
    )
)]
async fn sales_report(
    Query(query): Query<ReportQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = doc! {};
    if let (Some(start), Some(end)) = (&query.start_date, &query.end_date) {
        let start = parse_range_bound(start, false)?;
        let end = parse_range_bound(end, true)?;
        filter.insert("date", date_range_filter(start, end));
    }

    let payments = fetch_payments(&state, filter).await?;
    Ok(Json(reports::flatten(&payments)))
}

/// Paid/pending totals over all payments, from their top-level totals.
#[utoipa::path(
    get,
    path = "/summary/admin",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Global paid and pending totals", body = PaymentSummary)
    )
)]
async fn admin_summary(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let payments = fetch_payments(&state, doc! {}).await?;
    Ok(Json(reports::summarize(&payments)))
}

/// Paid/pending totals for one seller, from that seller's line totals.
#[utoipa::path(
    get,
    path = "/summary/seller/{email}",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("email" = String, Path, description = "Seller email")
    ),
    responses(
        (status = 200, description = "The seller's paid and pending totals", body = PaymentSummary)
    )
)]
async fn seller_summary(
    Path(email): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let payments = fetch_payments(&state, doc! { "cartItems.sellerEmail": &email }).await?;
    Ok(Json(reports::summarize_for_seller(&payments, &email)))
}

async fn fetch_payments(state: &AppState, filter: Document) -> Result<Vec<PaymentDoc>, AppError> {
    let payments: Vec<PaymentDoc> = state
        .payments()
        .find(filter)
        .sort(doc! { "date": -1 })
        .await
        .context("Failed to get payments")?
        .try_collect()
        .await
        .context("Failed to drain payments cursor")?;
    Ok(payments)
}

/// Filter/update pair for finalizing a payment. The status condition is what
/// makes the transition single-shot: a payment already `paid` matches
/// nothing, so the caller reports 404 instead of rewriting `paidDate`.
fn mark_paid_update(oid: ObjectId, paid_date: bson::DateTime) -> (Document, Document) {
    (
        doc! { "_id": oid, "status": { "$in": ["pending", "unpaid"] } },
        doc! { "$set": { "status": "paid", "paidDate": paid_date } },
    )
}

/// Inclusive `[start, end]` filter on a stored date field. Bounds go through
/// the driver's native datetime so comparison is chronological, never lexical.
fn date_range_filter(start: DateTime<Utc>, end: DateTime<Utc>) -> Document {
    doc! {
        "$gte": bson::DateTime::from_chrono(start),
        "$lte": bson::DateTime::from_chrono(end),
    }
}

/// Parse one bound of the report date range. Bare dates expand to the start
/// or end of that UTC day so the range stays inclusive on both sides.
fn parse_range_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date: {raw}")))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
    } else {
        NaiveTime::MIN
    };
    Ok(DateTime::from_naive_utc_and_offset(date.and_time(time), Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn amounts_must_be_positive() {
        assert!(validate_amount_in_cents(250).is_ok());
        assert!(matches!(
            validate_amount_in_cents(0),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_amount_in_cents(-5),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn bare_dates_expand_to_day_bounds() {
        let start = parse_range_bound("2025-06-01", false).unwrap();
        assert_eq!(start.hour(), 0);
        assert_eq!(start.minute(), 0);

        let end = parse_range_bound("2025-06-01", true).unwrap();
        assert_eq!(end.hour(), 23);
        assert_eq!(end.second(), 59);
        assert!(end > start);
    }

    #[test]
    fn rfc3339_bounds_pass_through() {
        let bound = parse_range_bound("2025-06-01T10:30:00Z", true).unwrap();
        assert_eq!(bound.hour(), 10);
        assert_eq!(bound.minute(), 30);
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(matches!(
            parse_range_bound("June 1st", false),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn finalize_filter_only_matches_pending_states() {
        let oid = ObjectId::new();
        let (filter, _) = mark_paid_update(oid, bson::DateTime::now());

        assert_eq!(filter.get_object_id("_id").unwrap(), oid);
        let allowed: Vec<&str> = filter
            .get_document("status")
            .unwrap()
            .get_array("$in")
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect();
        assert_eq!(allowed, ["pending", "unpaid"]);
        assert!(!allowed.contains(&"paid"));
    }

    #[test]
    fn finalize_update_sets_status_and_paid_date() {
        let now = bson::DateTime::now();
        let (_, update) = mark_paid_update(ObjectId::new(), now);

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "paid");
        assert_eq!(set.get_datetime("paidDate").unwrap(), &now);
    }

    #[test]
    fn range_filter_keeps_sub_second_boundary_sales() {
        let start = parse_range_bound("2025-06-01", false).unwrap();
        let end = parse_range_bound("2025-06-30", true).unwrap();
        let range = date_range_filter(start, end);

        let lower = range.get_datetime("$gte").unwrap();
        let upper = range.get_datetime("$lte").unwrap();

        // A sale 123 ms after midnight on the first day sits inside the
        // range under native datetime comparison.
        let first_sale = bson::DateTime::from_chrono(start + chrono::Duration::milliseconds(123));
        assert!(&first_sale >= lower);
        assert!(&first_sale <= upper);
    }
}
