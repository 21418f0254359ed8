use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::AppError,
    app_state::AppState,
    models::{LineItem, OrderDoc},
};

/// Defines the order routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_order))
            .routes(utoipa_axum::routes!(buyer_orders)),
    )
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderReq {
    pub buyer_email: String,
    #[serde(default)]
    pub cart_items: Vec<LineItem>,
    pub total_price: Option<f64>,
}

/// Record an order.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    request_body = CreateOrderReq,
    responses(
        (status = 201, description = "Order recorded"),
        (status = 400, description = "Buyer email missing")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.buyer_email.trim().is_empty() {
        return Err(AppError::BadRequest("buyerEmail is required".into()));
    }

    let order = OrderDoc {
        id: None,
        buyer_email: body.buyer_email,
        cart_items: body.cart_items,
        total_price: body.total_price.unwrap_or(0.0),
        status: "pending".to_string(),
        date: Utc::now(),
    };

    let result = state
        .orders()
        .insert_one(&order)
        .await
        .context("Failed to create order")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "insertedId": result.inserted_id })),
    ))
}

/// Fetch a buyer's orders, newest first.
#[utoipa::path(
    get,
    path = "/{email}",
    tags = ["Orders"],
    params(
        ("email" = String, Path, description = "Buyer email")
    ),
    responses(
        (status = 200, description = "The buyer's orders", body = Vec<OrderDoc>)
    )
)]
async fn buyer_orders(
    Path(email): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let orders: Vec<OrderDoc> = state
        .orders()
        .find(doc! { "buyerEmail": &email })
        .sort(doc! { "date": -1 })
        .await
        .context("Failed to get orders")?
        .try_collect()
        .await
        .context("Failed to drain orders cursor")?;

    Ok(Json(orders))
}
