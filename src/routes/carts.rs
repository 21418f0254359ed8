use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::CartItemDoc,
};

/// Defines the cart routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/cart",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(add_to_cart))
            .routes(utoipa_axum::routes!(get_cart_items))
            .routes(utoipa_axum::routes!(remove_cart_item)),
    )
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartReq {
    pub buyer_email: String,
    pub medicine_id: Option<String>,
    pub medicine_name: String,
    pub seller_email: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
}

/// Append one item to a buyer's cart.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Cart"],
    request_body = AddToCartReq,
    responses(
        (status = 201, description = "Item added to cart"),
        (status = 400, description = "Missing required fields")
    )
)]
async fn add_to_cart(
    State(state): State<AppState>,
    Json(body): Json<AddToCartReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.buyer_email.trim().is_empty() || body.medicine_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "buyerEmail and medicineName are required".into(),
        ));
    }

    let item = CartItemDoc {
        id: None,
        buyer_email: body.buyer_email,
        medicine_id: body.medicine_id,
        medicine_name: body.medicine_name,
        seller_email: body.seller_email,
        quantity: body.quantity.unwrap_or(1).max(1),
        unit_price: body.unit_price.unwrap_or(0.0),
        created_at: Utc::now(),
    };

    let result = state
        .carts()
        .insert_one(&item)
        .await
        .context("Failed to add cart item")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "insertedId": result.inserted_id })),
    ))
}

/// Fetch a buyer's cart items, newest first.
#[utoipa::path(
    get,
    path = "/user/{email}",
    tags = ["Cart"],
    params(
        ("email" = String, Path, description = "Buyer email")
    ),
    responses(
        (status = 200, description = "The buyer's cart items", body = Vec<CartItemDoc>)
    )
)]
async fn get_cart_items(
    Path(email): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let items: Vec<CartItemDoc> = state
        .carts()
        .find(doc! { "buyerEmail": &email })
        .sort(doc! { "createdAt": -1 })
        .await
        .context("Failed to get cart items")?
        .try_collect()
        .await
        .context("Failed to drain cart cursor")?;

    Ok(Json(items))
}

/// Remove one item from a cart.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Cart"],
    params(
        ("id" = String, Path, description = "Id of the cart item to remove")
    ),
    responses(
        (status = 200, description = "Item removed", body = StdResponse<String, String>),
        (status = 404, description = "Unknown id")
    )
)]
async fn remove_cart_item(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let oid = ObjectId::parse_str(&id)
        .map_err(|_| AppError::BadRequest("Invalid cart item id".into()))?;

    let result = state
        .carts()
        .delete_one(doc! { "_id": oid })
        .await
        .context("Failed to remove cart item")?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: None::<String>,
        message: Some("Cart item removed"),
    })
}
