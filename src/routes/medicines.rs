use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, AuthClaims},
    models::MedicineDoc,
};

/// Defines all medicine routes. Creation requires a verified bearer token.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(list_medicines))
        .routes(utoipa_axum::routes!(discounted_medicines))
        .routes(utoipa_axum::routes!(get_medicine))
        .routes(utoipa_axum::routes!(update_medicine))
        .routes(utoipa_axum::routes!(delete_medicine));

    let protected = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_medicine))
        .route_layer(axum::middleware::from_fn(middleware::verify_token));

    utoipa_axum::router::OpenApiRouter::new().nest("/medicines", public.merge(protected))
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListMedicinesQuery {
    /// 1-based page number, defaults to 1.
    pub page: Option<u64>,
    /// Page size, defaults to 10.
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub seller_email: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedMedicines {
    pub data: Vec<MedicineDoc>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
}

fn total_pages(total_items: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total_items.div_ceil(limit)
}

/// Fetch medicines with optional category/seller filters and pagination.
/// Pages past the end return an empty data set, not an error.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Medicines"],
    params(ListMedicinesQuery),
    responses(
        (status = 200, description = "One page of medicines", body = PaginatedMedicines)
    )
)]
async fn list_medicines(
    Query(query): Query<ListMedicinesQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let mut filter = doc! {};
    if let Some(category) = &query.category {
        filter.insert("category", category.as_str());
    }
    if let Some(seller_email) = &query.seller_email {
        filter.insert("sellerEmail", seller_email.as_str());
    }

    let medicines = state.medicines();
    let total_items = medicines
        .count_documents(filter.clone())
        .await
        .context("Failed to count medicines")?;

    let data: Vec<MedicineDoc> = medicines
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .skip((page - 1) * limit as u64)
        .limit(limit)
        .await
        .context("Failed to get medicines")?
        .try_collect()
        .await
        .context("Failed to drain medicines cursor")?;

    Ok(Json(PaginatedMedicines {
        data,
        current_page: page,
        total_pages: total_pages(total_items, limit as u64),
        total_items,
    }))
}

/// Fetch every medicine currently carrying a discount.
#[utoipa::path(
    get,
    path = "/discounted",
    tags = ["Medicines"],
    responses(
        (status = 200, description = "Medicines with discount > 0", body = Vec<MedicineDoc>)
    )
)]
async fn discounted_medicines(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let medicines: Vec<MedicineDoc> = state
        .medicines()
        .find(doc! { "discount": { "$gt": 0.0 } })
        .sort(doc! { "createdAt": -1 })
        .await
        .context("Failed to get discounted medicines")?
        .try_collect()
        .await
        .context("Failed to drain medicines cursor")?;

    Ok(Json(medicines))
}

/// Fetch a single medicine by id.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Medicines"],
    params(
        ("id" = String, Path, description = "Id of the medicine to fetch")
    ),
    responses(
        (status = 200, description = "Medicine found", body = MedicineDoc),
        (status = 404, description = "Unknown id")
    )
)]
async fn get_medicine(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let oid = parse_object_id(&id)?;
    let medicine = state
        .medicines()
        .find_one(doc! { "_id": oid })
        .await
        .context("Failed to get medicine")?
        .ok_or(AppError::NotFound)?;

    Ok(Json(medicine))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMedicineReq {
    pub name: String,
    pub generic_name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: String,
    pub company: Option<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub seller_email: String,
}

/// Add a medicine for a seller. Status always starts out `available`.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Medicines"],
    security(("bearerAuth" = [])),
    request_body = CreateMedicineReq,
    responses(
        (status = 201, description = "Medicine created"),
        (status = 400, description = "Missing required fields")
    )
)]
async fn create_medicine(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Json(body): Json<CreateMedicineReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty()
        || body.category.trim().is_empty()
        || body.seller_email.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "name, category and sellerEmail are required".into(),
        ));
    }

    let medicine = MedicineDoc {
        id: None,
        name: body.name,
        generic_name: body.generic_name,
        description: body.description,
        image: body.image,
        category: body.category,
        company: body.company,
        price: body.price.unwrap_or(0.0),
        discount: body.discount.unwrap_or(0.0),
        seller_email: body.seller_email,
        status: "available".to_string(),
        created_at: Some(Utc::now()),
    };

    let result = state
        .medicines()
        .insert_one(&medicine)
        .await
        .context("Failed to create medicine")?;

    tracing::info!(
        seller = medicine.seller_email,
        requested_by = ?claims.email,
        "Medicine created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "insertedId": result.inserted_id })),
    ))
}

#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMedicineReq {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Patch a medicine with whichever fields the request provides.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Medicines"],
    params(
        ("id" = String, Path, description = "Id of the medicine to update")
    ),
    request_body = UpdateMedicineReq,
    responses(
        (status = 200, description = "Medicine updated"),
        (status = 400, description = "Empty patch or malformed id"),
        (status = 404, description = "Unknown id")
    )
)]
async fn update_medicine(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<UpdateMedicineReq>,
) -> Result<impl IntoResponse, AppError> {
    let oid = parse_object_id(&id)?;

    let update = mongodb::bson::to_document(&body).context("Failed to serialize update")?;
    if update.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    let result = state
        .medicines()
        .update_one(doc! { "_id": oid }, doc! { "$set": update })
        .await
        .context("Failed to update medicine")?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(json!({
        "matchedCount": result.matched_count,
        "modifiedCount": result.modified_count,
    })))
}

/// Remove a medicine by id.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Medicines"],
    params(
        ("id" = String, Path, description = "Id of the medicine to delete")
    ),
    responses(
        (status = 200, description = "Medicine deleted", body = StdResponse<String, String>),
        (status = 404, description = "Unknown id")
    )
)]
async fn delete_medicine(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let oid = parse_object_id(&id)?;

    let result = state
        .medicines()
        .delete_one(doc! { "_id": oid })
        .await
        .context("Failed to delete medicine")?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: None::<String>,
        message: Some("Medicine deleted successfully"),
    })
}

fn parse_object_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::BadRequest("Invalid medicine id".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_covers_partial_last_page() {
        assert_eq!(total_pages(23, 10), 3);
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(1, 10), 1);
    }

    #[test]
    fn pagination_handles_empty_collections() {
        assert_eq!(total_pages(0, 10), 0);
    }

    #[test]
    fn malformed_ids_are_rejected_up_front() {
        assert!(matches!(
            parse_object_id("not-an-id"),
            Err(AppError::BadRequest(_))
        ));
        assert!(parse_object_id("507f1f77bcf86cd799439011").is_ok());
    }
}
