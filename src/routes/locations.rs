use anyhow::Context;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use futures::TryStreamExt;
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{app_error::AppError, app_state::AppState, models::DeliveryLocationDoc};

/// Defines the delivery-location routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/delivery-locations",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_locations))
            .routes(utoipa_axum::routes!(create_location)),
    )
}

/// Fetch all delivery coverage areas.
#[utoipa::path(
    get,
    path = "/",
    tags = ["DeliveryLocations"],
    responses(
        (status = 200, description = "List all delivery locations", body = Vec<DeliveryLocationDoc>)
    )
)]
async fn list_locations(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let locations: Vec<DeliveryLocationDoc> = state
        .delivery_locations()
        .find(doc! {})
        .await
        .context("Failed to get delivery locations")?
        .try_collect()
        .await
        .context("Failed to drain delivery locations cursor")?;

    Ok(Json(locations))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationReq {
    pub district: String,
    pub city: Option<String>,
    #[serde(default)]
    pub covered_areas: Vec<String>,
}

/// Add a delivery coverage area.
#[utoipa::path(
    post,
    path = "/",
    tags = ["DeliveryLocations"],
    request_body = CreateLocationReq,
    responses(
        (status = 201, description = "Delivery location added"),
        (status = 400, description = "District missing")
    )
)]
async fn create_location(
    State(state): State<AppState>,
    Json(body): Json<CreateLocationReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.district.trim().is_empty() {
        return Err(AppError::BadRequest("District is required".into()));
    }

    let location = DeliveryLocationDoc {
        id: None,
        district: body.district,
        city: body.city,
        covered_areas: body.covered_areas,
    };

    let result = state
        .delivery_locations()
        .insert_one(&location)
        .await
        .context("Failed to create delivery location")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "insertedId": result.inserted_id })),
    ))
}
