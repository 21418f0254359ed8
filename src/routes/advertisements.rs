use anyhow::Context;
use axum::{
    Extension, Json,
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
    app_error::AppError,
    app_state::AppState,
    middleware::{self, AuthClaims},
    models::AdvertisementDoc,
};

/// Defines all advertisement routes. Submission requires a verified bearer
/// token; listings and the slider toggle are open.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(list_advertisements))
        .routes(utoipa_axum::routes!(slider_advertisements))
        .routes(utoipa_axum::routes!(seller_advertisements))
        .routes(utoipa_axum::routes!(toggle_slider));

    let protected = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_advertisement))
        .route_layer(axum::middleware::from_fn(middleware::verify_token));

    utoipa_axum::router::OpenApiRouter::new().nest("/advertisements", public.merge(protected))
}

/// Fetch all advertisements (admin dashboard listing).
#[utoipa::path(
    get,
    path = "/",
    tags = ["Advertisements"],
    responses(
        (status = 200, description = "List all advertisements", body = Vec<AdvertisementDoc>)
    )
)]
async fn list_advertisements(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let ads: Vec<AdvertisementDoc> = state
        .advertisements()
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await
        .context("Failed to get advertisements")?
        .try_collect()
        .await
        .context("Failed to drain advertisements cursor")?;

    Ok(Json(ads))
}

/// Fetch the advertisements currently shown on the promotional slider.
#[utoipa::path(
    get,
    path = "/slider",
    tags = ["Advertisements"],
    responses(
        (status = 200, description = "Advertisements on the slider", body = Vec<AdvertisementDoc>)
    )
)]
async fn slider_advertisements(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let ads: Vec<AdvertisementDoc> = state
        .advertisements()
        .find(doc! { "isOnSlider": true })
        .await
        .context("Failed to get slider advertisements")?
        .try_collect()
        .await
        .context("Failed to drain advertisements cursor")?;

    Ok(Json(ads))
}

/// Fetch every advertisement submitted by one seller.
#[utoipa::path(
    get,
    path = "/seller/{email}",
    tags = ["Advertisements"],
    params(
        ("email" = String, Path, description = "Seller email")
    ),
    responses(
        (status = 200, description = "The seller's advertisements", body = Vec<AdvertisementDoc>)
    )
)]
async fn seller_advertisements(
    Path(email): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if email.trim().is_empty() {
        return Err(AppError::BadRequest("Seller email is required".into()));
    }

    let ads: Vec<AdvertisementDoc> = state
        .advertisements()
        .find(doc! { "sellerEmail": &email })
        .await
        .context("Failed to get seller advertisements")?
        .try_collect()
        .await
        .context("Failed to drain advertisements cursor")?;

    Ok(Json(ads))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdvertisementReq {
    pub medicine_name: String,
    pub medicine_image: String,
    pub description: String,
    pub seller_email: String,
}

/// Submit an advertisement request. Ads start pending and off the slider;
/// an admin toggles slider visibility later.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Advertisements"],
    security(("bearerAuth" = [])),
    request_body = CreateAdvertisementReq,
    responses(
        (status = 201, description = "Advertisement submitted"),
        (status = 400, description = "Missing required fields")
    )
)]
async fn create_advertisement(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Json(body): Json<CreateAdvertisementReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.medicine_name.trim().is_empty()
        || body.medicine_image.trim().is_empty()
        || body.description.trim().is_empty()
        || body.seller_email.trim().is_empty()
    {
        return Err(AppError::BadRequest("Missing required fields".into()));
    }

    let ad = AdvertisementDoc {
        id: None,
        medicine_name: body.medicine_name,
        medicine_image: body.medicine_image,
        description: body.description,
        seller_email: body.seller_email,
        is_on_slider: false,
        status: "pending".to_string(),
        created_at: Utc::now(),
    };

    let result = state
        .advertisements()
        .insert_one(&ad)
        .await
        .context("Failed to create advertisement")?;

    tracing::info!(
        seller = ad.seller_email,
        requested_by = ?claims.email,
        "Advertisement submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Advertisement added successfully",
            "adId": result.inserted_id,
        })),
    ))
}

/// Toggle an advertisement's slider visibility. Read-modify-write with no
/// concurrency guard: two simultaneous toggles race and the last write wins.
#[utoipa::path(
    patch,
    path = "/{id}/toggle-slider",
    tags = ["Advertisements"],
    params(
        ("id" = String, Path, description = "Id of the advertisement to toggle")
    ),
    responses(
        (status = 200, description = "Slider flag flipped"),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Unknown id")
    )
)]
async fn toggle_slider(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let oid = ObjectId::parse_str(&id)
        .map_err(|_| AppError::BadRequest("Invalid advertisement id".into()))?;

    let ads = state.advertisements();
    let ad = ads
        .find_one(doc! { "_id": oid })
        .await
        .context("Failed to get advertisement")?
        .ok_or(AppError::NotFound)?;

    let is_on_slider = !ad.is_on_slider;
    ads.update_one(
        doc! { "_id": oid },
        doc! { "$set": { "isOnSlider": is_on_slider } },
    )
    .await
    .context("Failed to update advertisement slider status")?;

    let message = if is_on_slider {
        "Advertisement added to slider"
    } else {
        "Advertisement removed from slider"
    };
    Ok(Json(json!({ "message": message, "isOnSlider": is_on_slider })))
}
