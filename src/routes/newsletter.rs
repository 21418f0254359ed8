use anyhow::Context;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{app_error::AppError, app_state::AppState, models::SubscriberDoc};

/// Defines the newsletter routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/newsletter",
        OpenApiRouter::new().routes(utoipa_axum::routes!(subscribe)),
    )
}

#[derive(Deserialize, ToSchema)]
pub struct SubscribeReq {
    pub email: String,
}

/// Subscribe an email to the newsletter. Duplicate subscriptions are
/// rejected rather than silently accepted.
#[utoipa::path(
    post,
    path = "/subscribe",
    tags = ["Newsletter"],
    request_body = SubscribeReq,
    responses(
        (status = 201, description = "Subscribed"),
        (status = 400, description = "Email missing or already subscribed")
    )
)]
async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.email.trim().is_empty() {
        return Err(AppError::BadRequest("Email is required".into()));
    }

    let subscribers = state.subscribers();
    let existing = subscribers
        .find_one(doc! { "email": &body.email })
        .await
        .context("Failed to look up subscriber")?;
    if existing.is_some() {
        return Err(AppError::BadRequest("Email already subscribed".into()));
    }

    subscribers
        .insert_one(&SubscriberDoc {
            id: None,
            email: body.email,
            created_at: Utc::now(),
        })
        .await
        .context("Failed to create subscriber")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Subscribed successfully" })),
    ))
}
