use anyhow::Context;
use axum::{
    Json,
    extract::State,
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

use crate::{app_error::AppError, app_state::AppState, models::FaqDoc};

/// Defines the FAQ routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/faqs",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_faqs))
            .routes(utoipa_axum::routes!(create_faq)),
    )
}

/// Fetch all FAQs.
#[utoipa::path(
    get,
    path = "/",
    tags = ["FAQs"],
    responses(
        (status = 200, description = "List all FAQs", body = Vec<FaqDoc>)
    )
)]
async fn list_faqs(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let faqs: Vec<FaqDoc> = state
        .faqs()
        .find(doc! {})
        .await
        .context("Failed to get FAQs")?
        .try_collect()
        .await
        .context("Failed to drain FAQs cursor")?;

    Ok(Json(faqs))
}

#[derive(Deserialize, ToSchema)]
pub struct CreateFaqReq {
    pub question: String,
    pub answer: String,
}

/// Add an FAQ entry.
#[utoipa::path(
    post,
    path = "/",
    tags = ["FAQs"],
    request_body = CreateFaqReq,
    responses(
        (status = 201, description = "FAQ added"),
        (status = 400, description = "Question or answer missing")
    )
)]
async fn create_faq(
    State(state): State<AppState>,
    Json(body): Json<CreateFaqReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.question.trim().is_empty() || body.answer.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Question and answer are required".into(),
        ));
    }

    let faq = FaqDoc {
        id: None,
        question: body.question,
        answer: body.answer,
        created_at: Utc::now(),
    };

    let result = state
        .faqs()
        .insert_one(&faq)
        .await
        .context("Failed to create FAQ")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "FAQ added", "id": result.inserted_id })),
    ))
}
