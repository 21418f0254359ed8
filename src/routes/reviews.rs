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

use crate::{app_error::AppError, app_state::AppState, models::ReviewDoc};

/// Defines the review routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/reviews",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_review))
            .routes(utoipa_axum::routes!(list_reviews)),
    )
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewReq {
    pub user_email: String,
    pub user_name: Option<String>,
    pub rating: i32,
    pub comment: String,
}

fn rating_in_range(rating: i32) -> bool {
    (1..=5).contains(&rating)
}

/// Post a review.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Reviews"],
    request_body = CreateReviewReq,
    responses(
        (status = 201, description = "Review posted"),
        (status = 400, description = "Rating out of range or comment missing")
    )
)]
async fn create_review(
    State(state): State<AppState>,
    Json(body): Json<CreateReviewReq>,
) -> Result<impl IntoResponse, AppError> {
    if !rating_in_range(body.rating) {
        return Err(AppError::BadRequest("Rating must be between 1 and 5".into()));
    }
    if body.user_email.trim().is_empty() || body.comment.trim().is_empty() {
        return Err(AppError::BadRequest(
            "userEmail and comment are required".into(),
        ));
    }

    let review = ReviewDoc {
        id: None,
        user_email: body.user_email,
        user_name: body.user_name,
        rating: body.rating,
        comment: body.comment,
        created_at: Utc::now(),
    };

    let result = state
        .reviews()
        .insert_one(&review)
        .await
        .context("Failed to create review")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "insertedId": result.inserted_id })),
    ))
}

/// Fetch all reviews, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Reviews"],
    responses(
        (status = 200, description = "List all reviews", body = Vec<ReviewDoc>)
    )
)]
async fn list_reviews(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let reviews: Vec<ReviewDoc> = state
        .reviews()
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await
        .context("Failed to get reviews")?
        .try_collect()
        .await
        .context("Failed to drain reviews cursor")?;

    Ok(Json(reviews))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_outside_one_to_five_are_invalid() {
        assert!(!rating_in_range(0));
        assert!(!rating_in_range(6));
        assert!(!rating_in_range(-1));
        assert!(rating_in_range(1));
        assert!(rating_in_range(5));
    }
}
