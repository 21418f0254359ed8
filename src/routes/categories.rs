use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::TryStreamExt;
use mongodb::bson::{Document, doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::CategoryDoc,
};

/// Defines all category routes. Creation requires a verified bearer token.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(list_categories))
        .routes(utoipa_axum::routes!(categories_with_count))
        .routes(utoipa_axum::routes!(update_category))
        .routes(utoipa_axum::routes!(delete_category));

    let protected = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_category))
        .route_layer(axum::middleware::from_fn(middleware::verify_token));

    utoipa_axum::router::OpenApiRouter::new().nest("/categories", public.merge(protected))
}

/// Anchored, case-insensitive equality filter for a string field. Medicines
/// reference their category by name with inconsistent casing, so every
/// category-by-name lookup goes through this.
pub(crate) fn case_insensitive_eq(value: &str) -> Document {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    doc! { "$regex": format!("^{escaped}$"), "$options": "i" }
}

/// Fetch all categories.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Categories"],
    responses(
        (status = 200, description = "List all categories", body = Vec<CategoryDoc>)
    )
)]
async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let categories: Vec<CategoryDoc> = state
        .categories()
        .find(doc! {})
        .await
        .context("Failed to get categories")?
        .try_collect()
        .await
        .context("Failed to drain categories cursor")?;

    Ok(Json(categories))
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: CategoryDoc,
    pub medicine_count: u64,
}

/// Fetch all categories annotated with the live number of medicines
/// referencing each one (case-insensitive name match).
#[utoipa::path(
    get,
    path = "/with-count",
    tags = ["Categories"],
    responses(
        (status = 200, description = "Categories with live medicine counts", body = Vec<CategoryWithCount>)
    )
)]
async fn categories_with_count(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let categories: Vec<CategoryDoc> = state
        .categories()
        .find(doc! {})
        .await
        .context("Failed to get categories")?
        .try_collect()
        .await
        .context("Failed to drain categories cursor")?;

    let medicines = state.medicines();
    let mut annotated = Vec::with_capacity(categories.len());
    for category in categories {
        let medicine_count = medicines
            .count_documents(doc! { "category": case_insensitive_eq(&category.category_name) })
            .await
            .context("Failed to count medicines for category")?;
        annotated.push(CategoryWithCount {
            category,
            medicine_count,
        });
    }

    Ok(Json(annotated))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryReq {
    pub category_name: String,
    pub image: Option<String>,
}

/// Add a category.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Categories"],
    security(("bearerAuth" = [])),
    request_body = CreateCategoryReq,
    responses(
        (status = 201, description = "Category created"),
        (status = 400, description = "Category name missing")
    )
)]
async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.category_name.trim().is_empty() {
        return Err(AppError::BadRequest("categoryName is required".into()));
    }

    let category = CategoryDoc {
        id: None,
        category_name: body.category_name,
        image: body.image,
    };
    let result = state
        .categories()
        .insert_one(&category)
        .await
        .context("Failed to create category")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "insertedId": result.inserted_id })),
    ))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryReq {
    pub category_name: Option<String>,
    pub image: Option<String>,
}

/// Update a category. Renaming cascades to medicines: every medicine whose
/// `category` matches the old name case-insensitively is rewritten to the
/// lower-cased new name. The two writes are not transactional; if the
/// medicine rewrite fails after the category update succeeded, the response
/// reports the partial application and asks the caller to retry the rename
/// (the cascade is idempotent, re-running it is safe).
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Categories"],
    params(
        ("id" = String, Path, description = "Id of the category to update")
    ),
    request_body = UpdateCategoryReq,
    responses(
        (status = 200, description = "Category updated, rename cascaded", body = StdResponse<String, String>),
        (status = 400, description = "Empty patch or malformed id"),
        (status = 404, description = "Unknown id")
    )
)]
async fn update_category(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<UpdateCategoryReq>,
) -> Result<impl IntoResponse, AppError> {
    let oid = ObjectId::parse_str(&id)
        .map_err(|_| AppError::BadRequest("Invalid category id".into()))?;

    let categories = state.categories();
    let existing = categories
        .find_one(doc! { "_id": oid })
        .await
        .context("Failed to get category")?
        .ok_or(AppError::NotFound)?;

    let mut update = Document::new();
    if let Some(name) = &body.category_name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("categoryName must not be empty".into()));
        }
        update.insert("categoryName", name.as_str());
    }
    if let Some(image) = &body.image {
        update.insert("image", image.as_str());
    }
    if update.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    categories
        .update_one(doc! { "_id": oid }, doc! { "$set": update })
        .await
        .context("Failed to update category")?;

    if let Some(new_name) = &body.category_name {
        if *new_name != existing.category_name {
            let lowered = new_name.to_lowercase();
            let cascade = state
                .medicines()
                .update_many(
                    doc! { "category": case_insensitive_eq(&existing.category_name) },
                    doc! { "$set": { "category": &lowered } },
                )
                .await;

            match cascade {
                Ok(result) => tracing::info!(
                    old = existing.category_name,
                    new = lowered,
                    modified = result.modified_count,
                    "Cascaded category rename to medicines"
                ),
                Err(err) => {
                    tracing::error!(
                        old = existing.category_name,
                        new = lowered,
                        "Category renamed but medicine rewrite failed: {err}"
                    );
                    return Err(AppError::Other(anyhow::anyhow!(
                        "Category was renamed but rewriting referencing medicines failed; retry the rename"
                    )));
                }
            }
        }
    }

    Ok(StdResponse {
        data: None::<String>,
        message: Some("Category updated successfully"),
    })
}

/// Remove a category by id. Medicines referencing it keep their now-dangling
/// category string; references are informational, not foreign keys.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Categories"],
    params(
        ("id" = String, Path, description = "Id of the category to delete")
    ),
    responses(
        (status = 200, description = "Category deleted", body = StdResponse<String, String>),
        (status = 404, description = "Unknown id")
    )
)]
async fn delete_category(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let oid = ObjectId::parse_str(&id)
        .map_err(|_| AppError::BadRequest("Invalid category id".into()))?;

    let result = state
        .categories()
        .delete_one(doc! { "_id": oid })
        .await
        .context("Failed to delete category")?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: None::<String>,
        message: Some("Category deleted successfully"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_filter_is_anchored_and_case_insensitive() {
        let filter = case_insensitive_eq("Pain Relief");
        assert_eq!(filter.get_str("$regex").unwrap(), "^Pain Relief$");
        assert_eq!(filter.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        let filter = case_insensitive_eq("Vitamins (A+B)");
        assert_eq!(filter.get_str("$regex").unwrap(), r"^Vitamins \(A\+B\)$");
    }
}
