use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::UserDoc,
};

/// Defines all user routes (registration + role management).
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/users",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_user))
            .routes(utoipa_axum::routes!(list_users))
            .routes(utoipa_axum::routes!(get_user))
            .routes(utoipa_axum::routes!(get_user_role))
            .routes(utoipa_axum::routes!(update_user_role))
            .routes(utoipa_axum::routes!(delete_user)),
    )
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserReq {
    pub name: Option<String>,
    pub email: String,
    pub role: Option<String>,
    pub photo_url: Option<String>,
}

fn admin_requested(role: Option<&str>) -> bool {
    matches!(role, Some(r) if r.eq_ignore_ascii_case("admin"))
}

/// Register a user. Admin role is never self-assignable; registering an
/// already-known email is a no-op that reports the existing user.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Users"],
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User registered"),
        (status = 200, description = "User already exists, nothing inserted"),
        (status = 403, description = "Admin registration not allowed")
    )
)]
async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserReq>,
) -> Result<Response, AppError> {
    if admin_requested(body.role.as_deref()) {
        return Err(AppError::Forbidden("Admin registration not allowed".into()));
    }
    if body.email.trim().is_empty() {
        return Err(AppError::BadRequest("Email is required".into()));
    }

    let users = state.users();
    let existing = users
        .find_one(doc! { "email": &body.email })
        .await
        .context("Failed to look up user by email")?;
    if existing.is_some() {
        return Ok(Json(json!({ "message": "User already exists" })).into_response());
    }

    let user = UserDoc {
        id: None,
        name: body.name,
        email: body.email,
        role: body.role.unwrap_or("user".to_string()),
        photo_url: body.photo_url,
        created_at: Some(Utc::now()),
    };
    let result = users
        .insert_one(&user)
        .await
        .context("Failed to create user")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "insertedId": result.inserted_id })),
    )
        .into_response())
}

/// Fetch all registered users.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Users"],
    responses(
        (status = 200, description = "List all users", body = Vec<UserDoc>)
    )
)]
async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    use futures::TryStreamExt;

    let users: Vec<UserDoc> = state
        .users()
        .find(doc! {})
        .await
        .context("Failed to get users")?
        .try_collect()
        .await
        .context("Failed to drain users cursor")?;

    Ok(Json(users))
}

/// Fetch a single user by email.
#[utoipa::path(
    get,
    path = "/{email}",
    tags = ["Users"],
    params(
        ("email" = String, Path, description = "Email of the user to fetch")
    ),
    responses(
        (status = 200, description = "User found", body = UserDoc),
        (status = 404, description = "Unknown email")
    )
)]
async fn get_user(
    Path(email): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users()
        .find_one(doc! { "email": &email })
        .await
        .context("Failed to get user")?
        .ok_or(AppError::NotFound)?;

    Ok(Json(user))
}

/// Fetch a user's role, defaulting to `user` for unknown emails.
#[utoipa::path(
    get,
    path = "/{email}/role",
    tags = ["Users"],
    params(
        ("email" = String, Path, description = "Email of the user")
    ),
    responses(
        (status = 200, description = "The user's role")
    )
)]
async fn get_user_role(
    Path(email): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users()
        .find_one(doc! { "email": &email })
        .await
        .context("Failed to get user role")?;

    let role = user.map(|u| u.role).unwrap_or("user".to_string());
    Ok(Json(json!({ "role": role })))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateRoleReq {
    pub role: Option<String>,
}

/// Update a user's role, addressed by email.
#[utoipa::path(
    patch,
    path = "/{email}/role",
    tags = ["Users"],
    params(
        ("email" = String, Path, description = "Email of the user to update")
    ),
    request_body = UpdateRoleReq,
    responses(
        (status = 200, description = "Role updated", body = StdResponse<String, String>),
        (status = 400, description = "Role missing from the request body"),
        (status = 404, description = "Unknown email")
    )
)]
async fn update_user_role(
    Path(email): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<UpdateRoleReq>,
) -> Result<impl IntoResponse, AppError> {
    let role = body
        .role
        .filter(|r| !r.trim().is_empty())
        .ok_or(AppError::BadRequest("Role is required".into()))?;

    let result = state
        .users()
        .update_one(doc! { "email": &email }, doc! { "$set": { "role": &role } })
        .await
        .context("Failed to update user role")?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: None::<String>,
        message: Some("User role updated successfully"),
    })
}

/// Remove a user. Users are addressed by email everywhere in this module;
/// earlier revisions of the API mixed id- and email-addressing.
#[utoipa::path(
    delete,
    path = "/{email}",
    tags = ["Users"],
    params(
        ("email" = String, Path, description = "Email of the user to delete")
    ),
    responses(
        (status = 200, description = "User deleted", body = StdResponse<String, String>),
        (status = 404, description = "Unknown email")
    )
)]
async fn delete_user(
    Path(email): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .users()
        .delete_one(doc! { "email": &email })
        .await
        .context("Failed to delete user")?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: None::<String>,
        message: Some("User deleted successfully"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_is_rejected_regardless_of_case() {
        assert!(admin_requested(Some("admin")));
        assert!(admin_requested(Some("Admin")));
        assert!(admin_requested(Some("ADMIN")));
    }

    #[test]
    fn non_admin_roles_pass_the_guard() {
        assert!(!admin_requested(None));
        assert!(!admin_requested(Some("user")));
        assert!(!admin_requested(Some("seller")));
    }
}
