//! Admin console endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::{
    error::AppResult,
    models::{
        admin::{AdminListQuery, AdminModel, ModelAdmin},
        form::{error_messages, Submission},
    },
    services::{
        admin::{AdminListPage, AdminObject},
        today,
    },
    AppState,
};

use super::{submitted, AuthenticatedUser};

fn saved_or_invalid(outcome: Submission<Value>, status: StatusCode) -> Response {
    match outcome {
        Submission::Saved(object) => (status, Json(object)).into_response(),
        Submission::Invalid(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "errors": error_messages(&errors) })),
        )
            .into_response(),
    }
}

/// Registered models
#[utoipa::path(
    get,
    path = "/admin",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Model registry", body = Vec<ModelAdmin>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn index(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ModelAdmin>>> {
    claims.require_admin()?;
    Ok(Json(state.services.admin.registry()))
}

/// List objects of one model
#[utoipa::path(
    get,
    path = "/admin/{model}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("model" = AdminModel, Path, description = "Model name"),
        AdminListQuery
    ),
    responses(
        (status = 200, description = "Page of rows", body = AdminListPage),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn list(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(model): Path<AdminModel>,
    Query(query): Query<AdminListQuery>,
) -> AppResult<Json<AdminListPage>> {
    claims.require_admin()?;
    Ok(Json(state.services.admin.list(model, &query, today()).await?))
}

/// Get one object with its change-form layout
#[utoipa::path(
    get,
    path = "/admin/{model}/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("model" = AdminModel, Path, description = "Model name"),
        ("id" = String, Path, description = "Object ID")
    ),
    responses(
        (status = 200, description = "Object", body = AdminObject),
        (status = 404, description = "Object not found")
    )
)]
pub async fn get(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((model, id)): Path<(AdminModel, String)>,
) -> AppResult<Json<AdminObject>> {
    claims.require_admin()?;
    Ok(Json(state.services.admin.get(model, &id).await?))
}

/// Create an object
#[utoipa::path(
    post,
    path = "/admin/{model}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("model" = AdminModel, Path, description = "Model name")),
    request_body = Value,
    responses(
        (status = 201, description = "Created"),
        (status = 422, description = "Invalid object")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(model): Path<AdminModel>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    claims.require_admin()?;
    let outcome = state.services.admin.create(model, submitted(body)).await?;
    Ok(saved_or_invalid(outcome, StatusCode::CREATED))
}

/// Update an object; books accept an `instances` inline table
#[utoipa::path(
    put,
    path = "/admin/{model}/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("model" = AdminModel, Path, description = "Model name"),
        ("id" = String, Path, description = "Object ID")
    ),
    request_body = Value,
    responses(
        (status = 200, description = "Updated"),
        (status = 404, description = "Object not found"),
        (status = 422, description = "Invalid object")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((model, id)): Path<(AdminModel, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    claims.require_admin()?;
    let outcome = state.services.admin.update(model, &id, submitted(body)).await?;
    Ok(saved_or_invalid(outcome, StatusCode::OK))
}

/// Delete an object
#[utoipa::path(
    delete,
    path = "/admin/{model}/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("model" = AdminModel, Path, description = "Model name"),
        ("id" = String, Path, description = "Object ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Object not found"),
        (status = 409, description = "Object still referenced")
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((model, id)): Path<(AdminModel, String)>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.admin.delete(model, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
