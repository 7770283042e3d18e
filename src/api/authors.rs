//! Author list, detail and maintenance endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Response,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorDetails, AuthorForm},
        form::{bind, FormState, Submission},
        page::{PageMeta, PageQuery},
        user::Permission,
    },
    AppState,
};

use super::{see_other, submitted, unprocessable, AuthenticatedUser, SOME_DATA};

#[derive(Serialize, ToSchema)]
pub struct AuthorListPage {
    pub author_list: Vec<Author>,
    pub page_obj: PageMeta,
    pub is_paginated: bool,
    pub some_data: String,
}

/// List authors, three per page
#[utoipa::path(
    get,
    path = "/catalog/authors",
    tag = "authors",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of authors", body = AuthorListPage),
        (status = 404, description = "Invalid page")
    )
)]
pub async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<AuthorListPage>> {
    let (author_list, page_obj) = state
        .services
        .catalog
        .list_authors(query.page.as_deref())
        .await?;

    Ok(Json(AuthorListPage {
        author_list,
        is_paginated: page_obj.is_paginated(),
        page_obj,
        some_data: SOME_DATA.to_string(),
    }))
}

/// Get an author with their books
#[utoipa::path(
    get,
    path = "/catalog/author/{id}",
    tag = "authors",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author details", body = AuthorDetails),
        (status = 404, description = "Author not found")
    )
)]
pub async fn author_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<AuthorDetails>> {
    Ok(Json(state.services.catalog.author_details(id).await?))
}

/// Blank author form
#[utoipa::path(
    get,
    path = "/catalog/author/create",
    tag = "authors",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unbound form", body = FormState),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn create_form(AuthenticatedUser(claims): AuthenticatedUser) -> AppResult<Json<FormState>> {
    claims.require_permission(Permission::ManageCatalog)?;
    Ok(Json(FormState::unbound(AuthorForm::FIELDS, AuthorForm::initial())))
}

/// Create an author
#[utoipa::path(
    post,
    path = "/catalog/author/create",
    tag = "authors",
    security(("bearer_auth" = [])),
    request_body = AuthorForm,
    responses(
        (status = 303, description = "Created; redirects to the author"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing permission"),
        (status = 422, description = "Invalid form", body = FormState)
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    claims.require_permission(Permission::ManageCatalog)?;

    let data = submitted(body);
    let outcome = match bind::<AuthorForm>(AuthorForm::FIELDS, &data) {
        Ok(form) => state.services.catalog.create_author(&form).await?,
        Err(errors) => Submission::Invalid(errors),
    };

    Ok(match outcome {
        Submission::Saved(author) => see_other(&format!("/catalog/author/{}", author.id)),
        Submission::Invalid(errors) => {
            unprocessable(FormState::invalid(AuthorForm::FIELDS, &data, &errors))
        }
    })
}

/// Author form bound to the stored values
#[utoipa::path(
    get,
    path = "/catalog/author/{id}/update",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Bound form", body = FormState),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_form(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<FormState>> {
    claims.require_permission(Permission::ManageCatalog)?;

    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(FormState::bound(AuthorForm::FIELDS, &AuthorForm::from(&author))))
}

/// Update an author
#[utoipa::path(
    post,
    path = "/catalog/author/{id}/update",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    request_body = AuthorForm,
    responses(
        (status = 303, description = "Updated; redirects to the author"),
        (status = 404, description = "Author not found"),
        (status = 422, description = "Invalid form", body = FormState)
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    claims.require_permission(Permission::ManageCatalog)?;

    let data = submitted(body);
    let outcome = match bind::<AuthorForm>(AuthorForm::FIELDS, &data) {
        Ok(form) => state.services.catalog.update_author(id, &form).await?,
        Err(errors) => {
            // Unknown ids stay 404 even when the body is unreadable
            state.services.catalog.get_author(id).await?;
            Submission::Invalid(errors)
        }
    };

    Ok(match outcome {
        Submission::Saved(author) => see_other(&format!("/catalog/author/{}", author.id)),
        Submission::Invalid(errors) => {
            unprocessable(FormState::invalid(AuthorForm::FIELDS, &data, &errors))
        }
    })
}

/// Show the author to be deleted
#[utoipa::path(
    get,
    path = "/catalog/author/{id}/delete",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author pending deletion", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_confirm(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Author>> {
    claims.require_permission(Permission::ManageCatalog)?;
    Ok(Json(state.services.catalog.get_author(id).await?))
}

/// Delete an author; their books keep no author
#[utoipa::path(
    post,
    path = "/catalog/author/{id}/delete",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 303, description = "Deleted; redirects to the author list"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_author(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    claims.require_permission(Permission::ManageCatalog)?;

    state.services.catalog.delete_author(id).await?;
    Ok(see_other("/catalog/authors"))
}
