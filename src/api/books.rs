//! Book list, detail and maintenance endpoints

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
        book::{Book, BookCreateForm, BookDetails, BookUpdateForm},
        form::{bind, FormState, Submission},
        page::{PageMeta, PageQuery},
        user::Permission,
    },
    AppState,
};

use super::{see_other, submitted, unprocessable, AuthenticatedUser, SOME_DATA};

#[derive(Serialize, ToSchema)]
pub struct BookListPage {
    pub book_list: Vec<Book>,
    pub page_obj: PageMeta,
    pub is_paginated: bool,
    pub some_data: String,
}

/// List books, two per page
#[utoipa::path(
    get,
    path = "/catalog/books",
    tag = "books",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of books", body = BookListPage),
        (status = 404, description = "Invalid page")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<BookListPage>> {
    let (book_list, page_obj) = state.services.catalog.list_books(query.page.as_deref()).await?;

    Ok(Json(BookListPage {
        book_list,
        is_paginated: page_obj.is_paginated(),
        page_obj,
        some_data: SOME_DATA.to_string(),
    }))
}

/// Get book details with copies
#[utoipa::path(
    get,
    path = "/catalog/book/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetails>> {
    Ok(Json(state.services.catalog.book_details(id).await?))
}

/// Blank book form
#[utoipa::path(
    get,
    path = "/catalog/book/create",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unbound form", body = FormState),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn create_form(AuthenticatedUser(claims): AuthenticatedUser) -> AppResult<Json<FormState>> {
    claims.require_permission(Permission::ManageCatalog)?;
    Ok(Json(FormState::unbound(
        BookCreateForm::FIELDS,
        BookCreateForm::initial(),
    )))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/catalog/book/create",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookCreateForm,
    responses(
        (status = 303, description = "Created; redirects to the book"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing permission"),
        (status = 422, description = "Invalid form", body = FormState)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    claims.require_permission(Permission::ManageCatalog)?;

    let data = submitted(body);
    let outcome = match bind::<BookCreateForm>(BookCreateForm::FIELDS, &data) {
        Ok(form) => state.services.catalog.create_book(&form).await?,
        Err(errors) => Submission::Invalid(errors),
    };

    Ok(match outcome {
        Submission::Saved(book) => see_other(&format!("/catalog/book/{}", book.id)),
        Submission::Invalid(errors) => {
            unprocessable(FormState::invalid(BookCreateForm::FIELDS, &data, &errors))
        }
    })
}

/// Book form bound to the stored values
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/update",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Bound form", body = FormState),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_form(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<FormState>> {
    claims.require_permission(Permission::ManageCatalog)?;

    let form = state.services.catalog.book_update_form(id).await?;
    Ok(Json(FormState::bound(BookUpdateForm::FIELDS, &form)))
}

/// Update a book
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/update",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BookUpdateForm,
    responses(
        (status = 303, description = "Updated; redirects to the book"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Invalid form", body = FormState)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    claims.require_permission(Permission::ManageCatalog)?;

    let data = submitted(body);
    let outcome = match bind::<BookUpdateForm>(BookUpdateForm::FIELDS, &data) {
        Ok(form) => state.services.catalog.update_book(id, &form).await?,
        Err(errors) => {
            state.services.catalog.get_book(id).await?;
            Submission::Invalid(errors)
        }
    };

    Ok(match outcome {
        Submission::Saved(book) => see_other(&format!("/catalog/book/{}", book.id)),
        Submission::Invalid(errors) => {
            unprocessable(FormState::invalid(BookUpdateForm::FIELDS, &data, &errors))
        }
    })
}

/// Show the book to be deleted
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/delete",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book pending deletion", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_confirm(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    claims.require_permission(Permission::ManageCatalog)?;
    Ok(Json(state.services.catalog.get_book(id).await?))
}

/// Delete a book
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/delete",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 303, description = "Deleted; redirects to the book list"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book still has copies")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    claims.require_permission(Permission::ManageCatalog)?;

    state.services.catalog.delete_book(id).await?;
    Ok(see_other("/catalog/books"))
}
