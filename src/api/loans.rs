//! Loan lists and copy renewal

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Response,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book_instance::{BookInstance, LoanedInstance, RenewBookForm},
        form::{bind, FormState, Submission},
        page::{PageMeta, PageQuery},
        user::Permission,
    },
    services::today,
    AppState,
};

use super::{see_other, submitted, unprocessable, AuthenticatedUser};

#[derive(Serialize, ToSchema)]
pub struct LoanListPage {
    pub bookinstance_list: Vec<LoanedInstance>,
    pub page_obj: PageMeta,
    pub is_paginated: bool,
}

impl LoanListPage {
    fn new((bookinstance_list, page_obj): (Vec<LoanedInstance>, PageMeta)) -> Self {
        Self {
            bookinstance_list,
            is_paginated: page_obj.is_paginated(),
            page_obj,
        }
    }
}

/// Renewal form with the copy it applies to
#[derive(Serialize, ToSchema)]
pub struct RenewContext {
    pub form: FormState,
    pub book_instance: BookInstance,
}

/// Copies on loan to the current user
#[utoipa::path(
    get,
    path = "/catalog/mybooks",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Current user's loans", body = LoanListPage),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_borrowed(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<LoanListPage>> {
    let loans = state
        .services
        .loans
        .my_borrowed(claims.user_id, query.page.as_deref(), today())
        .await?;
    Ok(Json(LoanListPage::new(loans)))
}

/// Every copy on loan
#[utoipa::path(
    get,
    path = "/catalog/borrowed",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "All loans", body = LoanListPage),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn all_borrowed(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<LoanListPage>> {
    claims.require_permission(Permission::CanMarkReturned)?;

    let loans = state
        .services
        .loans
        .all_borrowed(query.page.as_deref(), today())
        .await?;
    Ok(Json(LoanListPage::new(loans)))
}

/// Renewal form proposing a date three weeks out
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Renewal form", body = RenewContext),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn renew_form(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RenewContext>> {
    claims.require_permission(Permission::CanMarkReturned)?;

    let book_instance = state.services.loans.get_instance(id).await?;
    let initial = json!({ "renewal_date": RenewBookForm::proposed_date(today()) });

    Ok(Json(RenewContext {
        form: FormState::unbound(RenewBookForm::FIELDS, initial),
        book_instance,
    }))
}

/// Renew a copy
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    request_body = RenewBookForm,
    responses(
        (status = 303, description = "Renewed; redirects to all loans"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Copy not found"),
        (status = 422, description = "Invalid date", body = RenewContext)
    )
)]
pub async fn renew_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    claims.require_permission(Permission::CanMarkReturned)?;

    let book_instance = state.services.loans.get_instance(id).await?;
    let data = submitted(body);
    let outcome = match bind::<RenewBookForm>(RenewBookForm::FIELDS, &data) {
        Ok(form) => state.services.loans.renew(&book_instance, &form, today()).await?,
        Err(errors) => Submission::Invalid(errors),
    };

    Ok(match outcome {
        Submission::Saved(_) => see_other("/catalog/borrowed"),
        Submission::Invalid(errors) => unprocessable(RenewContext {
            form: FormState::invalid(RenewBookForm::FIELDS, &data, &errors),
            book_instance,
        }),
    })
}
