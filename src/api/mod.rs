//! HTTP handlers for the catalog, loans, admin console and auth

pub mod admin;
pub mod auth;
pub mod authors;
pub mod books;
pub mod catalog;
pub mod health;
pub mod loans;
pub mod openapi;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use serde_json::Value;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::UserClaims,
    AppState,
};

/// Cookie carrying the visitor session id
pub const SESSION_COOKIE: &str = "sessionid";

/// Extra context value carried by both catalog list pages
pub const SOME_DATA: &str = "This is just some data by omodroid";

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Visitor session taken from the session cookie, issued when absent or malformed.
///
/// Handlers return `jar` with their response so a new cookie reaches the client.
pub struct VisitorSession {
    pub id: String,
    pub jar: CookieJar,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for VisitorSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let existing = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|value| Uuid::parse_str(value).is_ok());

        match existing {
            Some(id) => Ok(Self { id, jar }),
            None => {
                let id = Uuid::new_v4().to_string();
                let cookie = Cookie::build((SESSION_COOKIE, id.clone()))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax);
                Ok(Self {
                    jar: jar.add(cookie),
                    id,
                })
            }
        }
    }
}

/// 303 after a successful form submission
pub(crate) fn see_other(location: &str) -> Response {
    Redirect::to(location).into_response()
}

/// Re-render a rejected form
pub(crate) fn unprocessable<T: Serialize>(context: T) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(context)).into_response()
}

/// Body of a form submission. Unreadable bodies bind as null, so the
/// permission checks still run first and the form reports the problem.
pub(crate) fn submitted(body: Result<Json<Value>, JsonRejection>) -> Value {
    match body {
        Ok(Json(data)) => data,
        Err(rejection) => {
            tracing::debug!("Unreadable form body: {}", rejection);
            Value::Null
        }
    }
}

/// Build the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Catalog
        .route("/catalog", get(catalog::index))
        .route("/catalog/books", get(books::list_books))
        .route("/catalog/book/create", get(books::create_form).post(books::create_book))
        .route("/catalog/book/:id", get(books::book_detail))
        .route("/catalog/book/:id/update", get(books::update_form).post(books::update_book))
        .route("/catalog/book/:id/delete", get(books::delete_confirm).post(books::delete_book))
        .route("/catalog/book/:id/renew", get(loans::renew_form).post(loans::renew_book))
        .route("/catalog/authors", get(authors::list_authors))
        .route("/catalog/author/create", get(authors::create_form).post(authors::create_author))
        .route("/catalog/author/:id", get(authors::author_detail))
        .route("/catalog/author/:id/update", get(authors::update_form).post(authors::update_author))
        .route("/catalog/author/:id/delete", get(authors::delete_confirm).post(authors::delete_author))
        // Loans
        .route("/catalog/mybooks", get(loans::my_borrowed))
        .route("/catalog/borrowed", get(loans::all_borrowed))
        // Admin console
        .route("/admin", get(admin::index))
        .route("/admin/:model", get(admin::list).post(admin::create))
        .route(
            "/admin/:model/:id",
            get(admin::get).put(admin::update).delete(admin::delete),
        )
        .with_state(state);

    Router::new()
        .merge(app)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
