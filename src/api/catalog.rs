//! Catalog home page

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, services::catalog::CatalogCounts, AppState};

use super::VisitorSession;

#[derive(Serialize, ToSchema)]
pub struct IndexContext {
    #[serde(flatten)]
    pub counts: CatalogCounts,
    /// Visits by this session before the current one
    pub num_visits: i64,
}

/// Catalog summary and the session visit counter
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    responses(
        (status = 200, description = "Catalog counts", body = IndexContext)
    )
)]
pub async fn index(
    State(state): State<AppState>,
    session: VisitorSession,
) -> AppResult<(CookieJar, Json<IndexContext>)> {
    let counts = state.services.catalog.summary().await?;
    let num_visits = state.services.sessions.record_visit(&session.id).await?;

    Ok((session.jar, Json(IndexContext { counts, num_visits })))
}
