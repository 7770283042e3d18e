//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, auth, authors, books, catalog, health, loans};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "1.0.0",
        description = "Local library catalog: books, authors, copies and loans"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Catalog
        catalog::index,
        // Books
        books::list_books,
        books::book_detail,
        books::create_form,
        books::create_book,
        books::update_form,
        books::update_book,
        books::delete_confirm,
        books::delete_book,
        // Authors
        authors::list_authors,
        authors::author_detail,
        authors::create_form,
        authors::create_author,
        authors::update_form,
        authors::update_author,
        authors::delete_confirm,
        authors::delete_author,
        // Loans
        loans::my_borrowed,
        loans::all_borrowed,
        loans::renew_form,
        loans::renew_book,
        // Admin
        admin::index,
        admin::list,
        admin::get,
        admin::create,
        admin::update,
        admin::delete,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            crate::models::user::User,
            crate::models::user::AccountTypeSlug,
            crate::models::user::Permission,
            // Catalog
            catalog::IndexContext,
            crate::services::catalog::CatalogCounts,
            crate::models::page::PageMeta,
            crate::models::form::FormState,
            // Books
            books::BookListPage,
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::BookCreateForm,
            crate::models::book::BookUpdateForm,
            crate::models::genre::Genre,
            crate::models::language::Language,
            // Authors
            authors::AuthorListPage,
            crate::models::author::Author,
            crate::models::author::AuthorDetails,
            crate::models::author::AuthorForm,
            // Loans
            loans::LoanListPage,
            loans::RenewContext,
            crate::models::book_instance::BookInstance,
            crate::models::book_instance::LoanedInstance,
            crate::models::book_instance::LoanStatus,
            crate::models::book_instance::RenewBookForm,
            // Admin
            crate::models::admin::AdminModel,
            crate::models::admin::ModelAdmin,
            crate::models::admin::Fieldset,
            crate::models::admin::InlineAdmin,
            crate::models::admin::DueBackFilter,
            crate::services::admin::AdminListPage,
            crate::services::admin::AdminObject,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "catalog", description = "Catalog home page"),
        (name = "books", description = "Books"),
        (name = "authors", description = "Authors"),
        (name = "loans", description = "Loans and renewals"),
        (name = "admin", description = "Admin console")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
