//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, auth, authors, books, dashboard, health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Local Library API",
        version = "0.1.0",
        description = "Library catalog: books, authors, copies, loans and renewals",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Home
        dashboard::index,
        // Auth
        auth::login_page,
        auth::login,
        auth::logout,
        // Books
        books::list_books,
        books::get_book,
        books::create_book_form,
        books::create_book,
        books::update_book_form,
        books::update_book,
        books::delete_book_confirm,
        books::delete_book,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author_form,
        authors::create_author,
        authors::update_author_form,
        authors::update_author,
        authors::delete_author_confirm,
        authors::delete_author,
        // Loans
        loans::my_books,
        loans::all_borrowed,
        loans::renewal_form,
        loans::renew_book,
        // Admin
        admin::index,
        admin::list,
        admin::detail,
        admin::add,
        admin::change,
        admin::delete,
    ),
    components(
        schemas(
            // Catalog
            crate::models::author::Author,
            crate::models::author::AuthorSummary,
            crate::models::author::AuthorDetail,
            crate::models::author::AuthorForm,
            crate::models::book::Book,
            crate::models::book::BookSummary,
            crate::models::book::BookDetail,
            crate::models::book::AuthorRef,
            crate::models::book::BookForm,
            crate::models::book_instance::BookInstance,
            crate::models::book_instance::BookInstanceForm,
            crate::models::book_instance::InstanceListing,
            crate::models::book_instance::LoanStatus,
            crate::models::genre::Genre,
            crate::models::genre::GenreForm,
            crate::models::language::Language,
            crate::models::language::LanguageForm,
            crate::models::pagination::BookPage,
            crate::models::pagination::AuthorPage,
            crate::models::pagination::InstancePage,
            crate::models::renewal::RenewBookForm,
            crate::services::dashboard::CatalogCounts,
            dashboard::DashboardResponse,
            books::BookDeleteConfirmation,
            authors::AuthorDeleteConfirmation,
            // Auth
            crate::models::user::LoginRequest,
            crate::models::user::Permission,
            auth::LoginPage,
            auth::LoginResponse,
            auth::LogoutResponse,
            auth::UserInfo,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalog", description = "Books and authors"),
        (name = "loans", description = "Borrowed copies and renewals"),
        (name = "auth", description = "Login and logout"),
        (name = "admin", description = "Staff administration console")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
