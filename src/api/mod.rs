//! HTTP handlers and routing for the Local Library server

pub mod access;
pub mod admin;
pub mod auth;
pub mod authors;
pub mod books;
pub mod dashboard;
pub mod health;
pub mod loans;
pub mod openapi;

use std::str::FromStr;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header::CONTENT_TYPE, request::Parts},
    middleware,
    routing::{get, post},
    Form, Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::user::{Permission, UserClaims},
    AppState,
};

use access::{AccessPolicy, Guard};

/// Extractor for the logged-in user.
/// Reads the claims left by the access middleware, else decodes the request's token.
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<UserClaims>() {
            return Ok(AuthenticatedUser(claims.clone()));
        }

        access::claims_from_headers(&parts.headers, state)
            .map(AuthenticatedUser)
            .ok_or_else(|| AppError::Authentication("Authentication required".to_string()))
    }
}

/// Request body as JSON or urlencoded form, chosen by content type
pub struct Payload<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(Payload(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(Payload(value))
        }
    }
}

/// Single path parameter; a value that does not parse names no record (404)
pub struct RecordId<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for RecordId<T>
where
    T: FromStr,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        raw.parse()
            .map(RecordId)
            .map_err(|_| AppError::NotFound(format!("No record with id {}", raw)))
    }
}

fn guarded(state: &AppState, policy: AccessPolicy, routes: Router<AppState>) -> Router<AppState> {
    routes.route_layer(middleware::from_fn_with_state(
        Guard::new(state, policy),
        access::enforce,
    ))
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(dashboard::index))
        .route("/catalog/books/", get(books::list_books))
        .route("/catalog/authors/", get(authors::list_authors))
        .route("/catalog/author/:id", get(authors::get_author))
        .route("/accounts/login/", get(auth::login_page).post(auth::login))
        .route("/accounts/logout/", post(auth::logout))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check));

    let login_required = guarded(
        &state,
        AccessPolicy::Authenticated,
        Router::new()
            .route("/catalog/book/:id", get(books::get_book))
            .route("/catalog/mybooks/", get(loans::my_books)),
    );

    let librarian = guarded(
        &state,
        AccessPolicy::StrictPermission(Permission::CanMarkReturned),
        Router::new()
            .route("/catalog/borrowed/", get(loans::all_borrowed))
            .route(
                "/catalog/book/:id/renew/",
                get(loans::renewal_form).post(loans::renew_book),
            ),
    );

    let catalog_editing = Router::new()
        .merge(guarded(
            &state,
            AccessPolicy::Permission(Permission::AddAuthor),
            Router::new().route(
                "/catalog/author/create/",
                get(authors::create_author_form).post(authors::create_author),
            ),
        ))
        .merge(guarded(
            &state,
            AccessPolicy::Permission(Permission::ChangeAuthor),
            Router::new().route(
                "/catalog/author/:id/update/",
                get(authors::update_author_form).post(authors::update_author),
            ),
        ))
        .merge(guarded(
            &state,
            AccessPolicy::Permission(Permission::DeleteAuthor),
            Router::new().route(
                "/catalog/author/:id/delete/",
                get(authors::delete_author_confirm).post(authors::delete_author),
            ),
        ))
        .merge(guarded(
            &state,
            AccessPolicy::Permission(Permission::AddBook),
            Router::new().route(
                "/catalog/book/create/",
                get(books::create_book_form).post(books::create_book),
            ),
        ))
        .merge(guarded(
            &state,
            AccessPolicy::Permission(Permission::ChangeBook),
            Router::new().route(
                "/catalog/book/:id/update/",
                get(books::update_book_form).post(books::update_book),
            ),
        ))
        .merge(guarded(
            &state,
            AccessPolicy::Permission(Permission::DeleteBook),
            Router::new().route(
                "/catalog/book/:id/delete/",
                get(books::delete_book_confirm).post(books::delete_book),
            ),
        ));

    let admin = guarded(
        &state,
        AccessPolicy::Staff,
        Router::new()
            .route("/admin/", get(admin::index))
            .route("/admin/:entity/", get(admin::list))
            .route("/admin/:entity/add/", post(admin::add))
            .route("/admin/:entity/:id/", get(admin::detail))
            .route("/admin/:entity/:id/change/", post(admin::change))
            .route("/admin/:entity/:id/delete/", post(admin::delete)),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(public)
        .merge(login_required)
        .merge(librarian)
        .merge(catalog_editing)
        .merge(admin)
        .with_state(state)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
