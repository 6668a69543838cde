//! Router-level access tests
//!
//! Every request here is refused (or answered) before a handler reaches the
//! database, so the pool is created lazily and never connects.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use locallibrary::{
    api,
    config::AppConfig,
    models::user::{Permission, UserClaims},
    repository::Repository,
    services::{sessions::MemorySessionStore, Services},
    AppState,
};

const RENEW_PATH: &str = "/catalog/book/6f1c5a7e-2b1d-4c3e-9a8f-0d4e5b6c7a81/renew/";

fn app() -> (Router, AppConfig) {
    let config = AppConfig::default();
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database.url)
        .expect("lazy pool");
    let services = Services::new(Repository::new(pool), &config);

    let state = AppState {
        config: Arc::new(config.clone()),
        services: Arc::new(services),
        sessions: Arc::new(MemorySessionStore::new()),
    };
    (api::router(state), config)
}

fn token(config: &AppConfig, permissions: &[Permission], is_staff: bool) -> String {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: "reader".to_string(),
        user_id: 42,
        is_staff,
        is_superuser: false,
        permissions: permissions.iter().map(|p| p.codename().to_string()).collect(),
        exp: now + 3600,
        iat: now,
    }
    .create_token(&config.auth.jwt_secret)
    .expect("token")
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn get_as(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::COOKIE, format!("auth_token={}", token))
        .body(Body::empty())
        .unwrap()
}

fn post_as(path: &str, token: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn my_books_redirects_anonymous_to_login() {
    let (app, _) = app();
    let response = app.oneshot(get("/catalog/mybooks/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/accounts/login/?next=/catalog/mybooks/");
}

#[tokio::test]
async fn login_redirect_keeps_the_query_string() {
    let (app, _) = app();
    let response = app.oneshot(get("/catalog/mybooks/?page=2")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "/accounts/login/?next=/catalog/mybooks/%3Fpage%3D2"
    );
}

#[tokio::test]
async fn book_detail_requires_login() {
    let (app, _) = app();
    let response = app.oneshot(get("/catalog/book/1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/accounts/login/?next=/catalog/book/1");
}

#[tokio::test]
async fn forged_token_counts_as_anonymous() {
    let (app, _) = app();
    let mut other = AppConfig::default();
    other.auth.jwt_secret = "not-the-server-secret".to_string();
    let forged = token(&other, &[], true);

    let response = app
        .oneshot(get_as("/catalog/mybooks/", &forged))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn borrowed_is_forbidden_without_permission() {
    let (app, config) = app();

    let anonymous = app.clone().oneshot(get("/catalog/borrowed/")).await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::FORBIDDEN);

    let reader = token(&config, &[Permission::AddAuthor], false);
    let response = app
        .oneshot(get_as("/catalog/borrowed/", &reader))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn renewal_is_forbidden_without_permission() {
    let (app, config) = app();

    let anonymous = app.clone().oneshot(get(RENEW_PATH)).await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::FORBIDDEN);
    assert!(anonymous.headers().get(header::LOCATION).is_none());

    let reader = token(&config, &[], false);
    let response = app
        .oneshot(post_as(RENEW_PATH, &reader, "renewal_date=2030-01-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn author_create_needs_login_then_permission() {
    let (app, config) = app();

    let anonymous = app
        .clone()
        .oneshot(get("/catalog/author/create/"))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::FOUND);
    assert_eq!(
        location(&anonymous),
        "/accounts/login/?next=/catalog/author/create/"
    );

    let reader = token(&config, &[Permission::AddBook], false);
    let response = app
        .oneshot(get_as("/catalog/author/create/", &reader))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn author_create_form_opens_with_permission() {
    let (app, config) = app();
    let editor = token(&config, &[Permission::AddAuthor], false);

    let response = app
        .oneshot(get_as("/catalog/author/create/", &editor))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn book_delete_is_forbidden_with_only_change_permission() {
    let (app, config) = app();
    let editor = token(&config, &[Permission::ChangeBook], false);

    let response = app
        .oneshot(post_as("/catalog/book/1/delete/", &editor, ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_is_for_staff_only() {
    let (app, config) = app();

    let anonymous = app.clone().oneshot(get("/admin/")).await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::FOUND);
    assert_eq!(location(&anonymous), "/accounts/login/?next=/admin/");

    let librarian = token(&config, &[Permission::CanMarkReturned], false);
    let response = app
        .oneshot(get_as("/admin/bookinstance/", &librarian))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_page_is_public() {
    let (app, _) = app();
    let response = app
        .oneshot(get("/accounts/login/?next=/catalog/mybooks/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_answers_without_database() {
    let (app, _) = app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
