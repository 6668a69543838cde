//! Router tests against a migrated database
//!
//! Each test gets a fresh database from `#[sqlx::test]` (needs `DATABASE_URL`).

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use locallibrary::{
    api,
    config::AppConfig,
    models::user::{Permission, UserClaims},
    repository::Repository,
    services::{sessions::MemorySessionStore, Services},
    AppState,
};

fn app(pool: PgPool) -> (Router, AppConfig) {
    let config = AppConfig::default();
    let services = Services::new(Repository::new(pool), &config);
    let state = AppState {
        config: Arc::new(config.clone()),
        services: Arc::new(services),
        sessions: Arc::new(MemorySessionStore::new()),
    };
    (api::router(state), config)
}

fn token(config: &AppConfig, user_id: i32, permissions: &[Permission], is_staff: bool) -> String {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: format!("user{}", user_id),
        user_id,
        is_staff,
        is_superuser: false,
        permissions: permissions.iter().map(|p| p.codename().to_string()).collect(),
        exp: now + 3600,
        iat: now,
    }
    .create_token(&config.auth.jwt_secret)
    .unwrap()
}

fn get(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(path: &str, token: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn post_json(path: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn insert_user(pool: &PgPool, username: &str) -> i32 {
    sqlx::query_scalar("INSERT INTO users (username, password) VALUES ($1, 'unused') RETURNING id")
        .bind(username)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn insert_author(pool: &PgPool, first: &str, last: &str) -> i32 {
    sqlx::query_scalar("INSERT INTO authors (first_name, last_name) VALUES ($1, $2) RETURNING id")
        .bind(first)
        .bind(last)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn insert_book(pool: &PgPool, title: &str, isbn: &str, author_id: Option<i32>) -> i32 {
    sqlx::query_scalar(
        "INSERT INTO books (title, summary, isbn, author_id) VALUES ($1, 'Summary', $2, $3) RETURNING id",
    )
    .bind(title)
    .bind(isbn)
    .bind(author_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn insert_genre(pool: &PgPool, name: &str) -> i32 {
    sqlx::query_scalar("INSERT INTO genres (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn tag_book(pool: &PgPool, book_id: i32, genre_id: i32) {
    sqlx::query("INSERT INTO book_genres (book_id, genre_id) VALUES ($1, $2)")
        .bind(book_id)
        .bind(genre_id)
        .execute(pool)
        .await
        .unwrap();
}

async fn insert_copy(
    pool: &PgPool,
    book_id: i32,
    status: &str,
    due_back: Option<NaiveDate>,
    borrower_id: Option<i32>,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO book_instances (id, book_id, imprint, due_back, status, borrower_id) \
         VALUES ($1, $2, 'Imprint', $3, $4, $5)",
    )
    .bind(id)
    .bind(book_id)
    .bind(due_back)
    .bind(status)
    .bind(borrower_id)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn due_back(pool: &PgPool, id: Uuid) -> Option<NaiveDate> {
    sqlx::query_scalar("SELECT due_back FROM book_instances WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn my_books_lists_own_loans_by_due_date(pool: PgPool) {
    let reader = insert_user(&pool, "reader").await;
    let other = insert_user(&pool, "other").await;
    let book = insert_book(&pool, "Dune", "9780441013593", None).await;

    let later = insert_copy(&pool, book, "o", Some(date(2030, 3, 1)), Some(reader)).await;
    let sooner = insert_copy(&pool, book, "o", Some(date(2030, 1, 1)), Some(reader)).await;
    insert_copy(&pool, book, "r", Some(date(2029, 1, 1)), Some(reader)).await;
    insert_copy(&pool, book, "o", Some(date(2029, 6, 1)), Some(other)).await;

    let (app, config) = app(pool);
    let response = app
        .oneshot(get("/catalog/mybooks/", Some(&token(&config, reader, &[], false))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, [sooner.to_string(), later.to_string()]);
    assert_eq!(body["total"], 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn renewal_stores_date_and_returns_to_borrowed(pool: PgPool) {
    let reader = insert_user(&pool, "reader").await;
    let book = insert_book(&pool, "Dune", "9780441013593", None).await;
    let copy = insert_copy(&pool, book, "o", Some(date(2020, 1, 1)), Some(reader)).await;

    let (app, config) = app(pool.clone());
    let librarian = token(&config, 99, &[Permission::CanMarkReturned], false);
    let path = format!("/catalog/book/{}/renew/", copy);
    let today = Utc::now().date_naive();

    let new_date = today + Duration::days(28);
    let response = app
        .clone()
        .oneshot(post_form(&path, &librarian, format!("renewal_date={}", new_date)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/catalog/borrowed/");
    assert_eq!(due_back(&pool, copy).await, Some(new_date));

    let too_far = today + Duration::days(29);
    let response = app
        .oneshot(post_form(&path, &librarian, format!("renewal_date={}", too_far)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(
        body["errors"]["renewal_date"][0],
        "Invalid date - renewal more than 4 weeks ahead"
    );
    assert_eq!(due_back(&pool, copy).await, Some(new_date));
}

#[sqlx::test(migrations = "./migrations")]
async fn nine_authors_leave_four_on_second_page(pool: PgPool) {
    for i in 0..9 {
        insert_author(&pool, "First", &format!("Last{}", i)).await;
    }

    let (app, _) = app(pool);
    let response = app
        .clone()
        .oneshot(get("/catalog/authors/?page=2", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 4);
    assert_eq!(body["num_pages"], 2);
    assert_eq!(body["has_next"], false);

    let response = app
        .oneshot(get("/catalog/authors/?page=3", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn dashboard_counts_each_fantasy_book_once(pool: PgPool) {
    let fantasy = insert_genre(&pool, "Fantasy").await;
    let dark = insert_genre(&pool, "Dark fantasy").await;
    let poetry = insert_genre(&pool, "Poetry").await;

    let both = insert_book(&pool, "Elric", "9780000000001", None).await;
    tag_book(&pool, both, fantasy).await;
    tag_book(&pool, both, dark).await;
    let plain = insert_book(&pool, "Hobbit", "9780000000002", None).await;
    tag_book(&pool, plain, fantasy).await;
    let verse = insert_book(&pool, "Odes", "9780000000003", None).await;
    tag_book(&pool, verse, poetry).await;

    let (app, _) = app(pool);
    let response = app.oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["num_books"], 3);
    assert_eq!(body["fantasy_books_count"], 2);
    assert_eq!(body["num_visits"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn referenced_records_are_not_deleted(pool: PgPool) {
    let author = insert_author(&pool, "Frank", "Herbert").await;
    let book = insert_book(&pool, "Dune", "9780441013593", Some(author)).await;
    insert_copy(&pool, book, "a", None, None).await;

    let (app, config) = app(pool.clone());
    let editor = token(
        &config,
        1,
        &[Permission::DeleteAuthor, Permission::DeleteBook],
        false,
    );

    let response = app
        .clone()
        .oneshot(post_form(&format!("/catalog/author/{}/delete/", author), &editor, String::new()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(json_body(response).await["error"].is_string());

    let response = app
        .oneshot(post_form(&format!("/catalog/book/{}/delete/", book), &editor, String::new()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let authors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
        .fetch_one(&pool)
        .await
        .unwrap();
    let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((authors, books), (1, 1));
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_book_change_edits_inline_copies(pool: PgPool) {
    let book = insert_book(&pool, "Dune", "9780441013593", None).await;
    let kept = insert_copy(&pool, book, "a", None, None).await;
    let removed = insert_copy(&pool, book, "m", None, None).await;

    let (app, config) = app(pool.clone());
    let staff = token(&config, 1, &[], true);

    let response = app
        .oneshot(post_json(
            &format!("/admin/book/{}/change/", book),
            &staff,
            json!({
                "title": "Dune",
                "summary": "Spice",
                "isbn": "9780441013593",
                "instances": [
                    { "id": kept, "form": { "imprint": "Ace, 1990", "status": "reserved" } },
                    { "id": removed, "delete": true },
                    { "form": { "imprint": " Chilton, 1965 ", "status": "available" } },
                ],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/admin/book/{}/", book));

    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT imprint, status FROM book_instances WHERE book_id = $1 ORDER BY imprint",
    )
    .bind(book)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(
        rows,
        [
            ("Ace, 1990".to_string(), "r".to_string()),
            ("Chilton, 1965".to_string(), "a".to_string()),
        ]
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_inline_errors_block_every_write(pool: PgPool) {
    let author = insert_author(&pool, "Frank", "Herbert").await;
    let stranger = insert_author(&pool, "Ursula", "Le Guin").await;
    let foreign_book = insert_book(&pool, "Earthsea", "9780000000009", Some(stranger)).await;

    let (app, config) = app(pool.clone());
    let staff = token(&config, 1, &[], true);

    let response = app
        .oneshot(post_json(
            &format!("/admin/author/{}/change/", author),
            &staff,
            json!({
                "first_name": "Franklin",
                "last_name": "Herbert",
                "books": [
                    { "form": { "title": "Dune", "summary": "Spice", "isbn": "9780441013593" } },
                    { "id": foreign_book, "delete": true },
                ],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["errors"]["books-1-id"].is_array());

    let first_name: String = sqlx::query_scalar("SELECT first_name FROM authors WHERE id = $1")
        .bind(author)
        .fetch_one(&pool)
        .await
        .unwrap();
    let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(first_name, "Frank");
    assert_eq!(books, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_language_names_are_accepted(pool: PgPool) {
    let (app, config) = app(pool.clone());
    let staff = token(&config, 1, &[], true);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json("/admin/language/add/", &staff, json!({ "name": "English" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM languages WHERE name = 'English'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
}
