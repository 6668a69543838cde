//! API integration tests against a running server
//!
//! Expects the bootstrap superuser `admin` / `admin` and a migrated database.

use reqwest::{redirect::Policy, Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8000";

fn client() -> Client {
    Client::builder()
        .redirect(Policy::none())
        .cookie_store(true)
        .build()
        .expect("Failed to build client")
}

/// Helper to get an authenticated client
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/accounts/login/", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = client();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = client();

    let response = client
        .post(format!("{}/accounts/login/", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert!(response.cookies().any(|c| c.name() == "auth_token"));

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["is_superuser"], true);
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = client();

    let response = client
        .post(format!("{}/accounts/login/", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_login_follows_next() {
    let client = client();

    let response = client
        .post(format!("{}/accounts/login/", BASE_URL))
        .form(&[
            ("username", "admin"),
            ("password", "admin"),
            ("next", "/catalog/mybooks/"),
        ])
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/catalog/mybooks/");
}

#[tokio::test]
#[ignore]
async fn test_dashboard_counts_visits() {
    let client = client();

    let first: Value = client
        .get(format!("{}/", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let second: Value = client
        .get(format!("{}/", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(first["num_visits"], 0);
    assert_eq!(second["num_visits"], 1);
    assert!(first["num_books"].is_number());
    assert!(first["fantasy_books"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_author_lifecycle() {
    let client = client();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/catalog/author/create/", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "first_name": "Test",
            "last_name": "Author",
            "date_of_birth": "1950-01-01",
            "date_of_death": null
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap().to_string();
    assert!(location.starts_with("/catalog/author/"));

    let detail: Value = client
        .get(format!("{}{}", BASE_URL, location))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(detail["name"], "Author, Test");

    let id = detail["id"].as_i64().unwrap();
    let response = client
        .post(format!("{}/catalog/author/{}/delete/", BASE_URL, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/catalog/authors/");

    let response = client
        .get(format!("{}/catalog/author/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_author_death_before_birth_is_rejected() {
    let client = client();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/catalog/author/create/", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "first_name": "Test",
            "last_name": "Author",
            "date_of_birth": "1950-01-01",
            "date_of_death": "1940-01-01"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["errors"].is_object());
}

#[tokio::test]
#[ignore]
async fn test_missing_book_is_not_found() {
    let client = client();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/catalog/book/999999", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_book_list_page_beyond_last() {
    let client = client();

    let response = client
        .get(format!("{}/catalog/books/?page=100000", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_admin_book_form_reports_field_errors() {
    let client = client();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/admin/book/add/", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "title": "  ", "summary": "x", "isbn": "9780441013593" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["errors"]["title"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_renewal_of_past_date_is_rejected() {
    let client = client();
    let token = get_auth_token(&client).await;

    let list: Value = client
        .get(format!("{}/admin/bookinstance/", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    let Some(id) = list["rows"][0]["id"].as_str() else {
        // No copies in the catalog
        return;
    };

    let response = client
        .post(format!("{}/catalog/book/{}/renew/", BASE_URL, id))
        .bearer_auth(&token)
        .form(&[("renewal_date", "2000-01-01")])
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        body["errors"]["renewal_date"][0],
        "Invalid date - renewal in past"
    );
}
