//! Login and logout

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{LoginRequest, User},
    AppState,
};

use super::Payload;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NextQuery {
    /// Local path to return to after login
    pub next: Option<String>,
}

/// Login form description, the target of login redirects
#[derive(Serialize, ToSchema)]
pub struct LoginPage {
    pub action: String,
    pub fields: Vec<String>,
    pub next: Option<String>,
}

/// User info returned in login response
#[derive(Serialize, ToSchema)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub permissions: Vec<String>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        UserInfo {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            permissions: user.permissions,
        }
    }
}

/// Login response
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// JWT access token, also set as a cookie
    pub token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Token expiration in seconds
    pub expires_in: u64,
    pub user: UserInfo,
}

#[derive(Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// Only same-site paths are followed after login
fn safe_next(next: Option<String>) -> Option<String> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.starts_with("/\\"))
}

/// Describe the login form
#[utoipa::path(
    get,
    path = "/accounts/login/",
    tag = "auth",
    params(NextQuery),
    responses(
        (status = 200, description = "Login form", body = LoginPage)
    )
)]
pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
) -> Json<LoginPage> {
    Json(LoginPage {
        action: state.config.auth.login_url.clone(),
        fields: vec!["username".to_string(), "password".to_string()],
        next: safe_next(query.next),
    })
}

/// Authenticate and set the auth cookie
#[utoipa::path(
    post,
    path = "/accounts/login/",
    tag = "auth",
    params(NextQuery),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 303, description = "Login successful; redirects to `next`"),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<NextQuery>,
    Payload(request): Payload<LoginRequest>,
) -> AppResult<Response> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (token, user) = state
        .services
        .auth
        .authenticate(&request.username, &request.password)
        .await?;

    let cookie = Cookie::build((state.config.auth.cookie_name.clone(), token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    let jar = jar.add(cookie);

    if let Some(next) = safe_next(request.next.or(query.next)) {
        return Ok((jar, Redirect::to(&next)).into_response());
    }

    let body = LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.auth.jwt_expiration_hours * 3600,
        user: user.into(),
    };
    Ok((jar, Json(body)).into_response())
}

/// Clear the auth cookie
#[utoipa::path(
    post,
    path = "/accounts/logout/",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let jar = jar.remove(Cookie::build((state.config.auth.cookie_name.clone(), "")).path("/"));
    (
        jar,
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}
