//! Home page

use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    services::{
        dashboard::CatalogCounts,
        sessions::{new_session_id, record_visit},
    },
    AppState,
};

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub counts: CatalogCounts,
    /// Visits by this session before the current one
    pub num_visits: i64,
}

/// Catalog counts and the session visit counter
#[utoipa::path(
    get,
    path = "/",
    tag = "catalog",
    responses(
        (status = 200, description = "Home page counts", body = DashboardResponse)
    )
)]
pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<DashboardResponse>)> {
    let cookie_name = state.config.session.cookie_name.clone();

    let (jar, session_id) = match jar.get(&cookie_name).map(|c| c.value().to_string()) {
        Some(id) => (jar, id),
        None => {
            let id = new_session_id();
            let cookie = Cookie::build((cookie_name, id.clone()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            (jar.add(cookie), id)
        }
    };

    let num_visits = record_visit(state.sessions.as_ref(), &session_id).await?;
    let counts = state.services.dashboard.counts().await?;

    Ok((jar, Json(DashboardResponse { counts, num_visits })))
}
