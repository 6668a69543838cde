//! Loan views and the librarian renewal form

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        form::FormOutcome,
        pagination::{InstancePage, PageQuery},
        renewal::RenewBookForm,
    },
    services::loans::RenewalPage,
    AppState,
};

use super::{AuthenticatedUser, Payload, RecordId};

const BORROWED_URL: &str = "/catalog/borrowed/";

/// Copies on loan to the current user
#[utoipa::path(
    get,
    path = "/catalog/mybooks/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Copies borrowed by the current user", body = InstancePage),
        (status = 302, description = "Not logged in")
    )
)]
pub async fn my_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<InstancePage>> {
    let page = state
        .services
        .loans
        .borrowed_by(claims.user_id, query.page.as_deref())
        .await?;
    Ok(Json(page))
}

/// Every copy on loan, with its borrower
#[utoipa::path(
    get,
    path = "/catalog/borrowed/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "All borrowed copies", body = InstancePage),
        (status = 403, description = "Missing catalog.can_mark_returned")
    )
)]
pub async fn all_borrowed(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<InstancePage>> {
    let page = state.services.loans.all_borrowed(query.page.as_deref()).await?;
    Ok(Json(page))
}

/// Renewal form with the proposed date
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    responses(
        (status = 200, description = "Renewal form"),
        (status = 403, description = "Missing catalog.can_mark_returned"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renewal_form(
    State(state): State<AppState>,
    RecordId(id): RecordId<Uuid>,
) -> AppResult<Json<RenewalPage>> {
    let today = Utc::now().date_naive();
    let page = state.services.loans.renewal_form(id, today).await?;
    Ok(Json(page))
}

/// Set a new due date
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    request_body = RenewBookForm,
    responses(
        (status = 303, description = "Renewed; redirects to all borrowed copies"),
        (status = 400, description = "Invalid renewal date"),
        (status = 403, description = "Missing catalog.can_mark_returned"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renew_book(
    State(state): State<AppState>,
    RecordId(id): RecordId<Uuid>,
    Payload(form): Payload<RenewBookForm>,
) -> AppResult<Response> {
    let today = Utc::now().date_naive();

    match state.services.loans.renew(id, form, today).await? {
        FormOutcome::Saved(_) => Ok(Redirect::to(BORROWED_URL).into_response()),
        FormOutcome::Invalid(page) => Ok((StatusCode::BAD_REQUEST, Json(page)).into_response()),
    }
}
