//! Author list, detail and editing endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorDetail, AuthorForm},
        form::{FormOutcome, FormResponse},
        pagination::{AuthorPage, PageQuery},
    },
    AppState,
};

use super::{Payload, RecordId};

const AUTHOR_LIST_URL: &str = "/catalog/authors/";

/// Delete confirmation; `error` is set when the delete was refused
#[derive(Serialize, ToSchema)]
pub struct AuthorDeleteConfirmation {
    pub author: Author,
    pub error: Option<String>,
}

/// Paginated author list
#[utoipa::path(
    get,
    path = "/catalog/authors/",
    tag = "catalog",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of authors", body = AuthorPage),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<AuthorPage>> {
    let page = state.services.catalog.list_authors(query.page.as_deref()).await?;
    Ok(Json(page))
}

/// Author details with their books
#[utoipa::path(
    get,
    path = "/catalog/author/{id}",
    tag = "catalog",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author details", body = AuthorDetail),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<AppState>,
    RecordId(id): RecordId<i32>,
) -> AppResult<Json<AuthorDetail>> {
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author))
}

/// Author form with date of birth set to today
#[utoipa::path(
    get,
    path = "/catalog/author/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Initial form"),
        (status = 403, description = "Missing catalog.add_author")
    )
)]
pub async fn create_author_form() -> Json<FormResponse<AuthorForm>> {
    let today = Utc::now().date_naive();
    Json(FormResponse::initial(AuthorForm::initial(today)))
}

/// Create an author
#[utoipa::path(
    post,
    path = "/catalog/author/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = AuthorForm,
    responses(
        (status = 303, description = "Created; redirects to the author"),
        (status = 400, description = "Form errors"),
        (status = 403, description = "Missing catalog.add_author")
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    Payload(form): Payload<AuthorForm>,
) -> AppResult<Response> {
    let outcome = state.services.catalog.create_author(form).await?;
    Ok(form_response(outcome))
}

/// Current author values as a form
#[utoipa::path(
    get,
    path = "/catalog/author/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Filled form"),
        (status = 403, description = "Missing catalog.change_author"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author_form(
    State(state): State<AppState>,
    RecordId(id): RecordId<i32>,
) -> AppResult<Json<FormResponse<AuthorForm>>> {
    let form = state.services.catalog.author_form(id).await?;
    Ok(Json(FormResponse::initial(form)))
}

/// Update an author
#[utoipa::path(
    post,
    path = "/catalog/author/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    request_body = AuthorForm,
    responses(
        (status = 303, description = "Updated; redirects to the author"),
        (status = 400, description = "Form errors"),
        (status = 403, description = "Missing catalog.change_author"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    RecordId(id): RecordId<i32>,
    Payload(form): Payload<AuthorForm>,
) -> AppResult<Response> {
    let outcome = state.services.catalog.update_author(id, form).await?;
    Ok(form_response(outcome))
}

/// Confirm deletion
#[utoipa::path(
    get,
    path = "/catalog/author/{id}/delete/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author to delete", body = AuthorDeleteConfirmation),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_author_confirm(
    State(state): State<AppState>,
    RecordId(id): RecordId<i32>,
) -> AppResult<Json<AuthorDeleteConfirmation>> {
    let author = state.services.catalog.find_author(id).await?;
    Ok(Json(AuthorDeleteConfirmation { author, error: None }))
}

/// Delete an author no book refers to
#[utoipa::path(
    post,
    path = "/catalog/author/{id}/delete/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 303, description = "Deleted; redirects to the author list"),
        (status = 404, description = "Author not found"),
        (status = 409, description = "Books still refer to the author", body = AuthorDeleteConfirmation)
    )
)]
pub async fn delete_author(
    State(state): State<AppState>,
    RecordId(id): RecordId<i32>,
) -> AppResult<Response> {
    let author = state.services.catalog.find_author(id).await?;

    match state.services.catalog.delete_author(id).await {
        Ok(()) => Ok(Redirect::to(AUTHOR_LIST_URL).into_response()),
        Err(AppError::Conflict(message)) => Ok((
            StatusCode::CONFLICT,
            Json(AuthorDeleteConfirmation {
                author,
                error: Some(message),
            }),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

fn form_response(outcome: FormOutcome<Author, FormResponse<AuthorForm>>) -> Response {
    match outcome {
        FormOutcome::Saved(author) => Redirect::to(&author.absolute_url()).into_response(),
        FormOutcome::Invalid(form) => (StatusCode::BAD_REQUEST, Json(form)).into_response(),
    }
}
