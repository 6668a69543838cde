//! Book list, detail and editing endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookDetail, BookForm},
        form::{FormOutcome, FormResponse},
        pagination::{BookPage, PageQuery},
    },
    AppState,
};

use super::{Payload, RecordId};

const BOOK_LIST_URL: &str = "/catalog/books/";

/// Delete confirmation; `error` is set when the delete was refused
#[derive(Serialize, ToSchema)]
pub struct BookDeleteConfirmation {
    pub book: Book,
    pub error: Option<String>,
}

/// Paginated book list
#[utoipa::path(
    get,
    path = "/catalog/books/",
    tag = "catalog",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of books", body = BookPage),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<BookPage>> {
    let page = state.services.catalog.list_books(query.page.as_deref()).await?;
    Ok(Json(page))
}

/// Book details with copies
#[utoipa::path(
    get,
    path = "/catalog/book/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookDetail),
        (status = 302, description = "Not logged in"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    RecordId(id): RecordId<i32>,
) -> AppResult<Json<BookDetail>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Empty book form
#[utoipa::path(
    get,
    path = "/catalog/book/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Initial form"),
        (status = 403, description = "Missing catalog.add_book")
    )
)]
pub async fn create_book_form() -> Json<FormResponse<BookForm>> {
    Json(FormResponse::initial(BookForm::default()))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/catalog/book/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = BookForm,
    responses(
        (status = 303, description = "Created; redirects to the book"),
        (status = 400, description = "Form errors"),
        (status = 403, description = "Missing catalog.add_book")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    Payload(form): Payload<BookForm>,
) -> AppResult<Response> {
    let outcome = state.services.catalog.create_book(form).await?;
    Ok(form_response(outcome))
}

/// Current book values as a form
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Filled form"),
        (status = 403, description = "Missing catalog.change_book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book_form(
    State(state): State<AppState>,
    RecordId(id): RecordId<i32>,
) -> AppResult<Json<FormResponse<BookForm>>> {
    let form = state.services.catalog.book_form(id).await?;
    Ok(Json(FormResponse::initial(form)))
}

/// Update a book
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BookForm,
    responses(
        (status = 303, description = "Updated; redirects to the book"),
        (status = 400, description = "Form errors"),
        (status = 403, description = "Missing catalog.change_book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    RecordId(id): RecordId<i32>,
    Payload(form): Payload<BookForm>,
) -> AppResult<Response> {
    let outcome = state.services.catalog.update_book(id, form).await?;
    Ok(form_response(outcome))
}

/// Confirm deletion
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/delete/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book to delete", body = BookDeleteConfirmation),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book_confirm(
    State(state): State<AppState>,
    RecordId(id): RecordId<i32>,
) -> AppResult<Json<BookDeleteConfirmation>> {
    let book = state.services.catalog.find_book(id).await?;
    Ok(Json(BookDeleteConfirmation { book, error: None }))
}

/// Delete a book that has no copies
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/delete/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 303, description = "Deleted; redirects to the book list"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Copies still exist", body = BookDeleteConfirmation)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    RecordId(id): RecordId<i32>,
) -> AppResult<Response> {
    let book = state.services.catalog.find_book(id).await?;

    match state.services.catalog.delete_book(id).await {
        Ok(()) => Ok(Redirect::to(BOOK_LIST_URL).into_response()),
        Err(AppError::Conflict(message)) => Ok((
            StatusCode::CONFLICT,
            Json(BookDeleteConfirmation {
                book,
                error: Some(message),
            }),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

fn form_response(outcome: FormOutcome<Book, FormResponse<BookForm>>) -> Response {
    match outcome {
        FormOutcome::Saved(book) => Redirect::to(&book.absolute_url()).into_response(),
        FormOutcome::Invalid(form) => (StatusCode::BAD_REQUEST, Json(form)).into_response(),
    }
}
