//! Staff administration console endpoints

use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book_instance::{BookInstanceForm, InstanceFilter},
        form::{FormOutcome, FormResponse},
        genre::GenreForm,
        language::LanguageForm,
    },
    services::admin::{
        AdminDetail, AdminEntity, AdminForm, AdminIndex, AdminList, AuthorAdminForm, BookAdminForm,
    },
    AppState,
};

use super::Payload;

/// Parse the body as the form of `entity`
async fn read_form(entity: AdminEntity, request: Request, state: &AppState) -> AppResult<AdminForm> {
    let form = match entity {
        AdminEntity::Author => {
            let Payload(form) = Payload::<AuthorAdminForm>::from_request(request, state).await?;
            AdminForm::Author(form)
        }
        AdminEntity::Book => {
            let Payload(form) = Payload::<BookAdminForm>::from_request(request, state).await?;
            AdminForm::Book(form)
        }
        AdminEntity::Genre => {
            let Payload(form) = Payload::<GenreForm>::from_request(request, state).await?;
            AdminForm::Genre(form)
        }
        AdminEntity::Language => {
            let Payload(form) = Payload::<LanguageForm>::from_request(request, state).await?;
            AdminForm::Language(form)
        }
        AdminEntity::BookInstance => {
            let Payload(form) = Payload::<BookInstanceForm>::from_request(request, state).await?;
            AdminForm::BookInstance(form)
        }
    };
    Ok(form)
}

fn save_response(outcome: FormOutcome<String, FormResponse<AdminForm>>) -> Response {
    match outcome {
        FormOutcome::Saved(url) => Redirect::to(&url).into_response(),
        FormOutcome::Invalid(form) => (StatusCode::BAD_REQUEST, Json(form)).into_response(),
    }
}

/// Registered models
#[utoipa::path(
    get,
    path = "/admin/",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registered models with counts"),
        (status = 403, description = "Not staff")
    )
)]
pub async fn index(State(state): State<AppState>) -> AppResult<Json<AdminIndex>> {
    let index = state.services.admin.index().await?;
    Ok(Json(index))
}

/// Rows of one model, columns per its list display
#[utoipa::path(
    get,
    path = "/admin/{entity}/",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("entity" = String, Path, description = "author, book, bookinstance, genre or language"),
        InstanceFilter
    ),
    responses(
        (status = 200, description = "Model rows"),
        (status = 403, description = "Not staff"),
        (status = 404, description = "Unknown model")
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(filter): Query<InstanceFilter>,
) -> AppResult<Json<AdminList>> {
    let entity = AdminEntity::from_slug(&entity)?;
    let list = state.services.admin.list(entity, &filter).await?;
    Ok(Json(list))
}

/// One record laid out per fieldset
#[utoipa::path(
    get,
    path = "/admin/{entity}/{id}/",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("entity" = String, Path, description = "Model slug"),
        ("id" = String, Path, description = "Record ID")
    ),
    responses(
        (status = 200, description = "Record with fieldsets and inlines"),
        (status = 403, description = "Not staff"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn detail(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> AppResult<Json<AdminDetail>> {
    let entity = AdminEntity::from_slug(&entity)?;
    let detail = state.services.admin.detail(entity, &id).await?;
    Ok(Json(detail))
}

/// Add a record; authors and books may carry inline rows (`books`, `instances`)
#[utoipa::path(
    post,
    path = "/admin/{entity}/add/",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("entity" = String, Path, description = "author, book, bookinstance, genre or language")),
    responses(
        (status = 303, description = "Created; redirects to the change page"),
        (status = 400, description = "Form errors"),
        (status = 403, description = "Not staff")
    )
)]
pub async fn add(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    request: Request,
) -> AppResult<Response> {
    let entity = AdminEntity::from_slug(&entity)?;
    let form = read_form(entity, request, &state).await?;
    let outcome = state.services.admin.save(entity, None, form).await?;
    Ok(save_response(outcome))
}

/// Change a record; for authors and books inline rows add, change or delete related records
#[utoipa::path(
    post,
    path = "/admin/{entity}/{id}/change/",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("entity" = String, Path, description = "author, book, bookinstance, genre or language"),
        ("id" = String, Path, description = "Record ID")
    ),
    responses(
        (status = 303, description = "Saved; redirects to the change page"),
        (status = 400, description = "Form errors"),
        (status = 403, description = "Not staff"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn change(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    request: Request,
) -> AppResult<Response> {
    let entity = AdminEntity::from_slug(&entity)?;
    let form = read_form(entity, request, &state).await?;
    let outcome = state.services.admin.save(entity, Some(&id), form).await?;
    Ok(save_response(outcome))
}

/// Delete a record
#[utoipa::path(
    post,
    path = "/admin/{entity}/{id}/delete/",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("entity" = String, Path, description = "Model slug"),
        ("id" = String, Path, description = "Record ID")
    ),
    responses(
        (status = 303, description = "Deleted; redirects to the model list"),
        (status = 403, description = "Not staff"),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Author with books or book with copies")
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> AppResult<Redirect> {
    let entity = AdminEntity::from_slug(&entity)?;
    state.services.admin.delete(entity, &id).await?;
    Ok(Redirect::to(&entity.list_url()))
}
