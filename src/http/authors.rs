use crate::http::AppState;
use crate::http::handler::{ApiError, ApiSuccess, parse_id};
use crate::models::{
    AuthorDetails, AuthorInput, CreateAuthorError, DeleteAuthorError, FindAllAuthorsError,
    FindAuthorError, UpdateAuthorError,
};
use crate::repositories::Store;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use serde::Serialize;

const AUTHOR_NOT_FOUND: &str = "No Author matches the given query.";

impl From<CreateAuthorError> for ApiError {
    fn from(err: CreateAuthorError) -> Self {
        match err {
            CreateAuthorError::Invalid(errors) => Self::BadRequest(errors),
            CreateAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindAuthorError> for ApiError {
    fn from(err: FindAuthorError) -> Self {
        match err {
            FindAuthorError::NotFound { .. } => Self::NotFound(AUTHOR_NOT_FOUND.to_string()),
            FindAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindAllAuthorsError> for ApiError {
    fn from(err: FindAllAuthorsError) -> Self {
        Self::internal(&err.0)
    }
}

impl From<UpdateAuthorError> for ApiError {
    fn from(err: UpdateAuthorError) -> Self {
        match err {
            UpdateAuthorError::NotFound { .. } => Self::NotFound(AUTHOR_NOT_FOUND.to_string()),
            UpdateAuthorError::Invalid(errors) => Self::BadRequest(errors),
            UpdateAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<DeleteAuthorError> for ApiError {
    fn from(err: DeleteAuthorError) -> Self {
        match err {
            DeleteAuthorError::NotFound { .. } => Self::NotFound(AUTHOR_NOT_FOUND.to_string()),
            DeleteAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorHttpResponse {
    id: i64,
    first_name: String,
    last_name: String,
    books: Vec<String>,
}

impl From<AuthorDetails> for AuthorHttpResponse {
    fn from(value: AuthorDetails) -> Self {
        let author = value.author();
        Self {
            id: author.id(),
            first_name: author.first_name().to_string(),
            last_name: author.last_name().to_string(),
            books: value.books().to_vec(),
        }
    }
}

pub async fn list_authors<R: Store>(
    State(state): State<AppState<R>>,
) -> Result<ApiSuccess<Vec<AuthorHttpResponse>>, ApiError> {
    let authors = state.authors().list().await?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        authors.into_iter().map(AuthorHttpResponse::from).collect(),
    ))
}

pub async fn create_author<R: Store>(
    State(state): State<AppState<R>>,
    body: Result<Json<AuthorInput>, JsonRejection>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let Json(input) = body?;
    state
        .authors()
        .create(&input)
        .await
        .map_err(ApiError::from)
        .map(|author| ApiSuccess::new(StatusCode::CREATED, author.into()))
}

pub async fn get_author<R: Store>(
    State(state): State<AppState<R>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let id = parse_id(path, AUTHOR_NOT_FOUND)?;
    let author = state.authors().get(id).await?;
    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn replace_author<R: Store>(
    State(state): State<AppState<R>>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<AuthorInput>, JsonRejection>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let id = parse_id(path, AUTHOR_NOT_FOUND)?;
    let Json(input) = body?;
    let author = state.authors().replace(id, &input).await?;
    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn update_author<R: Store>(
    State(state): State<AppState<R>>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<AuthorInput>, JsonRejection>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let id = parse_id(path, AUTHOR_NOT_FOUND)?;
    let Json(input) = body?;
    let author = state.authors().update(id, &input).await?;
    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn delete_author<R: Store>(
    State(state): State<AppState<R>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(path, AUTHOR_NOT_FOUND)?;
    state.authors().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
