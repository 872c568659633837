use crate::http::AppState;
use crate::http::handler::{ApiError, ApiSuccess, parse_id};
use crate::models::{
    Book, BookFilter, BookInput, BuyBookError, CreateBookError, DeleteBookError, FindBookError,
    ListBooksError, UpdateBookError,
};
use crate::pagination::{Page, PageNumber};
use crate::repositories::Store;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Json, OriginalUri, Path, Query, State};
use axum::http::StatusCode;
use serde::Serialize;

const BOOK_NOT_FOUND: &str = "No Book matches the given query.";
const OUT_OF_STOCK: &str = "Book out of stock!";
const PURCHASED: &str = "Book purchased successfully!";

impl From<CreateBookError> for ApiError {
    fn from(err: CreateBookError) -> Self {
        match err {
            CreateBookError::Invalid(errors) => Self::BadRequest(errors),
            // Only reachable when the service did not resolve the author first.
            CreateBookError::UnknownAuthor { author_id } => {
                Self::internal(&anyhow::anyhow!("unresolved author {author_id}"))
            }
            CreateBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindBookError> for ApiError {
    fn from(err: FindBookError) -> Self {
        match err {
            FindBookError::NotFound { .. } => Self::NotFound(BOOK_NOT_FOUND.to_string()),
            FindBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<ListBooksError> for ApiError {
    fn from(err: ListBooksError) -> Self {
        match err {
            ListBooksError::InvalidPage(err) => err.into(),
            ListBooksError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<UpdateBookError> for ApiError {
    fn from(err: UpdateBookError) -> Self {
        match err {
            UpdateBookError::NotFound { .. } => Self::NotFound(BOOK_NOT_FOUND.to_string()),
            UpdateBookError::Invalid(errors) => Self::BadRequest(errors),
            UpdateBookError::UnknownAuthor { author_id } => {
                Self::internal(&anyhow::anyhow!("unresolved author {author_id}"))
            }
            UpdateBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<DeleteBookError> for ApiError {
    fn from(err: DeleteBookError) -> Self {
        match err {
            DeleteBookError::NotFound { .. } => Self::NotFound(BOOK_NOT_FOUND.to_string()),
            DeleteBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<BuyBookError> for ApiError {
    fn from(err: BuyBookError) -> Self {
        match err {
            BuyBookError::NotFound { .. } => Self::NotFound(BOOK_NOT_FOUND.to_string()),
            BuyBookError::OutOfStock { .. } => Self::OutOfStock(OUT_OF_STOCK.to_string()),
            BuyBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookHttpResponse {
    id: i64,
    title: String,
    count: u32,
    author: i64,
}

impl From<Book> for BookHttpResponse {
    fn from(value: Book) -> Self {
        Self {
            id: value.id(),
            title: value.title().to_string(),
            count: value.count().get(),
            author: value.author_id(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookPageHttpResponse {
    count: u64,
    next: Option<String>,
    previous: Option<String>,
    results: Vec<BookHttpResponse>,
}

impl BookPageHttpResponse {
    fn new(page: Page<Book>, path: &str, filter: BookFilter) -> Self {
        let link = |number: u64| page_link(path, filter, number);
        Self {
            count: page.count(),
            next: page.next().map(link),
            previous: page.previous().map(link),
            results: page.map(BookHttpResponse::from).into_results(),
        }
    }
}

/// Link to another page of the same listing. The first page carries no page parameter.
fn page_link(path: &str, filter: BookFilter, number: u64) -> String {
    let mut params = Vec::new();
    if let Some(author_id) = filter.author_id() {
        params.push(format!("author={author_id}"));
    }
    if number > 1 {
        params.push(format!("page={number}"));
    }

    if params.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", params.join("&"))
    }
}

#[derive(Debug, Serialize)]
pub struct PurchaseHttpResponse {
    message: &'static str,
}

/// Listing parameters. A repeated key keeps its last value; unknown keys are ignored.
#[derive(Debug, Default)]
pub struct ListBooksQuery {
    author: Option<String>,
    page: Option<String>,
}

impl ListBooksQuery {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, val) in pairs {
            match key.as_str() {
                "author" => query.author = Some(val),
                "page" => query.page = Some(val),
                _ => {}
            }
        }
        query
    }
}

pub async fn list_books<R: Store>(
    State(state): State<AppState<R>>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<ApiSuccess<BookPageHttpResponse>, ApiError> {
    let Query(pairs) = query?;
    let query = ListBooksQuery::from_pairs(pairs);
    let filter = BookFilter::from_author_param(query.author.as_deref());
    let number = PageNumber::parse(query.page.as_deref())?;

    let page = state.books().list(filter, number).await?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        BookPageHttpResponse::new(page, uri.path(), filter),
    ))
}

pub async fn create_book<R: Store>(
    State(state): State<AppState<R>>,
    body: Result<Json<BookInput>, JsonRejection>,
) -> Result<ApiSuccess<BookHttpResponse>, ApiError> {
    let Json(input) = body?;
    state
        .books()
        .create(&input)
        .await
        .map_err(ApiError::from)
        .map(|book| ApiSuccess::new(StatusCode::CREATED, book.into()))
}

pub async fn get_book<R: Store>(
    State(state): State<AppState<R>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<ApiSuccess<BookHttpResponse>, ApiError> {
    let id = parse_id(path, BOOK_NOT_FOUND)?;
    let book = state.books().get(id).await?;
    Ok(ApiSuccess::new(StatusCode::OK, book.into()))
}

pub async fn replace_book<R: Store>(
    State(state): State<AppState<R>>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<BookInput>, JsonRejection>,
) -> Result<ApiSuccess<BookHttpResponse>, ApiError> {
    let id = parse_id(path, BOOK_NOT_FOUND)?;
    let Json(input) = body?;
    let book = state.books().replace(id, &input).await?;
    Ok(ApiSuccess::new(StatusCode::OK, book.into()))
}

pub async fn update_book<R: Store>(
    State(state): State<AppState<R>>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<BookInput>, JsonRejection>,
) -> Result<ApiSuccess<BookHttpResponse>, ApiError> {
    let id = parse_id(path, BOOK_NOT_FOUND)?;
    let Json(input) = body?;
    let book = state.books().update(id, &input).await?;
    Ok(ApiSuccess::new(StatusCode::OK, book.into()))
}

pub async fn delete_book<R: Store>(
    State(state): State<AppState<R>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(path, BOOK_NOT_FOUND)?;
    state.books().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn buy_book<R: Store>(
    State(state): State<AppState<R>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<ApiSuccess<PurchaseHttpResponse>, ApiError> {
    let id = parse_id(path, BOOK_NOT_FOUND)?;
    state.books().buy(id).await?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        PurchaseHttpResponse { message: PURCHASED },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_links_keep_author_filter() {
        assert_eq!(
            page_link("/api/books/", BookFilter::ByAuthor(3), 2),
            "/api/books/?author=3&page=2"
        );
        assert_eq!(
            page_link("/api/books/", BookFilter::ByAuthor(3), 1),
            "/api/books/?author=3"
        );
        assert_eq!(page_link("/api/books/", BookFilter::All, 1), "/api/books/");
        assert_eq!(page_link("/api/books/", BookFilter::All, 6), "/api/books/?page=6");
    }

    #[test]
    fn repeated_query_keys_keep_last_value() {
        let pairs = [("page", "1"), ("author", "4"), ("page", "3"), ("sort", "x")]
            .map(|(key, val)| (key.to_string(), val.to_string()));
        let query = ListBooksQuery::from_pairs(pairs.to_vec());
        assert_eq!(query.page.as_deref(), Some("3"));
        assert_eq!(query.author.as_deref(), Some("4"));
    }
}
