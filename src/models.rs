use crate::validation::{FieldError, ValidationErrors};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Longest title or name accepted, counted in characters.
pub const MAX_TEXT_LENGTH: usize = 100;

/// Largest stock count a book may hold.
pub const MAX_STOCK: u32 = i32::MAX as u32;

fn checked_text(raw: &str) -> Result<String, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(FieldError::Blank)
    } else if trimmed.chars().count() > MAX_TEXT_LENGTH {
        Err(FieldError::TooLong {
            max: MAX_TEXT_LENGTH,
        })
    } else {
        Ok(trimmed.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName(String);

impl AuthorName {
    pub fn new(raw: &str) -> Result<Self, FieldError> {
        checked_text(raw).map(Self)
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AuthorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookTitle(String);

impl BookTitle {
    pub fn new(raw: &str) -> Result<Self, FieldError> {
        checked_text(raw).map(Self)
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Number of copies in stock. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Stock(u32);

impl Stock {
    pub fn new(raw: i64) -> Result<Self, FieldError> {
        if raw < 0 {
            return Err(FieldError::BelowMinimum { min: 0 });
        }
        u32::try_from(raw)
            .ok()
            .filter(|count| *count <= MAX_STOCK)
            .map(Self)
            .ok_or(FieldError::AboveMaximum {
                max: i64::from(MAX_STOCK),
            })
    }

    pub const fn new_unchecked(count: u32) -> Self {
        Self(count)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    id: i64,
    first_name: AuthorName,
    last_name: AuthorName,
}

impl Author {
    pub const fn new(id: i64, first_name: AuthorName, last_name: AuthorName) -> Self {
        Self {
            id,
            first_name,
            last_name,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn first_name(&self) -> &AuthorName {
        &self.first_name
    }

    pub const fn last_name(&self) -> &AuthorName {
        &self.last_name
    }
}

/// An author together with the titles of their books, in ascending book id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorDetails {
    author: Author,
    books: Vec<String>,
}

impl AuthorDetails {
    pub const fn new(author: Author, books: Vec<String>) -> Self {
        Self { author, books }
    }

    pub const fn author(&self) -> &Author {
        &self.author
    }

    pub fn books(&self) -> &[String] {
        &self.books
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    id: i64,
    title: BookTitle,
    author_id: i64,
    count: Stock,
}

impl Book {
    pub const fn new(id: i64, title: BookTitle, author_id: i64, count: Stock) -> Self {
        Self {
            id,
            title,
            author_id,
            count,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    pub const fn author_id(&self) -> i64 {
        self.author_id
    }

    pub const fn count(&self) -> Stock {
        self.count
    }
}

/// Which books a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookFilter {
    #[default]
    All,
    ByAuthor(i64),
    /// The filter can match no book at all, e.g. a non-numeric author id.
    Empty,
}

impl BookFilter {
    /// Interprets the raw `author` query parameter. A blank value disables the filter.
    pub fn from_author_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::All,
            Some(raw) => raw.parse().map_or(Self::Empty, Self::ByAuthor),
        }
    }

    pub const fn author_id(self) -> Option<i64> {
        match self {
            Self::ByAuthor(id) => Some(id),
            Self::All | Self::Empty => None,
        }
    }
}

/// Deserializes a field so that an explicit `null` stays distinguishable from a missing key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Unvalidated author fields as sent by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorInput {
    #[serde(default, deserialize_with = "present")]
    pub first_name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub last_name: Option<Value>,
}

/// Unvalidated book fields as sent by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookInput {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub author: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub count: Option<Value>,
}

#[derive(Debug)]
pub struct CreateAuthorRequest {
    first_name: AuthorName,
    last_name: AuthorName,
}

impl CreateAuthorRequest {
    pub const fn new(first_name: AuthorName, last_name: AuthorName) -> Self {
        Self {
            first_name,
            last_name,
        }
    }

    pub const fn first_name(&self) -> &AuthorName {
        &self.first_name
    }

    pub const fn last_name(&self) -> &AuthorName {
        &self.last_name
    }
}

#[derive(Error, Debug)]
pub enum CreateAuthorError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct FindAuthorRequest {
    id: i64,
}

impl FindAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum FindAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct FindAllAuthorsError(#[from] pub anyhow::Error);

#[derive(Debug)]
pub struct UpdateAuthorRequest {
    id: i64,
    first_name: Option<AuthorName>,
    last_name: Option<AuthorName>,
}

impl UpdateAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn first_name(&self) -> Option<&AuthorName> {
        self.first_name.as_ref()
    }

    pub fn set_first_name(&mut self, first_name: AuthorName) {
        self.first_name = Some(first_name);
    }

    pub const fn last_name(&self) -> Option<&AuthorName> {
        self.last_name.as_ref()
    }

    pub fn set_last_name(&mut self, last_name: AuthorName) {
        self.last_name = Some(last_name);
    }

    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none()
    }
}

#[derive(Error, Debug)]
pub enum UpdateAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<FindAuthorError> for UpdateAuthorError {
    fn from(err: FindAuthorError) -> Self {
        match err {
            FindAuthorError::NotFound { id } => Self::NotFound { id },
            FindAuthorError::Other(err) => Self::Other(err),
        }
    }
}

#[derive(Debug)]
pub struct DeleteAuthorRequest {
    id: i64,
}

impl DeleteAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum DeleteAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug)]
pub struct CreateBookRequest {
    title: BookTitle,
    author_id: i64,
    count: Stock,
}

impl CreateBookRequest {
    pub const fn new(title: BookTitle, author_id: i64, count: Stock) -> Self {
        Self {
            title,
            author_id,
            count,
        }
    }

    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    pub const fn author_id(&self) -> i64 {
        self.author_id
    }

    pub const fn count(&self) -> Stock {
        self.count
    }
}

#[derive(Error, Debug)]
pub enum CreateBookError {
    #[error("Author with id \"{author_id}\" does not exist")]
    UnknownAuthor { author_id: i64 },
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct FindBookRequest {
    id: i64,
}

impl FindBookRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum FindBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ListBooksError {
    #[error(transparent)]
    InvalidPage(#[from] crate::pagination::InvalidPage),
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct UpdateBookRequest {
    id: i64,
    title: Option<BookTitle>,
    author_id: Option<i64>,
    count: Option<Stock>,
}

impl UpdateBookRequest {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            title: None,
            author_id: None,
            count: None,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn title(&self) -> Option<&BookTitle> {
        self.title.as_ref()
    }

    pub fn set_title(&mut self, title: BookTitle) {
        self.title = Some(title);
    }

    pub const fn author_id(&self) -> Option<i64> {
        self.author_id
    }

    pub fn set_author_id(&mut self, author_id: i64) {
        self.author_id = Some(author_id);
    }

    pub const fn count(&self) -> Option<Stock> {
        self.count
    }

    pub fn set_count(&mut self, count: Stock) {
        self.count = Some(count);
    }

    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.author_id.is_none() && self.count.is_none()
    }
}

#[derive(Error, Debug)]
pub enum UpdateBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error("Author with id \"{author_id}\" does not exist")]
    UnknownAuthor { author_id: i64 },
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<FindBookError> for UpdateBookError {
    fn from(err: FindBookError) -> Self {
        match err {
            FindBookError::NotFound { id } => Self::NotFound { id },
            FindBookError::Other(err) => Self::Other(err),
        }
    }
}

#[derive(Debug)]
pub struct DeleteBookRequest {
    id: i64,
}

impl DeleteBookRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum DeleteBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug)]
pub struct BuyBookRequest {
    id: i64,
}

impl BuyBookRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum BuyBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error("Book with id \"{id}\" is out of stock")]
    OutOfStock { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(AuthorName::new("  Sy ").unwrap().as_str(), "Sy");
        assert_eq!(AuthorName::new("   "), Err(FieldError::Blank));

        let longest = "x".repeat(MAX_TEXT_LENGTH);
        assert!(BookTitle::new(&longest).is_ok());
        assert_eq!(
            BookTitle::new(&format!("{longest}x")),
            Err(FieldError::TooLong { max: 100 })
        );
    }

    #[test]
    fn title_length_counts_characters_not_bytes() {
        let title = "é".repeat(MAX_TEXT_LENGTH);
        assert!(BookTitle::new(&title).is_ok());
    }

    #[test]
    fn stock_rejects_negative_and_oversized_counts() {
        assert_eq!(Stock::new(0).unwrap().get(), 0);
        assert_eq!(Stock::new(-1), Err(FieldError::BelowMinimum { min: 0 }));
        assert_eq!(
            Stock::new(i64::from(MAX_STOCK) + 1),
            Err(FieldError::AboveMaximum {
                max: i64::from(MAX_STOCK)
            })
        );
    }

    #[test]
    fn author_filter_parses_query_values() {
        assert_eq!(BookFilter::from_author_param(None), BookFilter::All);
        assert_eq!(BookFilter::from_author_param(Some("")), BookFilter::All);
        assert_eq!(BookFilter::from_author_param(Some("7")), BookFilter::ByAuthor(7));
        assert_eq!(BookFilter::from_author_param(Some("seven")), BookFilter::Empty);
    }

    #[test]
    fn input_distinguishes_null_from_missing() {
        let input: BookInput = serde_json::from_str(r#"{"title": null}"#).unwrap();
        assert_eq!(input.title, Some(Value::Null));
        assert_eq!(input.author, None);
        assert_eq!(input.count, None);
    }
}
