//! Book and author operations on top of a store.
//!
//! The services own field validation: every field of an input is checked,
//! including whether a referenced author exists, before any error is reported.

use crate::models::{
    AuthorDetails, AuthorInput, AuthorName, Book, BookFilter, BookInput, BookTitle, BuyBookError,
    BuyBookRequest, CreateAuthorError, CreateAuthorRequest, CreateBookError, CreateBookRequest,
    DeleteAuthorError, DeleteAuthorRequest, DeleteBookError, DeleteBookRequest,
    FindAllAuthorsError, FindAuthorError, FindAuthorRequest, FindBookError, FindBookRequest,
    ListBooksError, Stock, UpdateAuthorError, UpdateAuthorRequest, UpdateBookError,
    UpdateBookRequest,
};
use crate::pagination::{Page, PageNumber, Paginator};
use crate::repositories::{AuthorRepository, Store};
use crate::validation::{self, FieldError, ValidationErrors};
use anyhow::anyhow;
use serde_json::Value;
use std::sync::Arc;

/// Whether a field has to be present in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Optional,
}

impl Presence {
    const fn full_or_partial(partial: bool) -> Self {
        if partial { Self::Optional } else { Self::Required }
    }
}

fn field<T>(
    errors: &mut ValidationErrors,
    name: &'static str,
    val: Option<&Value>,
    presence: Presence,
    parse: impl FnOnce(&Value) -> Result<T, FieldError>,
) -> Option<T> {
    match (val, presence) {
        (Some(val), _) => errors.check(name, parse(val)),
        (None, Presence::Optional) => None,
        (None, Presence::Required) => {
            errors.add(name, FieldError::Required);
            None
        }
    }
}

fn author_name(val: &Value) -> Result<AuthorName, FieldError> {
    validation::text(val).and_then(|raw| AuthorName::new(&raw))
}

fn book_title(val: &Value) -> Result<BookTitle, FieldError> {
    validation::text(val).and_then(|raw| BookTitle::new(&raw))
}

fn stock(val: &Value) -> Result<Stock, FieldError> {
    validation::integer(val).and_then(Stock::new)
}

#[derive(Debug)]
struct AuthorFields {
    first_name: Option<AuthorName>,
    last_name: Option<AuthorName>,
}

impl AuthorFields {
    fn into_create_request(self) -> Option<CreateAuthorRequest> {
        Some(CreateAuthorRequest::new(self.first_name?, self.last_name?))
    }
}

fn author_fields(
    input: &AuthorInput,
    presence: Presence,
) -> Result<AuthorFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let first_name = field(
        &mut errors,
        "first_name",
        input.first_name.as_ref(),
        presence,
        author_name,
    );
    let last_name = field(
        &mut errors,
        "last_name",
        input.last_name.as_ref(),
        presence,
        author_name,
    );

    if errors.is_empty() {
        Ok(AuthorFields {
            first_name,
            last_name,
        })
    } else {
        Err(errors)
    }
}

#[derive(Debug)]
pub struct AuthorService<R> {
    repo: Arc<R>,
}

impl<R> Clone for AuthorService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: AuthorRepository> AuthorService<R> {
    pub const fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<AuthorDetails>, FindAllAuthorsError> {
        self.repo.find_all_authors().await
    }

    pub async fn create(&self, input: &AuthorInput) -> Result<AuthorDetails, CreateAuthorError> {
        let req = author_fields(input, Presence::Required)?
            .into_create_request()
            .ok_or_else(|| {
                CreateAuthorError::Other(anyhow!("Validated author input is incomplete"))
            })?;

        let author = self.repo.create_author(&req).await?;
        tracing::info!(author_id = author.id(), "author created");

        Ok(AuthorDetails::new(author, Vec::new()))
    }

    pub async fn get(&self, id: i64) -> Result<AuthorDetails, FindAuthorError> {
        let req = FindAuthorRequest::new(id);
        let author = self.repo.find_author(&req).await?;
        let books = self.repo.find_book_titles(&req).await?;
        Ok(AuthorDetails::new(author, books))
    }

    /// Replaces both names of an author.
    pub async fn replace(
        &self,
        id: i64,
        input: &AuthorInput,
    ) -> Result<AuthorDetails, UpdateAuthorError> {
        self.write(id, input, Presence::Required).await
    }

    /// Changes only the names present in `input`.
    pub async fn update(
        &self,
        id: i64,
        input: &AuthorInput,
    ) -> Result<AuthorDetails, UpdateAuthorError> {
        self.write(id, input, Presence::Optional).await
    }

    async fn write(
        &self,
        id: i64,
        input: &AuthorInput,
        presence: Presence,
    ) -> Result<AuthorDetails, UpdateAuthorError> {
        let find = FindAuthorRequest::new(id);
        self.repo.find_author(&find).await?;

        let fields = author_fields(input, presence)?;
        let mut req = UpdateAuthorRequest::new(id);
        if let Some(first_name) = fields.first_name {
            req.set_first_name(first_name);
        }
        if let Some(last_name) = fields.last_name {
            req.set_last_name(last_name);
        }

        let author = self.repo.update_author(&req).await?;
        let books = self.repo.find_book_titles(&find).await?;
        tracing::info!(author_id = id, "author updated");

        Ok(AuthorDetails::new(author, books))
    }

    /// Deletes an author together with all of their books.
    pub async fn delete(&self, id: i64) -> Result<(), DeleteAuthorError> {
        self.repo
            .delete_author(&DeleteAuthorRequest::new(id))
            .await?;
        tracing::info!(author_id = id, "author and their books deleted");
        Ok(())
    }
}

#[derive(Debug)]
struct BookFields {
    title: Option<BookTitle>,
    author_id: Option<i64>,
    count: Option<Stock>,
}

impl BookFields {
    /// A missing count means an empty shelf.
    fn into_create_request(self) -> Option<CreateBookRequest> {
        Some(CreateBookRequest::new(
            self.title?,
            self.author_id?,
            self.count.unwrap_or_default(),
        ))
    }
}

/// Why book input could not be turned into fields.
enum BookFieldsError {
    Invalid(ValidationErrors),
    Other(anyhow::Error),
}

impl From<BookFieldsError> for CreateBookError {
    fn from(err: BookFieldsError) -> Self {
        match err {
            BookFieldsError::Invalid(errors) => Self::Invalid(errors),
            BookFieldsError::Other(err) => Self::Other(err),
        }
    }
}

impl From<BookFieldsError> for UpdateBookError {
    fn from(err: BookFieldsError) -> Self {
        match err {
            BookFieldsError::Invalid(errors) => Self::Invalid(errors),
            BookFieldsError::Other(err) => Self::Other(err),
        }
    }
}

fn unknown_author(author_id: i64) -> ValidationErrors {
    ValidationErrors::single(
        "author",
        FieldError::UnknownPk {
            pk: author_id.to_string(),
        },
    )
}

#[derive(Debug)]
pub struct BookService<R> {
    repo: Arc<R>,
    paginator: Paginator,
}

impl<R> Clone for BookService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            paginator: self.paginator,
        }
    }
}

impl<R: Store> BookService<R> {
    pub const fn new(repo: Arc<R>, paginator: Paginator) -> Self {
        Self { repo, paginator }
    }

    /// One page of books in ascending id order.
    pub async fn list(
        &self,
        filter: BookFilter,
        page: PageNumber,
    ) -> Result<Page<Book>, ListBooksError> {
        let count = self
            .repo
            .count_books(filter)
            .await
            .map_err(ListBooksError::Other)?;
        let window = self.paginator.window(page, count)?;
        let books = self
            .repo
            .list_books(filter, &window)
            .await
            .map_err(ListBooksError::Other)?;

        Ok(window.into_page(books))
    }

    pub async fn create(&self, input: &BookInput) -> Result<Book, CreateBookError> {
        let req = self
            .book_fields(input, Presence::Required, Presence::Optional)
            .await?
            .into_create_request()
            .ok_or_else(|| CreateBookError::Other(anyhow!("Validated book input is incomplete")))?;

        let book = self
            .repo
            .create_book(&req)
            .await
            .map_err(|err| match err {
                CreateBookError::UnknownAuthor { author_id } => {
                    CreateBookError::Invalid(unknown_author(author_id))
                }
                other => other,
            })?;
        tracing::info!(book_id = book.id(), author_id = book.author_id(), "book created");

        Ok(book)
    }

    pub async fn get(&self, id: i64) -> Result<Book, FindBookError> {
        self.repo.find_book(&FindBookRequest::new(id)).await
    }

    /// Replaces title, author and count of a book. All three are required.
    pub async fn replace(&self, id: i64, input: &BookInput) -> Result<Book, UpdateBookError> {
        self.write(id, input, false).await
    }

    /// Changes only the fields present in `input`.
    pub async fn update(&self, id: i64, input: &BookInput) -> Result<Book, UpdateBookError> {
        self.write(id, input, true).await
    }

    async fn write(
        &self,
        id: i64,
        input: &BookInput,
        partial: bool,
    ) -> Result<Book, UpdateBookError> {
        self.repo.find_book(&FindBookRequest::new(id)).await?;

        let presence = Presence::full_or_partial(partial);
        let fields = self.book_fields(input, presence, presence).await?;

        let mut req = UpdateBookRequest::new(id);
        if let Some(title) = fields.title {
            req.set_title(title);
        }
        if let Some(author_id) = fields.author_id {
            req.set_author_id(author_id);
        }
        if let Some(count) = fields.count {
            req.set_count(count);
        }

        let book = self.repo.update_book(&req).await.map_err(|err| match err {
            UpdateBookError::UnknownAuthor { author_id } => {
                UpdateBookError::Invalid(unknown_author(author_id))
            }
            other => other,
        })?;
        tracing::info!(book_id = id, partial, "book updated");

        Ok(book)
    }

    pub async fn delete(&self, id: i64) -> Result<(), DeleteBookError> {
        self.repo.delete_book(&DeleteBookRequest::new(id)).await?;
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    /// Sells one copy. Fails without touching the stock when none is left.
    pub async fn buy(&self, id: i64) -> Result<Stock, BuyBookError> {
        let result = self.repo.buy_book(&BuyBookRequest::new(id)).await;
        match &result {
            Ok(remaining) => {
                tracing::info!(book_id = id, remaining = remaining.get(), "book purchased");
            }
            Err(BuyBookError::OutOfStock { .. }) => {
                tracing::info!(book_id = id, "purchase refused, book out of stock");
            }
            Err(_) => {}
        }
        result
    }

    /// Validates every field of `input`, then checks that the referenced author exists.
    async fn book_fields(
        &self,
        input: &BookInput,
        presence: Presence,
        count_presence: Presence,
    ) -> Result<BookFields, BookFieldsError> {
        let mut errors = ValidationErrors::new();
        let title = field(&mut errors, "title", input.title.as_ref(), presence, book_title);
        let author_id = field(
            &mut errors,
            "author",
            input.author.as_ref(),
            presence,
            validation::primary_key,
        );
        let count = field(&mut errors, "count", input.count.as_ref(), count_presence, stock);

        if let (Some(author_id), Some(raw)) = (author_id, input.author.as_ref()) {
            match self.repo.find_author(&FindAuthorRequest::new(author_id)).await {
                Ok(_) => {}
                Err(FindAuthorError::NotFound { .. }) => errors.add(
                    "author",
                    FieldError::UnknownPk {
                        pk: validation::pk_display(raw),
                    },
                ),
                Err(FindAuthorError::Other(err)) => return Err(BookFieldsError::Other(err)),
            }
        }

        if errors.is_empty() {
            Ok(BookFields {
                title,
                author_id,
                count,
            })
        } else {
            Err(BookFieldsError::Invalid(errors))
        }
    }
}
