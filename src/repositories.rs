use crate::models::{
    Author, AuthorDetails, Book, BookFilter, BuyBookError, BuyBookRequest, CreateAuthorError,
    CreateAuthorRequest, CreateBookError, CreateBookRequest, DeleteAuthorError,
    DeleteAuthorRequest, DeleteBookError, DeleteBookRequest, FindAllAuthorsError, FindAuthorError,
    FindAuthorRequest, FindBookError, FindBookRequest, Stock, UpdateAuthorError,
    UpdateAuthorRequest, UpdateBookError, UpdateBookRequest,
};
use crate::pagination::PageWindow;
use async_trait::async_trait;

#[async_trait]
pub trait AuthorRepository: Send + Sync + 'static {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError>;

    async fn find_author(&self, req: &FindAuthorRequest) -> Result<Author, FindAuthorError>;

    /// Titles of the author's books, in ascending book id order.
    async fn find_book_titles(&self, req: &FindAuthorRequest)
    -> Result<Vec<String>, FindAuthorError>;

    /// All authors in ascending id order, each with their book titles.
    async fn find_all_authors(&self) -> Result<Vec<AuthorDetails>, FindAllAuthorsError>;

    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<Author, UpdateAuthorError>;

    /// Deletes the author and every book that references it.
    async fn delete_author(&self, req: &DeleteAuthorRequest) -> Result<(), DeleteAuthorError>;
}

#[async_trait]
pub trait BookRepository: Send + Sync + 'static {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError>;

    async fn find_book(&self, req: &FindBookRequest) -> Result<Book, FindBookError>;

    async fn count_books(&self, filter: BookFilter) -> anyhow::Result<u64>;

    /// Books matching `filter` in ascending id order, restricted to `window`.
    async fn list_books(
        &self,
        filter: BookFilter,
        window: &PageWindow,
    ) -> anyhow::Result<Vec<Book>>;

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<Book, UpdateBookError>;

    async fn delete_book(&self, req: &DeleteBookRequest) -> Result<(), DeleteBookError>;

    /// Takes one copy out of stock, returning what is left.
    async fn buy_book(&self, req: &BuyBookRequest) -> Result<Stock, BuyBookError>;
}

/// A store that holds both entities.
pub trait Store: AuthorRepository + BookRepository {}

impl<T: AuthorRepository + BookRepository> Store for T {}
