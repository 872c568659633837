use crate::models::{
    Author, AuthorDetails, AuthorName, Book, BookFilter, BookTitle, BuyBookError, BuyBookRequest,
    CreateAuthorError, CreateAuthorRequest, CreateBookError, CreateBookRequest, DeleteAuthorError,
    DeleteAuthorRequest, DeleteBookError, DeleteBookRequest, FindAllAuthorsError, FindAuthorError,
    FindAuthorRequest, FindBookError, FindBookRequest, Stock, UpdateAuthorError,
    UpdateAuthorRequest, UpdateBookError, UpdateBookRequest,
};
use crate::pagination::PageWindow;
use crate::repositories::{AuthorRepository, BookRepository};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Row, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

static MIGRATOR: Migrator = sqlx::migrate!();

const BOOK_COLUMNS: &str = "id, title, author_id, count";

#[derive(Debug, Clone)]
pub struct Sqlite {
    pool: SqlitePool,
}

impl Sqlite {
    pub async fn new(path: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(path)
            .with_context(|| format!("Invalid database path {path}"))?
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePool::connect_with(opts)
            .await
            .with_context(|| format!("Failed to open database at {path}"))?;

        Self::migrate(pool).await
    }

    /// Opens a private in-memory database. It lives as long as the returned store.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Invalid in-memory database options")?
            .foreign_keys(true);
        // Every connection to `:memory:` sees its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(opts)
            .await
            .context("Failed to open in-memory database")?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> anyhow::Result<Self> {
        MIGRATOR
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        Ok(Self { pool })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Author {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let first_name: &str = row.try_get("first_name")?;
        let last_name: &str = row.try_get("last_name")?;

        let first_name = AuthorName::new_unchecked(first_name);
        let last_name = AuthorName::new_unchecked(last_name);
        Ok(Self::new(id, first_name, last_name))
    }
}

impl<'r> FromRow<'r, SqliteRow> for Book {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let title: &str = row.try_get("title")?;
        let author_id = row.try_get("author_id")?;
        let count: u32 = row.try_get("count")?;

        let title = BookTitle::new_unchecked(title);
        Ok(Self::new(id, title, author_id, Stock::new_unchecked(count)))
    }
}

#[async_trait]
impl AuthorRepository for Sqlite {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError> {
        let author = sqlx::query_as(
            "INSERT INTO author (first_name, last_name) VALUES (?, ?) \
             RETURNING id, first_name, last_name",
        )
        .bind(req.first_name().as_str())
        .bind(req.last_name().as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            let err = anyhow!(err).context(format!(
                r#"Failed to create author "{} {}""#,
                req.first_name(),
                req.last_name()
            ));
            CreateAuthorError::Other(err)
        })?;

        Ok(author)
    }

    async fn find_author(&self, req: &FindAuthorRequest) -> Result<Author, FindAuthorError> {
        let author = sqlx::query_as("SELECT id, first_name, last_name FROM author WHERE id = ?")
            .bind(req.id())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    FindAuthorError::NotFound { id: req.id() }
                } else {
                    let err = anyhow!(err).context(format!(
                        r#"Failed to retrieve author with id "{}""#,
                        req.id()
                    ));
                    FindAuthorError::Other(err)
                }
            })?;

        Ok(author)
    }

    async fn find_book_titles(
        &self,
        req: &FindAuthorRequest,
    ) -> Result<Vec<String>, FindAuthorError> {
        let titles = sqlx::query_scalar("SELECT title FROM book WHERE author_id = ? ORDER BY id")
            .bind(req.id())
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err).context(format!(
                    r#"Failed to retrieve books of author with id "{}""#,
                    req.id()
                ));
                FindAuthorError::Other(err)
            })?;

        Ok(titles)
    }

    async fn find_all_authors(&self) -> Result<Vec<AuthorDetails>, FindAllAuthorsError> {
        let authors: Vec<Author> =
            sqlx::query_as("SELECT id, first_name, last_name FROM author ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .context("Failed to retrieve all authors")?;

        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT author_id, title FROM book ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .context("Failed to retrieve book titles")?;

        let mut titles: HashMap<i64, Vec<String>> = HashMap::new();
        for (author_id, title) in rows {
            titles.entry(author_id).or_default().push(title);
        }

        let authors = authors
            .into_iter()
            .map(|author| {
                let books = titles.remove(&author.id()).unwrap_or_default();
                AuthorDetails::new(author, books)
            })
            .collect();

        Ok(authors)
    }

    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<Author, UpdateAuthorError> {
        if req.is_empty() {
            return self
                .find_author(&FindAuthorRequest::new(req.id()))
                .await
                .map_err(UpdateAuthorError::from);
        }

        let mut query: QueryBuilder<'_, sqlx::Sqlite> = QueryBuilder::new("UPDATE author SET ");
        let mut parts = query.separated(", ");

        if let Some(first_name) = req.first_name() {
            parts.push("first_name = ").push_bind_unseparated(first_name.as_str());
        }
        if let Some(last_name) = req.last_name() {
            parts.push("last_name = ").push_bind_unseparated(last_name.as_str());
        }

        query
            .push(" WHERE id = ")
            .push_bind(req.id())
            .push(" RETURNING id, first_name, last_name");

        query
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err)
                    .context(format!(r#"Failed to update author with id "{}""#, req.id()));
                UpdateAuthorError::Other(err)
            })?
            .ok_or(UpdateAuthorError::NotFound { id: req.id() })
    }

    async fn delete_author(&self, req: &DeleteAuthorRequest) -> Result<(), DeleteAuthorError> {
        let context = || format!(r#"Failed to delete author with id "{}""#, req.id());

        let mut tx = self.pool.begin().await.with_context(context)?;

        sqlx::query("DELETE FROM book WHERE author_id = ?")
            .bind(req.id())
            .execute(&mut *tx)
            .await
            .with_context(context)?;

        let deleted = sqlx::query("DELETE FROM author WHERE id = ?")
            .bind(req.id())
            .execute(&mut *tx)
            .await
            .with_context(context)?
            .rows_affected();

        if deleted == 0 {
            return Err(DeleteAuthorError::NotFound { id: req.id() });
        }

        tx.commit().await.with_context(context)?;

        Ok(())
    }
}

#[async_trait]
impl BookRepository for Sqlite {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError> {
        let query = format!(
            "INSERT INTO book (title, author_id, count) VALUES (?, ?, ?) RETURNING {BOOK_COLUMNS}"
        );
        let book = sqlx::query_as(&query)
            .bind(req.title().as_str())
            .bind(req.author_id())
            .bind(req.count().get())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    CreateBookError::UnknownAuthor {
                        author_id: req.author_id(),
                    }
                } else {
                    let err = anyhow!(err)
                        .context(format!(r#"Failed to create book "{}""#, req.title()));
                    CreateBookError::Other(err)
                }
            })?;

        Ok(book)
    }

    async fn find_book(&self, req: &FindBookRequest) -> Result<Book, FindBookError> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM book WHERE id = ?");
        let book = sqlx::query_as(&query)
            .bind(req.id())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    FindBookError::NotFound { id: req.id() }
                } else {
                    let err = anyhow!(err)
                        .context(format!(r#"Failed to retrieve book with id "{}""#, req.id()));
                    FindBookError::Other(err)
                }
            })?;

        Ok(book)
    }

    async fn count_books(&self, filter: BookFilter) -> anyhow::Result<u64> {
        let count: i64 = match filter {
            BookFilter::All => sqlx::query_scalar("SELECT COUNT(*) FROM book")
                .fetch_one(&self.pool)
                .await
                .context("Failed to count books")?,
            BookFilter::ByAuthor(author_id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM book WHERE author_id = ?")
                    .bind(author_id)
                    .fetch_one(&self.pool)
                    .await
                    .with_context(|| format!(r#"Failed to count books of author "{author_id}""#))?
            }
            BookFilter::Empty => 0,
        };

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn list_books(
        &self,
        filter: BookFilter,
        window: &PageWindow,
    ) -> anyhow::Result<Vec<Book>> {
        let mut query: QueryBuilder<'_, sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM book"));
        match filter {
            BookFilter::All => {}
            BookFilter::ByAuthor(author_id) => {
                query.push(" WHERE author_id = ").push_bind(author_id);
            }
            BookFilter::Empty => return Ok(Vec::new()),
        }
        query
            .push(" ORDER BY id LIMIT ")
            .push_bind(i64::try_from(window.limit()).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(window.offset()).unwrap_or(i64::MAX));

        let books = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list books on page {}", window.number()))?;

        Ok(books)
    }

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<Book, UpdateBookError> {
        if req.is_empty() {
            return self
                .find_book(&FindBookRequest::new(req.id()))
                .await
                .map_err(UpdateBookError::from);
        }

        let mut query: QueryBuilder<'_, sqlx::Sqlite> = QueryBuilder::new("UPDATE book SET ");
        let mut parts = query.separated(", ");

        if let Some(title) = req.title() {
            parts.push("title = ").push_bind_unseparated(title.as_str());
        }
        if let Some(author_id) = req.author_id() {
            parts.push("author_id = ").push_bind_unseparated(author_id);
        }
        if let Some(count) = req.count() {
            parts.push("count = ").push_bind_unseparated(count.get());
        }

        query
            .push(" WHERE id = ")
            .push_bind(req.id())
            .push(format!(" RETURNING {BOOK_COLUMNS}"));

        query
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                if let (true, Some(author_id)) = (is_foreign_key_violation(&err), req.author_id()) {
                    UpdateBookError::UnknownAuthor { author_id }
                } else {
                    let err = anyhow!(err)
                        .context(format!(r#"Failed to update book with id "{}""#, req.id()));
                    UpdateBookError::Other(err)
                }
            })?
            .ok_or(UpdateBookError::NotFound { id: req.id() })
    }

    async fn delete_book(&self, req: &DeleteBookRequest) -> Result<(), DeleteBookError> {
        let deleted = sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(req.id())
            .execute(&self.pool)
            .await
            .with_context(|| format!(r#"Failed to delete book with id "{}""#, req.id()))?
            .rows_affected();

        if deleted == 0 {
            return Err(DeleteBookError::NotFound { id: req.id() });
        }

        Ok(())
    }

    async fn buy_book(&self, req: &BuyBookRequest) -> Result<Stock, BuyBookError> {
        let context = || format!(r#"Failed to buy book with id "{}""#, req.id());

        // Check and decrement in one statement so concurrent buyers cannot oversell.
        let remaining: Option<u32> = sqlx::query_scalar(
            "UPDATE book SET count = count - 1 WHERE id = ? AND count > 0 RETURNING count",
        )
        .bind(req.id())
        .fetch_optional(&self.pool)
        .await
        .with_context(context)
        .map_err(BuyBookError::Other)?;

        if let Some(remaining) = remaining {
            return Ok(Stock::new_unchecked(remaining));
        }

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM book WHERE id = ?")
            .bind(req.id())
            .fetch_optional(&self.pool)
            .await
            .with_context(context)
            .map_err(BuyBookError::Other)?;

        match exists {
            Some(_) => Err(BuyBookError::OutOfStock { id: req.id() }),
            None => Err(BuyBookError::NotFound { id: req.id() }),
        }
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_foreign_key_violation();
    }

    false
}
