mod authors;
mod books;
mod handler;

use crate::pagination::Paginator;
use crate::repositories::Store;
use crate::services::{AuthorService, BookService};
use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Debug)]
pub struct AppState<R> {
    authors: AuthorService<R>,
    books: BookService<R>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            authors: self.authors.clone(),
            books: self.books.clone(),
        }
    }
}

impl<R: Store> AppState<R> {
    pub fn new(store: Arc<R>, paginator: Paginator) -> Self {
        Self {
            authors: AuthorService::new(Arc::clone(&store)),
            books: BookService::new(store, paginator),
        }
    }

    pub const fn authors(&self) -> &AuthorService<R> {
        &self.authors
    }

    pub const fn books(&self) -> &BookService<R> {
        &self.books
    }
}

#[derive(Debug)]
pub struct HttpServerConfig {
    port: u16,
}

impl HttpServerConfig {
    pub const fn new(port: u16) -> Self {
        Self { port }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<R: Store>(
        state: AppState<R>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self> {
        let router = router(state);

        let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("Failed to bind to port {}", config.port))?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self
            .listener
            .local_addr()
            .context("Failed to read listener address")?;
        tracing::info!(%addr, "bookshop api listening");

        axum::serve(self.listener, self.router)
            .await
            .context("Received error from running server")?;
        Ok(())
    }
}

/// The complete application, with request tracing.
pub fn router<R: Store>(state: AppState<R>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes<R: Store>() -> Router<AppState<R>> {
    Router::new()
        .route(
            "/books/",
            get(books::list_books::<R>).post(books::create_book::<R>),
        )
        .route(
            "/books/{id}/",
            get(books::get_book::<R>)
                .put(books::replace_book::<R>)
                .patch(books::update_book::<R>)
                .delete(books::delete_book::<R>),
        )
        .route("/books/{id}/buy/", post(books::buy_book::<R>))
        .route(
            "/authors/",
            get(authors::list_authors::<R>).post(authors::create_author::<R>),
        )
        .route(
            "/authors/{id}/",
            get(authors::get_author::<R>)
                .put(authors::replace_author::<R>)
                .patch(authors::update_author::<R>)
                .delete(authors::delete_author::<R>),
        )
}
