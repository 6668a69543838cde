//! Home page counts

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{book::BookSummary, book_instance::LoanStatus},
    repository::Repository,
};

/// Genre name fragment highlighted on the home page
pub const FEATURED_GENRE: &str = "fantasy";

/// Catalog-wide counts shown on the home page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogCounts {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_genres: i64,
    pub num_authors: i64,
    /// Books with a genre containing "fantasy", case-insensitively
    pub fantasy_books_count: i64,
    pub fantasy_books: Vec<BookSummary>,
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Repository,
}

impl DashboardService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Whether the database answers
    pub async fn database_ready(&self) -> bool {
        match self.repository.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Database not ready");
                false
            }
        }
    }

    pub async fn counts(&self) -> AppResult<CatalogCounts> {
        let num_books = self.repository.books.count().await?;
        let num_instances = self.repository.book_instances.count().await?;
        let num_instances_available = self
            .repository
            .book_instances
            .count_by_status(LoanStatus::Available)
            .await?;
        let num_genres = self.repository.genres.count().await?;
        let num_authors = self.repository.authors.count().await?;

        let fantasy_books_count = self.repository.books.count_by_genre_name(FEATURED_GENRE).await?;
        let fantasy_books = self
            .repository
            .books
            .list_by_genre_name(FEATURED_GENRE)
            .await?
            .into_iter()
            .map(BookSummary::from)
            .collect();

        Ok(CatalogCounts {
            num_books,
            num_instances,
            num_instances_available,
            num_genres,
            num_authors,
            fantasy_books_count,
            fantasy_books,
        })
    }
}
