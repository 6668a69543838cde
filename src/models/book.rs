//! Book (catalog title) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{
    author::{author_url, display_name},
    book_instance::InstanceListing,
    form::trimmed,
    genre::Genre,
    language::Language,
};

/// Number of genres shown in the one-line genre summary
const DISPLAY_GENRE_COUNT: usize = 3;

/// Full book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub summary: String,
    /// 13 character ISBN
    pub isbn: String,
    pub author_id: Option<i32>,
    pub language_id: Option<i32>,
}

impl Book {
    pub fn absolute_url(&self) -> String {
        book_url(self.id)
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

pub fn book_url(id: i32) -> String {
    format!("/catalog/book/{}", id)
}

/// First three genre names joined with ", "
pub fn display_genre<S: AsRef<str>>(genres: &[S]) -> String {
    genres
        .iter()
        .take(DISPLAY_GENRE_COUNT)
        .map(|g| g.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Book joined with its author, language and genre names
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookListRow {
    pub id: i32,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub author_id: Option<i32>,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
    pub language_name: Option<String>,
    pub genres: Vec<String>,
}

impl BookListRow {
    pub fn author_name(&self) -> Option<String> {
        match (&self.author_first_name, &self.author_last_name) {
            (Some(first), Some(last)) => Some(display_name(first, last)),
            _ => None,
        }
    }

    pub fn display_genre(&self) -> String {
        display_genre(&self.genres)
    }
}

/// Book row in lists: title, author and genre summary
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub display_genre: String,
    pub url: String,
}

impl From<BookListRow> for BookSummary {
    fn from(row: BookListRow) -> Self {
        BookSummary {
            author: row.author_name(),
            author_url: row.author_id.map(author_url),
            display_genre: row.display_genre(),
            url: book_url(row.id),
            id: row.id,
            title: row.title,
        }
    }
}

/// Author reference embedded in book details
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorRef {
    pub id: i32,
    pub name: String,
    pub url: String,
}

/// Book detail page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub author: Option<AuthorRef>,
    pub language: Option<Language>,
    pub genres: Vec<Genre>,
    pub display_genre: String,
    pub instances: Vec<InstanceListing>,
}

/// Create/update book request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    pub author_id: Option<i32>,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 1000, message = "Summary must be 1-1000 characters"))]
    pub summary: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(equal = 13, message = "ISBN must be exactly 13 characters"))]
    pub isbn: String,
    /// Genre ids
    #[serde(default)]
    pub genre: Vec<i32>,
    #[serde(default)]
    pub language_id: Option<i32>,
}

impl BookForm {
    pub fn from_parts(book: &Book, genres: &[Genre]) -> Self {
        BookForm {
            title: book.title.clone(),
            author_id: book.author_id,
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            genre: genres.iter().map(|g| g.id).collect(),
            language_id: book.language_id,
        }
    }
}
