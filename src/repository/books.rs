//! Books repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookForm, BookListRow},
        genre::Genre,
    },
};

use super::like_contains;

/// Book columns plus author names, language name and sorted genre names
const BOOK_LIST_SELECT: &str = r#"
    SELECT b.id, b.title, b.summary, b.isbn, b.author_id,
           a.first_name AS author_first_name,
           a.last_name AS author_last_name,
           l.name AS language_name,
           ARRAY(
               SELECT g.name::text
               FROM book_genres bg
               JOIN genres g ON g.id = bg.genre_id
               WHERE bg.book_id = b.id
               ORDER BY g.name
           ) AS genres
    FROM books b
    LEFT JOIN authors a ON a.id = b.author_id
    LEFT JOIN languages l ON l.id = b.language_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Books in default ordering (title)
    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<BookListRow>> {
        let query = format!("{} ORDER BY b.title, b.id LIMIT $1 OFFSET $2", BOOK_LIST_SELECT);
        let rows = sqlx::query_as::<_, BookListRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_all(&self) -> AppResult<Vec<BookListRow>> {
        let query = format!("{} ORDER BY b.title, b.id", BOOK_LIST_SELECT);
        let rows = sqlx::query_as::<_, BookListRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<BookListRow>> {
        let query = format!("{} WHERE b.author_id = $1 ORDER BY b.title, b.id", BOOK_LIST_SELECT);
        let rows = sqlx::query_as::<_, BookListRow>(&query)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Books with at least one genre whose name contains `needle`, case-insensitively
    pub async fn list_by_genre_name(&self, needle: &str) -> AppResult<Vec<BookListRow>> {
        let query = format!(
            r#"{} WHERE EXISTS (
                SELECT 1 FROM book_genres bg
                JOIN genres g ON g.id = bg.genre_id
                WHERE bg.book_id = b.id AND g.name ILIKE $1
            )
            ORDER BY b.title, b.id"#,
            BOOK_LIST_SELECT
        );
        let rows = sqlx::query_as::<_, BookListRow>(&query)
            .bind(like_contains(needle))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Each matching book counts once, however many of its genres match
    pub async fn count_by_genre_name(&self, needle: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT bg.book_id)
            FROM book_genres bg
            JOIN genres g ON g.id = bg.genre_id
            WHERE g.name ILIKE $1
            "#,
        )
        .bind(like_contains(needle))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            "SELECT id, title, summary, isbn, author_id, language_id FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn get_row(&self, id: i32) -> AppResult<BookListRow> {
        let query = format!("{} WHERE b.id = $1", BOOK_LIST_SELECT);
        sqlx::query_as::<_, BookListRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn genres(&self, book_id: i32) -> AppResult<Vec<Genre>> {
        let rows = sqlx::query_as::<_, Genre>(
            r#"
            SELECT g.id, g.name
            FROM genres g
            JOIN book_genres bg ON bg.genre_id = g.id
            WHERE bg.book_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert the book and its genre links in one transaction
    pub async fn create(&self, form: &BookForm) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, summary, isbn, author_id, language_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, summary, isbn, author_id, language_id
            "#,
        )
        .bind(&form.title)
        .bind(&form.summary)
        .bind(&form.isbn)
        .bind(form.author_id)
        .bind(form.language_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, &format!("Book with ISBN {}", form.isbn)))?;

        sqlx::query(
            "INSERT INTO book_genres (book_id, genre_id) SELECT $1, UNNEST($2::int4[]) ON CONFLICT DO NOTHING",
        )
        .bind(book.id)
        .bind(&form.genre)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(book)
    }

    /// Update the book and replace its genre links
    pub async fn update(&self, id: i32, form: &BookForm) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $2, summary = $3, isbn = $4, author_id = $5, language_id = $6
            WHERE id = $1
            RETURNING id, title, summary, isbn, author_id, language_id
            "#,
        )
        .bind(id)
        .bind(&form.title)
        .bind(&form.summary)
        .bind(&form.isbn)
        .bind(form.author_id)
        .bind(form.language_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, &format!("Book with ISBN {}", form.isbn)))?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO book_genres (book_id, genre_id) SELECT $1, UNNEST($2::int4[]) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(&form.genre)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(book)
    }

    /// Fails with a conflict while copies of the book exist
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_db(e, &format!("Book {}", id)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}
