//! Book instances repository

use chrono::NaiveDate;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book_instance::{BookInstance, BookInstanceForm, InstanceListing, LoanStatus},
};

const LISTING_SELECT: &str = r#"
    SELECT bi.id, bi.imprint, bi.due_back, bi.status, bi.book_id,
           b.title AS book_title,
           bi.borrower_id,
           u.username AS borrower_username,
           (bi.due_back IS NOT NULL AND bi.due_back < CURRENT_DATE) AS is_overdue
    FROM book_instances bi
    JOIN books b ON b.id = bi.book_id
    LEFT JOIN users u ON u.id = bi.borrower_id
"#;

const INSTANCE_COLUMNS: &str = "id, book_id, imprint, due_back, status, borrower_id";

#[derive(Clone)]
pub struct BookInstancesRepository {
    pool: Pool<Postgres>,
}

impl BookInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE status = $1")
                .bind(status)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        let query = format!("SELECT {} FROM book_instances WHERE id = $1", INSTANCE_COLUMNS);
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    pub async fn get_listing(&self, id: Uuid) -> AppResult<InstanceListing> {
        let query = format!("{} WHERE bi.id = $1", LISTING_SELECT);
        sqlx::query_as::<_, InstanceListing>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    /// Copies of one book, soonest due first
    pub async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<InstanceListing>> {
        let query = format!(
            "{} WHERE bi.book_id = $1 ORDER BY bi.due_back ASC NULLS LAST, bi.id",
            LISTING_SELECT
        );
        let rows = sqlx::query_as::<_, InstanceListing>(&query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// On-loan copies, optionally restricted to one borrower
    pub async fn count_on_loan(&self, borrower_id: Option<i32>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM book_instances
            WHERE status = $1 AND ($2::int4 IS NULL OR borrower_id = $2)
            "#,
        )
        .bind(LoanStatus::OnLoan)
        .bind(borrower_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// On-loan copies ordered by due date ascending
    pub async fn list_on_loan(
        &self,
        borrower_id: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<InstanceListing>> {
        let query = format!(
            r#"{}
            WHERE bi.status = $1 AND ($2::int4 IS NULL OR bi.borrower_id = $2)
            ORDER BY bi.due_back ASC NULLS LAST, bi.id
            LIMIT $3 OFFSET $4"#,
            LISTING_SELECT
        );
        let rows = sqlx::query_as::<_, InstanceListing>(&query)
            .bind(LoanStatus::OnLoan)
            .bind(borrower_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Admin list with optional status/due date filters
    pub async fn list_filtered(
        &self,
        status: Option<LoanStatus>,
        due_back: Option<NaiveDate>,
    ) -> AppResult<Vec<InstanceListing>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(LISTING_SELECT);
        builder.push(" WHERE TRUE");
        if let Some(status) = status {
            builder.push(" AND bi.status = ").push_bind(status);
        }
        if let Some(due_back) = due_back {
            builder.push(" AND bi.due_back = ").push_bind(due_back);
        }
        builder.push(" ORDER BY bi.due_back ASC NULLS LAST, bi.id");

        let rows = builder
            .build_query_as::<InstanceListing>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Set a new due date; status is left unchanged. Last write wins.
    pub async fn update_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        let query = format!(
            "UPDATE book_instances SET due_back = $2 WHERE id = $1 RETURNING {}",
            INSTANCE_COLUMNS
        );
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(id)
            .bind(due_back)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    pub async fn create(&self, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let query = format!(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, due_back, status, borrower_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        );
        let instance = sqlx::query_as::<_, BookInstance>(&query)
            .bind(Uuid::new_v4())
            .bind(form.book_id)
            .bind(&form.imprint)
            .bind(form.due_back)
            .bind(form.status)
            .bind(form.borrower_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::from_db(e, "Book instance"))?;
        Ok(instance)
    }

    pub async fn update(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let query = format!(
            r#"
            UPDATE book_instances
            SET book_id = $2, imprint = $3, due_back = $4, status = $5, borrower_id = $6
            WHERE id = $1
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        );
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(id)
            .bind(form.book_id)
            .bind(&form.imprint)
            .bind(form.due_back)
            .bind(form.status)
            .bind(form.borrower_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::from_db(e, "Book instance"))?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book instance {} not found", id)));
        }
        Ok(())
    }
}
