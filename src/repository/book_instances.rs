//! Book instances (copies) repository

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        admin::InstanceFilter,
        book_instance::{BookInstance, BookInstanceForm, LoanStatus},
    },
};

const SELECT_INSTANCE: &str = r#"
    SELECT bi.id, bi.book_id, bi.imprint, bi.due_back, bi.status, bi.borrower_id,
           b.title AS book_title, u.username AS borrower_username
    FROM book_instances bi
    JOIN books b ON b.id = bi.book_id
    LEFT JOIN users u ON u.id = bi.borrower_id
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookInstancesRepository: Send + Sync {
    async fn count(&self) -> AppResult<i64>;
    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64>;
    /// Copies of one book, soonest due first
    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>>;
    async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance>;
    /// Copies on loan, optionally restricted to one borrower
    async fn count_on_loan(&self, borrower_id: Option<i32>) -> AppResult<i64>;
    /// Copies on loan ordered by due date ascending
    async fn list_on_loan(
        &self,
        borrower_id: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BookInstance>>;
    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<()>;
    async fn count_filtered(&self, filter: InstanceFilter) -> AppResult<i64>;
    async fn list_filtered(
        &self,
        filter: InstanceFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BookInstance>>;
    async fn create(&self, form: &BookInstanceForm) -> AppResult<BookInstance>;
    async fn update(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgBookInstancesRepository {
    pool: Pool<Postgres>,
}

impl PgBookInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// WHERE clause for an admin filter, with placeholders starting at $1
    fn filter_clause(filter: &InstanceFilter) -> (String, usize) {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if filter.status.is_some() {
            conditions.push(format!("bi.status = ${}", idx));
            idx += 1;
        }
        match filter.has_due_back {
            Some(true) => conditions.push("bi.due_back IS NOT NULL".to_string()),
            Some(false) => conditions.push("bi.due_back IS NULL".to_string()),
            None => {}
        }
        if filter.due_from.is_some() {
            conditions.push(format!("bi.due_back >= ${}", idx));
            idx += 1;
        }
        if filter.due_until.is_some() {
            conditions.push(format!("bi.due_back < ${}", idx));
            idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (where_clause, idx)
    }
}

#[async_trait]
impl BookInstancesRepository for PgBookInstancesRepository {
    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        let query = format!("{} WHERE bi.book_id = $1 ORDER BY bi.due_back, bi.id", SELECT_INSTANCE);
        let instances = sqlx::query_as::<_, BookInstance>(&query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(instances)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        let query = format!("{} WHERE bi.id = $1", SELECT_INSTANCE);
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Book instance", id))
    }

    async fn count_on_loan(&self, borrower_id: Option<i32>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM book_instances
            WHERE status = $1 AND ($2::int IS NULL OR borrower_id = $2)
            "#,
        )
        .bind(LoanStatus::OnLoan)
        .bind(borrower_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_on_loan(
        &self,
        borrower_id: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BookInstance>> {
        let query = format!(
            r#"{}
            WHERE bi.status = $1 AND ($2::int IS NULL OR bi.borrower_id = $2)
            ORDER BY bi.due_back, bi.id
            LIMIT $3 OFFSET $4"#,
            SELECT_INSTANCE
        );
        let instances = sqlx::query_as::<_, BookInstance>(&query)
            .bind(LoanStatus::OnLoan)
            .bind(borrower_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(instances)
    }

    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<()> {
        let result = sqlx::query("UPDATE book_instances SET due_back = $1 WHERE id = $2")
            .bind(due_back)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Book instance", id));
        }
        Ok(())
    }

    async fn count_filtered(&self, filter: InstanceFilter) -> AppResult<i64> {
        let (where_clause, _) = Self::filter_clause(&filter);
        let query = format!("SELECT COUNT(*) FROM book_instances bi {}", where_clause);

        let mut builder = sqlx::query_scalar::<_, i64>(&query);
        if let Some(status) = filter.status {
            builder = builder.bind(status);
        }
        if let Some(from) = filter.due_from {
            builder = builder.bind(from);
        }
        if let Some(until) = filter.due_until {
            builder = builder.bind(until);
        }

        Ok(builder.fetch_one(&self.pool).await?)
    }

    async fn list_filtered(
        &self,
        filter: InstanceFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BookInstance>> {
        let (where_clause, idx) = Self::filter_clause(&filter);
        let query = format!(
            "{} {} ORDER BY bi.due_back, bi.id LIMIT ${} OFFSET ${}",
            SELECT_INSTANCE,
            where_clause,
            idx,
            idx + 1
        );

        let mut builder = sqlx::query_as::<_, BookInstance>(&query);
        if let Some(status) = filter.status {
            builder = builder.bind(status);
        }
        if let Some(from) = filter.due_from {
            builder = builder.bind(from);
        }
        if let Some(until) = filter.due_until {
            builder = builder.bind(until);
        }

        let rows = builder.bind(limit).bind(offset).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn create(&self, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, due_back, status, borrower_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(form.book_id)
        .bind(&form.imprint)
        .bind(form.due_back)
        .bind(form.status)
        .bind(form.borrower_id)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    async fn update(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let result = sqlx::query(
            r#"
            UPDATE book_instances
            SET book_id = $1, imprint = $2, due_back = $3, status = $4, borrower_id = $5
            WHERE id = $6
            "#,
        )
        .bind(form.book_id)
        .bind(&form.imprint)
        .bind(form.due_back)
        .bind(form.status)
        .bind(form.borrower_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Book instance", id));
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Book instance", id));
        }
        Ok(())
    }
}
