//! Languages repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::language::{Language, LanguageForm},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguagesRepository: Send + Sync {
    async fn count(&self) -> AppResult<i64>;
    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Language>>;
    async fn get_by_id(&self, id: i32) -> AppResult<Language>;
    async fn create(&self, form: &LanguageForm) -> AppResult<Language>;
    async fn update(&self, id: i32, form: &LanguageForm) -> AppResult<Language>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgLanguagesRepository {
    pool: Pool<Postgres>,
}

impl PgLanguagesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LanguagesRepository for PgLanguagesRepository {
    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM languages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Language>> {
        let languages = sqlx::query_as::<_, Language>(
            "SELECT id, name FROM languages ORDER BY name LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(languages)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Language> {
        sqlx::query_as::<_, Language>("SELECT id, name FROM languages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Language", id))
    }

    async fn create(&self, form: &LanguageForm) -> AppResult<Language> {
        let language = sqlx::query_as::<_, Language>(
            "INSERT INTO languages (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&form.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(language)
    }

    async fn update(&self, id: i32, form: &LanguageForm) -> AppResult<Language> {
        sqlx::query_as::<_, Language>(
            "UPDATE languages SET name = $1 WHERE id = $2 RETURNING id, name",
        )
        .bind(&form.name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Language", id))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM languages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Language", id));
        }
        Ok(())
    }
}
