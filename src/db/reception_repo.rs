// src/db/reception_repo.rs

use sqlx::{Executor, Postgres};

use crate::common::error::AppError;

/// Single-row counter behind the order numbers.
#[derive(Clone, Default)]
pub struct ReceptionRepository;

impl ReceptionRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn current<'e, E>(&self, executor: E) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let value: i32 = sqlx::query_scalar("SELECT numar_ordine FROM reception_number WHERE id = 1")
            .fetch_one(executor)
            .await?;

        Ok(value)
    }

    /// Server-side increment; concurrent callers each get a distinct value.
    pub async fn increment<'e, E>(&self, executor: E) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let value: i32 = sqlx::query_scalar(
            "UPDATE reception_number SET numar_ordine = numar_ordine + 1 WHERE id = 1 RETURNING numar_ordine",
        )
        .fetch_one(executor)
        .await?;

        Ok(value)
    }
}
