// src/db/solution_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::solution::{Solution, SolutionPayload},
};

const COLUMNS: &str = "id, name, lot, concentration, unit_of_measure, dosage_per_area, \
                       initial_stock, total_quantity, remaining_quantity, created_at, updated_at";

#[derive(Clone)]
pub struct SolutionRepository {
    pool: PgPool,
}

impl SolutionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &SolutionPayload) -> Result<Solution, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO solutions (
                name, lot, concentration, unit_of_measure, dosage_per_area,
                initial_stock, total_quantity, remaining_quantity
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COLUMNS}
            "#
        );

        let solution = sqlx::query_as::<_, Solution>(&sql)
            .bind(&payload.name)
            .bind(&payload.lot)
            .bind(payload.concentration)
            .bind(&payload.unit_of_measure)
            .bind(payload.dosage_per_area)
            .bind(payload.initial_stock)
            .bind(payload.total_quantity)
            .bind(payload.remaining_quantity)
            .fetch_one(executor)
            .await?;

        Ok(solution)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Solution>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {COLUMNS} FROM solutions WHERE id = $1");

        let solution = sqlx::query_as::<_, Solution>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(solution)
    }

    pub async fn find_many<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Solution>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {COLUMNS} FROM solutions WHERE id = ANY($1)");

        let solutions = sqlx::query_as::<_, Solution>(&sql)
            .bind(ids)
            .fetch_all(executor)
            .await?;

        Ok(solutions)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &SolutionPayload,
    ) -> Result<Option<Solution>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE solutions
            SET name = $2, lot = $3, concentration = $4, unit_of_measure = $5,
                dosage_per_area = $6, initial_stock = $7, total_quantity = $8,
                remaining_quantity = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );

        let solution = sqlx::query_as::<_, Solution>(&sql)
            .bind(id)
            .bind(&payload.name)
            .bind(&payload.lot)
            .bind(payload.concentration)
            .bind(&payload.unit_of_measure)
            .bind(payload.dosage_per_area)
            .bind(payload.initial_stock)
            .bind(payload.total_quantity)
            .bind(payload.remaining_quantity)
            .fetch_optional(executor)
            .await?;

        Ok(solution)
    }

    /// Subtracts `quantity` from the remaining stock and returns what is left.
    /// The result may be negative.
    pub async fn deduct<'e, E>(&self, executor: E, id: Uuid, quantity: Decimal) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let remaining: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE solutions
            SET remaining_quantity = remaining_quantity - $2, updated_at = NOW()
            WHERE id = $1
            RETURNING remaining_quantity
            "#,
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(executor)
        .await?;

        remaining.ok_or(AppError::SolutionNotFound)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM solutions WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        pattern: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Solution>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {COLUMNS} FROM solutions
            WHERE $1::TEXT IS NULL OR name ILIKE $1 OR lot ILIKE $1
            ORDER BY name ASC
            LIMIT $2 OFFSET $3
            "#
        );

        let solutions = sqlx::query_as::<_, Solution>(&sql)
            .bind(pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?;

        Ok(solutions)
    }

    pub async fn count<'e, E>(&self, executor: E, pattern: Option<&str>) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM solutions WHERE $1::TEXT IS NULL OR name ILIKE $1 OR lot ILIKE $1",
        )
        .bind(pattern)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }
}
