// src/db/customer_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::customer::{Customer, CustomerPayload},
};

const COLUMNS: &str = "id, name, email, phone, contract_number, location, total_surface, jobs, created_at, updated_at";

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &CustomerPayload) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO customers (name, email, phone, contract_number, location, total_surface, jobs)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        );

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(&payload.name)
            .bind(&payload.email)
            .bind(&payload.phone)
            .bind(&payload.contract_number)
            .bind(&payload.location)
            .bind(payload.total_surface)
            .bind(Json(&payload.jobs))
            .fetch_one(executor)
            .await?;

        Ok(customer)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {COLUMNS} FROM customers WHERE id = $1");

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(customer)
    }

    /// Last write wins; no version check.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &CustomerPayload,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE customers
            SET name = $2, email = $3, phone = $4, contract_number = $5,
                location = $6, total_surface = $7, jobs = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .bind(&payload.name)
            .bind(&payload.email)
            .bind(&payload.phone)
            .bind(&payload.contract_number)
            .bind(&payload.location)
            .bind(payload.total_surface)
            .bind(Json(&payload.jobs))
            .fetch_optional(executor)
            .await?;

        Ok(customer)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Page of customers matching `pattern` (ILIKE) on name, contract or location.
    pub async fn list<'e, E>(
        &self,
        executor: E,
        pattern: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {COLUMNS} FROM customers
            WHERE $1::TEXT IS NULL
               OR name ILIKE $1 OR contract_number ILIKE $1 OR location ILIKE $1
            ORDER BY name ASC
            LIMIT $2 OFFSET $3
            "#
        );

        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?;

        Ok(customers)
    }

    pub async fn count<'e, E>(&self, executor: E, pattern: Option<&str>) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM customers
            WHERE $1::TEXT IS NULL
               OR name ILIKE $1 OR contract_number ILIKE $1 OR location ILIKE $1
            "#,
        )
        .bind(pattern)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }
}
