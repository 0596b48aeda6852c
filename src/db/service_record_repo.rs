// src/db/service_record_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::service_record::{NewServiceRecord, RecordFilter, ServiceRecordRow},
};

const SELECT_RECORDS: &str = r#"
    SELECT l.*,
           c.name AS customer_name,
           (e.last_name || ' ' || e.first_name) AS employee_name
    FROM lucrari l
    LEFT JOIN customers c ON c.id = l.customer_id
    LEFT JOIN employees e ON e.id = l.employee_id
"#;

const FILTER: &str = r#"
    ($1::TIMESTAMPTZ IS NULL OR l.created_at >= $1)
    AND ($2::TIMESTAMPTZ IS NULL OR l.created_at <= $2)
    AND ($3::UUID IS NULL OR l.customer_id = $3)
"#;

/// `lucrari`: written once per submission, never updated.
#[derive(Clone)]
pub struct ServiceRecordRepository {
    pool: PgPool,
}

impl ServiceRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn insert<'e, E>(&self, executor: E, record: &NewServiceRecord) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut query = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO lucrari (
                numar_ordine, customer_id, employee_id,
                procedure1, product_name1, product_lot1, product_quantity1, concentration1,
                procedure2, product_name2, product_lot2, product_quantity2, concentration2,
                procedure3, product_name3, product_lot3, product_quantity3, concentration3,
                procedure4, product_name4, product_lot4, product_quantity4, concentration4
            )
            VALUES (
                $1, $2, $3,
                $4, $5, $6, $7, $8,
                $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18,
                $19, $20, $21, $22, $23
            )
            RETURNING id
            "#,
        )
        .bind(record.order_number)
        .bind(record.customer_id)
        .bind(record.employee_id);

        for slot in &record.slots {
            query = query
                .bind(slot.as_ref().map(|s| s.procedure.clone()))
                .bind(slot.as_ref().and_then(|s| s.product_name.clone()))
                .bind(slot.as_ref().and_then(|s| s.product_lot.clone()))
                .bind(slot.as_ref().and_then(|s| s.product_quantity))
                .bind(slot.as_ref().and_then(|s| s.concentration.clone()));
        }

        let id = query.fetch_one(executor).await?;
        Ok(id)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<ServiceRecordRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{SELECT_RECORDS} WHERE l.id = $1");

        let row = sqlx::query_as::<_, ServiceRecordRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(row)
    }

    /// Newest first. `limit = None` returns every matching row (used by the export).
    pub async fn list<'e, E>(
        &self,
        executor: E,
        filter: &RecordFilter,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<ServiceRecordRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "{SELECT_RECORDS} WHERE {FILTER} ORDER BY l.created_at DESC, l.numar_ordine DESC LIMIT $4 OFFSET $5"
        );

        let rows = sqlx::query_as::<_, ServiceRecordRow>(&sql)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.customer_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?;

        Ok(rows)
    }

    pub async fn count<'e, E>(&self, executor: E, filter: &RecordFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT COUNT(*) FROM lucrari l WHERE {FILTER}");

        let total: i64 = sqlx::query_scalar(&sql)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.customer_id)
            .fetch_one(executor)
            .await?;

        Ok(total)
    }
}
