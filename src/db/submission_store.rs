// src/db/submission_store.rs

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ReceptionRepository, ServiceRecordRepository, SolutionRepository},
    models::service_record::NewServiceRecord,
    services::submission_service::SubmissionStore,
};

/// Postgres side of a submission. Every call runs on the pool on its own;
/// there is no transaction spanning the stages.
pub struct PgSubmissionStore {
    pool: PgPool,
    reception: ReceptionRepository,
    records: ServiceRecordRepository,
    solutions: SolutionRepository,
}

impl PgSubmissionStore {
    pub fn new(
        pool: PgPool,
        reception: ReceptionRepository,
        records: ServiceRecordRepository,
        solutions: SolutionRepository,
    ) -> Self {
        Self {
            pool,
            reception,
            records,
            solutions,
        }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn current_order_number(&self) -> Result<i32, AppError> {
        self.reception.current(&self.pool).await
    }

    async fn increment_order_number(&self) -> Result<i32, AppError> {
        self.reception.increment(&self.pool).await
    }

    async fn units_of_measure(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Option<String>>, AppError> {
        let solutions = self.solutions.find_many(&self.pool, ids).await?;
        Ok(solutions
            .into_iter()
            .map(|s| (s.id, s.unit_of_measure.filter(|u| !u.trim().is_empty())))
            .collect())
    }

    async fn remaining_stock(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Decimal>, AppError> {
        let solutions = self.solutions.find_many(&self.pool, ids).await?;
        Ok(solutions
            .into_iter()
            .map(|s| (s.id, s.remaining_quantity))
            .collect())
    }

    async fn insert_record(&self, record: &NewServiceRecord) -> Result<Uuid, AppError> {
        self.records.insert(&self.pool, record).await
    }

    async fn deduct_stock(&self, solution_id: Uuid, quantity: Decimal) -> Result<Decimal, AppError> {
        self.solutions.deduct(&self.pool, solution_id, quantity).await
    }
}
