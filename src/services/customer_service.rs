// src/services/customer_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::CustomerRepository,
    models::{
        customer::{Customer, CustomerPayload},
        pagination::{ListQuery, Page},
    },
};

#[derive(Clone)]
pub struct CustomerService {
    repo: CustomerRepository,
}

impl CustomerService {
    pub fn new(repo: CustomerRepository) -> Self {
        Self { repo }
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &CustomerPayload) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        payload.validate()?;
        let customer = self.repo.create(executor, payload).await?;
        tracing::info!(customer = %customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn get<'e, E>(&self, executor: E, id: Uuid) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, id)
            .await?
            .ok_or(AppError::CustomerNotFound)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &CustomerPayload,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        payload.validate()?;
        self.repo
            .update(executor, id, payload)
            .await?
            .ok_or(AppError::CustomerNotFound)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.repo.delete(executor, id).await? {
            return Err(AppError::CustomerNotFound);
        }
        tracing::info!(customer = %id, "Customer deleted");
        Ok(())
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<Customer>, AppError> {
        let pattern = query.pattern();
        let pool = self.repo.pool();

        let items = self
            .repo
            .list(pool, pattern.as_deref(), query.per_page(), query.offset())
            .await?;
        let total = self.repo.count(pool, pattern.as_deref()).await?;

        Ok(Page::new(items, total, query))
    }
}
