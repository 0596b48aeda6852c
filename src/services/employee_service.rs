// src/services/employee_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::EmployeeRepository,
    models::{
        employee::{Employee, EmployeePayload},
        pagination::{ListQuery, Page},
    },
};

#[derive(Clone)]
pub struct EmployeeService {
    repo: EmployeeRepository,
}

impl EmployeeService {
    pub fn new(repo: EmployeeRepository) -> Self {
        Self { repo }
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &EmployeePayload) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        payload.validate()?;
        let employee = self.repo.create(executor, payload).await?;
        tracing::info!(employee = %employee.id, "Employee created");
        Ok(employee)
    }

    pub async fn get<'e, E>(&self, executor: E, id: Uuid) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, id)
            .await?
            .ok_or(AppError::EmployeeNotFound)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &EmployeePayload,
    ) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        payload.validate()?;
        self.repo
            .update(executor, id, payload)
            .await?
            .ok_or(AppError::EmployeeNotFound)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.repo.delete(executor, id).await? {
            return Err(AppError::EmployeeNotFound);
        }
        tracing::info!(employee = %id, "Employee deleted");
        Ok(())
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<Employee>, AppError> {
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
