// src/services/solution_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::SolutionRepository,
    models::{
        solution::{Solution, SolutionPayload},
        pagination::{ListQuery, Page},
    },
};

#[derive(Clone)]
pub struct SolutionService {
    repo: SolutionRepository,
}

impl SolutionService {
    pub fn new(repo: SolutionRepository) -> Self {
        Self { repo }
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &SolutionPayload) -> Result<Solution, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        payload.validate()?;
        let solution = self.repo.create(executor, payload).await?;
        tracing::info!(
            solution = %solution.id,
            remaining = %solution.remaining_quantity,
            "Solution created"
        );
        Ok(solution)
    }

    pub async fn get<'e, E>(&self, executor: E, id: Uuid) -> Result<Solution, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, id)
            .await?
            .ok_or(AppError::SolutionNotFound)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &SolutionPayload,
    ) -> Result<Solution, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Admin edits overwrite the counters, including after deductions.
        payload.validate()?;
        self.repo
            .update(executor, id, payload)
            .await?
            .ok_or(AppError::SolutionNotFound)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.repo.delete(executor, id).await? {
            return Err(AppError::SolutionNotFound);
        }
        tracing::info!(solution = %id, "Solution deleted");
        Ok(())
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<Solution>, AppError> {
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
