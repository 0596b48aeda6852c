// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, SessionContext, User},
};

const SESSION_DAYS: i64 = 7;

/// Turns a session into a bearer token and back.
#[derive(Clone)]
pub struct SessionCodec {
    secret: String,
}

impl SessionCodec {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn save(&self, session: &SessionContext) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(SESSION_DAYS);

        let claims = Claims {
            sub: session.user_id,
            email: session.email.clone(),
            adm: session.is_admin,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )?)
    }

    pub fn load(&self, token: &str) -> Result<SessionContext, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(SessionContext {
            user_id: token_data.claims.sub,
            email: token_data.claims.email,
            is_admin: token_data.claims.adm,
        })
    }
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    sessions: SessionCodec,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, sessions: SessionCodec) -> Self {
        Self {
            user_repo,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionCodec {
        &self.sessions
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // bcrypt is CPU-bound
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user = %user.id, admin = user.is_admin, "Session opened");
        self.sessions.save(&SessionContext::from(&user))
    }

    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;

        self.user_repo
            .create_user(executor, email, &hashed_password, is_admin)
            .await
    }

    pub async fn current_user(&self, session: &SessionContext) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(session.user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// Creates the first administrator when the users table is empty.
    pub async fn ensure_admin<'e, E>(
        &self,
        executor: E,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if self.user_repo.count().await? > 0 {
            return Ok(());
        }

        match (email, password) {
            (Some(email), Some(password)) => {
                let admin = self.create_user(executor, email, password, true).await?;
                tracing::info!(user = %admin.id, "Initial administrator created");
            }
            _ => {
                tracing::warn!("No users exist and ADMIN_EMAIL/ADMIN_PASSWORD are not set");
            }
        }
        Ok(())
    }
}
