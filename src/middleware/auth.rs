// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::SessionContext,
};

/// Loads the session from the bearer token into the request extensions.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;

    let session = app_state
        .auth_service
        .sessions()
        .load(bearer.token())
        .map_err(|e| e.to_api_error(&locale))?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Same as `auth_guard`, and the session must be an administrator's.
pub async fn admin_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;

    let session = app_state
        .auth_service
        .sessions()
        .load(bearer.token())
        .map_err(|e| e.to_api_error(&locale))?;

    if !session.is_admin {
        tracing::warn!(user = %session.user_id, path = %request.uri().path(), "Admin route refused");
        return Err(AppError::Forbidden.to_api_error(&locale));
    }

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

// Handlers behind one of the guards take the session as an argument.
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
