// src/handlers/solutions.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::{
        pagination::{ListQuery, Page},
        solution::{Solution, SolutionPayload},
    },
};

#[utoipa::path(
    get,
    path = "/api/solutions",
    tag = "Solutions",
    params(ListQuery),
    responses(
        (status = 200, description = "Lista solutiilor", body = Page<Solution>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_solutions(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .solution_service
        .list(&query)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(page)))
}

#[utoipa::path(
    post,
    path = "/api/solutions",
    tag = "Solutions",
    request_body = SolutionPayload,
    responses(
        (status = 201, description = "Solutie creata", body = Solution),
        (status = 400, description = "Stocuri inconsistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_solution(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<SolutionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let solution = app_state
        .solution_service
        .create(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(solution)))
}

#[utoipa::path(
    get,
    path = "/api/solutions/{id}",
    tag = "Solutions",
    params(("id" = Uuid, Path, description = "ID-ul solutiei")),
    responses(
        (status = 200, description = "Solutie", body = Solution),
        (status = 404, description = "Solutie inexistenta")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_solution(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let solution = app_state
        .solution_service
        .get(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(solution)))
}

#[utoipa::path(
    put,
    path = "/api/solutions/{id}",
    tag = "Solutions",
    request_body = SolutionPayload,
    params(("id" = Uuid, Path, description = "ID-ul solutiei")),
    responses(
        (status = 200, description = "Solutie actualizata", body = Solution),
        (status = 404, description = "Solutie inexistenta")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_solution(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<SolutionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let solution = app_state
        .solution_service
        .update(&app_state.db_pool, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(solution)))
}

#[utoipa::path(
    delete,
    path = "/api/solutions/{id}",
    tag = "Solutions",
    params(("id" = Uuid, Path, description = "ID-ul solutiei")),
    responses(
        (status = 204, description = "Solutie stearsa"),
        (status = 404, description = "Solutie inexistenta")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_solution(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .solution_service
        .delete(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
