// src/handlers/employees.rs

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
        employee::{Employee, EmployeePayload},
        pagination::{ListQuery, Page},
    },
};

#[utoipa::path(
    get,
    path = "/api/employees",
    tag = "Employees",
    params(ListQuery),
    responses(
        (status = 200, description = "Lista angajatilor", body = Page<Employee>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_employees(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .employee_service
        .list(&query)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(page)))
}

#[utoipa::path(
    post,
    path = "/api/employees",
    tag = "Employees",
    request_body = EmployeePayload,
    responses(
        (status = 201, description = "Angajat creat", body = Employee),
        (status = 400, description = "Date invalide")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_employee(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<EmployeePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let employee = app_state
        .employee_service
        .create(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(employee)))
}

#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    tag = "Employees",
    params(("id" = Uuid, Path, description = "ID-ul angajatului")),
    responses(
        (status = 200, description = "Angajat", body = Employee),
        (status = 404, description = "Angajat inexistent")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_employee(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let employee = app_state
        .employee_service
        .get(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(employee)))
}

#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    tag = "Employees",
    request_body = EmployeePayload,
    params(("id" = Uuid, Path, description = "ID-ul angajatului")),
    responses(
        (status = 200, description = "Angajat actualizat", body = Employee),
        (status = 404, description = "Angajat inexistent")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_employee(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<EmployeePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let employee = app_state
        .employee_service
        .update(&app_state.db_pool, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(employee)))
}

#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    tag = "Employees",
    params(("id" = Uuid, Path, description = "ID-ul angajatului")),
    responses(
        (status = 204, description = "Angajat sters"),
        (status = 404, description = "Angajat inexistent")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_employee(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .employee_service
        .delete(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
