// src/handlers/workflows.rs

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
        auth::SessionContext,
        customer::Customer,
        employee::Employee,
        pagination::{ListQuery, Page},
        solution::Solution,
    },
    services::{
        submission_service::SubmissionReceipt,
        workflow_service::{WorkflowPatchPayload, WorkflowView},
    },
};

#[utoipa::path(
    post,
    path = "/api/workflows",
    tag = "Workflows",
    responses(
        (status = 201, description = "Flux nou, la pasul de selectare a angajatului", body = WorkflowView)
    ),
    security(("api_jwt" = []))
)]
pub async fn start_workflow(
    State(app_state): State<AppState>,
    session: SessionContext,
) -> impl IntoResponse {
    let view = app_state.workflow_service.start(&session).await;
    (StatusCode::CREATED, Json(view))
}

#[utoipa::path(
    get,
    path = "/api/workflows/{id}",
    tag = "Workflows",
    params(("id" = Uuid, Path, description = "ID-ul fluxului")),
    responses(
        (status = 200, description = "Starea fluxului", body = WorkflowView),
        (status = 404, description = "Flux inexistent")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .workflow_service
        .get(&session, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(view)))
}

#[utoipa::path(
    patch,
    path = "/api/workflows/{id}",
    tag = "Workflows",
    request_body = WorkflowPatchPayload,
    params(("id" = Uuid, Path, description = "ID-ul fluxului")),
    responses(
        (status = 200, description = "Ciorna actualizata", body = WorkflowView),
        (status = 400, description = "Ciorna invalida"),
        (status = 404, description = "Flux, client, angajat sau solutie inexistenta")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<WorkflowPatchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .workflow_service
        .update(&session, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(view)))
}

#[utoipa::path(
    delete,
    path = "/api/workflows/{id}",
    tag = "Workflows",
    params(("id" = Uuid, Path, description = "ID-ul fluxului")),
    responses(
        (status = 204, description = "Flux abandonat"),
        (status = 404, description = "Flux inexistent")
    ),
    security(("api_jwt" = []))
)]
pub async fn discard_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .workflow_service
        .discard(&session, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/workflows/{id}/next",
    tag = "Workflows",
    params(("id" = Uuid, Path, description = "ID-ul fluxului")),
    responses(
        (status = 200, description = "Pasul urmator", body = WorkflowView),
        (status = 400, description = "Pasul curent nu este complet"),
        (status = 409, description = "Tranzitie invalida")
    ),
    security(("api_jwt" = []))
)]
pub async fn next_step(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .workflow_service
        .next(&session, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(view)))
}

#[utoipa::path(
    post,
    path = "/api/workflows/{id}/back",
    tag = "Workflows",
    params(("id" = Uuid, Path, description = "ID-ul fluxului")),
    responses(
        (status = 200, description = "Pasul anterior", body = WorkflowView),
        (status = 409, description = "Tranzitie invalida")
    ),
    security(("api_jwt" = []))
)]
pub async fn previous_step(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .workflow_service
        .back(&session, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(view)))
}

#[utoipa::path(
    post,
    path = "/api/workflows/{id}/finish",
    tag = "Workflows",
    params(("id" = Uuid, Path, description = "ID-ul fluxului")),
    responses(
        (status = 201, description = "Proces verbal trimis si lucrare inregistrata", body = SubmissionReceipt),
        (status = 400, description = "Ciorna incompleta"),
        (status = 409, description = "Stoc insuficient sau flux deja trimis"),
        (status = 502, description = "Trimiterea a esuat")
    ),
    security(("api_jwt" = []))
)]
pub async fn finish_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = app_state
        .workflow_service
        .finish(&session, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tracing::info!(workflow = %id, record = %receipt.record_id, number = receipt.display_number, "Workflow finished");
    Ok((StatusCode::CREATED, Json(receipt)))
}

// --- Catalog lookups for the selection steps ---

#[utoipa::path(
    get,
    path = "/api/workflows/catalog/employees",
    tag = "Workflows",
    params(ListQuery),
    responses((status = 200, description = "Angajati", body = Page<Employee>)),
    security(("api_jwt" = []))
)]
pub async fn catalog_employees(
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
    get,
    path = "/api/workflows/catalog/customers",
    tag = "Workflows",
    params(ListQuery),
    responses((status = 200, description = "Clienti", body = Page<Customer>)),
    security(("api_jwt" = []))
)]
pub async fn catalog_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .customer_service
        .list(&query)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(page)))
}

#[utoipa::path(
    get,
    path = "/api/workflows/catalog/solutions",
    tag = "Workflows",
    params(ListQuery),
    responses((status = 200, description = "Solutii", body = Page<Solution>)),
    security(("api_jwt" = []))
)]
pub async fn catalog_solutions(
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
