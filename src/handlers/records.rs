// src/handlers/records.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::{
        mail::SendEmailResponse,
        pagination::Page,
        service_record::{RecordFilter, ServiceRecord},
    },
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EmailExportPayload {
    /// Ignored when the relay sends to a fixed address.
    #[schema(example = "contabilitate@firma.ro")]
    pub to: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/records",
    tag = "Records",
    params(RecordFilter),
    responses(
        (status = 200, description = "Lucrarile inregistrate", body = Page<ServiceRecord>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_records(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<RecordFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .record_service
        .list(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(page)))
}

#[utoipa::path(
    get,
    path = "/api/records/{id}",
    tag = "Records",
    params(("id" = Uuid, Path, description = "ID-ul lucrarii")),
    responses(
        (status = 200, description = "Lucrare", body = ServiceRecord),
        (status = 404, description = "Lucrare inexistenta")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_record(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = app_state
        .record_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(record)))
}

#[utoipa::path(
    get,
    path = "/api/records/export",
    tag = "Records",
    params(RecordFilter),
    responses(
        (status = 200, description = "Export CSV", content_type = "text/csv", body = String)
    ),
    security(("api_jwt" = []))
)]
pub async fn export_records(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<RecordFilter>,
) -> Result<Response, ApiError> {
    let csv = app_state
        .record_service
        .export_csv(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"lucrari-{}.csv\"", Utc::now().format("%Y%m%d")),
        ),
    ];

    Ok((headers, csv).into_response())
}

#[utoipa::path(
    post,
    path = "/api/records/export/email",
    tag = "Records",
    params(RecordFilter),
    request_body = EmailExportPayload,
    responses(
        (status = 200, description = "Export trimis", body = SendEmailResponse),
        (status = 502, description = "Trimiterea a esuat", body = SendEmailResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn email_records(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<RecordFilter>,
    Json(payload): Json<EmailExportPayload>,
) -> Result<impl IntoResponse, ApiError> {
    match app_state
        .record_service
        .email_export(&filter, payload.to.as_deref())
        .await
    {
        Ok(message_id) => Ok((StatusCode::OK, Json(SendEmailResponse::sent(message_id)))),
        Err(e) => {
            let api_error = e.to_api_error(&locale);
            if api_error.status.is_client_error() {
                return Err(api_error);
            }
            Ok((StatusCode::BAD_GATEWAY, Json(SendEmailResponse::failed(api_error.message))))
        }
    }
}
