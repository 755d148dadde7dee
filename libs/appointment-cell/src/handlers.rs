// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_models::pagination::{PageQuery, PageRequest};

use crate::models::{AppointmentError, AppointmentId, PractitionerId, ScheduleAppointmentRequest};
use crate::services::AppointmentService;

fn to_app_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound(message) => AppError::NotFound(message),
        AppointmentError::ConflictDetected => AppError::Conflict(e.to_string()),
        AppointmentError::ReadOnlyTransaction => AppError::Internal(e.to_string()),
        AppointmentError::DatabaseError(message) => AppError::Database(message),
    }
}

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(service): State<Arc<AppointmentService>>,
    payload: Result<Json<ScheduleAppointmentRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload?;

    let appointment = service
        .schedule(request.patient_id, request.practitioner_id, request.scheduled_at)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(service): State<Arc<AppointmentService>>,
    Path(appointment_id): Path<AppointmentId>,
) -> Result<Json<Value>, AppError> {
    service.cancel(appointment_id).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment_id": appointment_id,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(service): State<Arc<AppointmentService>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let page = service
        .list(PageRequest::from(query))
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn list_practitioner_appointments(
    State(service): State<Arc<AppointmentService>>,
    Path(practitioner_id): Path<PractitionerId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let page = service
        .list_by_practitioner(practitioner_id, PageRequest::from(query))
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(page)))
}
