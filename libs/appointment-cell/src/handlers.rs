// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AppointmentError, BookAppointmentRequest, CancelAppointmentRequest, ConflictCheckQuery, ListQuery, Page,
    RescheduleAppointmentRequest, SlotQuery, UpdateStatusRequest,
};
use crate::state::SchedulingState;

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::NotFound(msg) => AppError::NotFound(msg),
            AppointmentError::Conflict(msg) => AppError::Conflict(msg),
            AppointmentError::Storage(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.book_appointment(request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_appointment(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .cancel_appointment(appointment_id, request.cancellation_reason)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let status = request
        .status
        .ok_or_else(|| AppError::BadRequest("status is required".to_string()))?;

    let appointment = state.booking.update_status(appointment_id, &status).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment status updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let (Some(start_time), Some(end_time)) = (request.start_time, request.end_time) else {
        return Err(AppError::BadRequest("start_time and end_time are required".to_string()));
    };

    let appointment = state
        .booking
        .reschedule_appointment(appointment_id, start_time, end_time)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

// ==============================================================================
// LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<SchedulingState>>,
    Path(patient_id): Path<Uuid>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let page = Page::from(params);
    let appointments = state.booking.list_patient_appointments(patient_id, page).await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "appointments": appointments,
        "total": appointments.len(),
        "skip": page.skip,
        "limit": page.limit
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let page = Page::from(params);
    let appointments = state.booking.list_doctor_appointments(doctor_id, page).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "appointments": appointments,
        "total": appointments.len(),
        "skip": page.skip,
        "limit": page.limit
    })))
}

// ==============================================================================
// CONFLICT AND SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<SchedulingState>>,
    Query(params): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let conflict_response = state
        .booking
        .check_conflicts(
            params.doctor_id,
            params.start_time,
            params.end_time,
            params.exclude_appointment_id,
        )
        .await?;

    Ok(Json(json!(conflict_response)))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    Query(params): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let days = params.days.unwrap_or(state.config.default_slot_days);
    let slot_minutes = params.slot_minutes.unwrap_or(state.config.default_slot_minutes);

    let schedule = state
        .slots
        .generate_slots(doctor_id, params.start_date, days, slot_minutes, Utc::now())
        .await?;
    let slots = schedule.to_vec();

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "slots": slots,
        "total": slots.len()
    })))
}
