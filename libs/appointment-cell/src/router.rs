// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::services::AppointmentService;

pub fn appointment_routes(service: Arc<AppointmentService>) -> Router {
    Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::schedule_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/practitioners/{practitioner_id}", get(handlers::list_practitioner_appointments))
        .with_state(service)
}
