// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::debug;

use shared_config::SchedulingConfig;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Outcome of applying a transition to an appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Changed(Appointment),
    /// Nothing to persist and nothing to announce.
    Unchanged(Appointment),
}

impl Transition {
    pub fn into_inner(self) -> Appointment {
        match self {
            Transition::Changed(apt) | Transition::Unchanged(apt) => apt,
        }
    }
}

/// Appointment state machine. Pure: no storage, no clock.
///
/// Every status may move to every other status through an explicit status
/// update, and rescheduling always lands in `SCHEDULED`. Cancelling an
/// already cancelled appointment changes nothing.
pub struct AppointmentLifecycleService {
    max_text_length: usize,
}

impl AppointmentLifecycleService {
    pub fn new(config: &SchedulingConfig) -> Self {
        Self {
            max_text_length: config.max_text_length,
        }
    }

    pub fn validate_interval(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if end_time <= start_time {
            return Err(AppointmentError::Validation("end_time must be after start_time".to_string()));
        }
        Ok(())
    }

    pub fn validate_text(&self, field: &str, value: Option<&str>) -> Result<(), AppointmentError> {
        match value {
            Some(text) if text.chars().count() > self.max_text_length => Err(AppointmentError::Validation(
                format!("{} must be at most {} characters", field, self.max_text_length),
            )),
            _ => Ok(()),
        }
    }

    pub fn cancel(
        &self,
        mut appointment: Appointment,
        cancellation_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Transition {
        if appointment.status == AppointmentStatus::Cancelled {
            debug!("Appointment {} already cancelled", appointment.id);
            return Transition::Unchanged(appointment);
        }

        appointment.status = AppointmentStatus::Cancelled;
        // A missing reason keeps whatever was recorded before.
        if cancellation_reason.is_some() {
            appointment.cancellation_reason = cancellation_reason;
        }
        appointment.updated_at = now;
        Transition::Changed(appointment)
    }

    pub fn set_status(
        &self,
        mut appointment: Appointment,
        new_status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Appointment {
        debug!("Status transition {} -> {} for appointment {}",
               appointment.status, new_status, appointment.id);

        appointment.status = new_status;
        appointment.updated_at = now;
        appointment
    }

    pub fn reschedule(
        &self,
        mut appointment: Appointment,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Appointment {
        appointment.start_time = start_time;
        appointment.end_time = end_time;
        appointment.status = AppointmentStatus::Scheduled;
        appointment.updated_at = now;
        appointment
    }
}
