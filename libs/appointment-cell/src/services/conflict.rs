use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, ConflictCheckResponse};
use crate::services::store::AppointmentStore;

pub struct ConflictDetectionService {
    store: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Whether `[start, end)` overlaps any SCHEDULED appointment of the doctor.
    pub async fn has_conflict(
        &self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<bool, AppointmentError> {
        Ok(self.check_conflicts(doctor_id, start_time, end_time, None).await?.has_conflict)
    }

    /// Same as `has_conflict`, ignoring one appointment. Used when an
    /// appointment is moved so it never collides with its own prior slot.
    pub async fn has_conflict_excluding(
        &self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_appointment_id: Uuid,
    ) -> Result<bool, AppointmentError> {
        Ok(self
            .check_conflicts(doctor_id, start_time, end_time, Some(exclude_appointment_id))
            .await?
            .has_conflict)
    }

    /// Check for appointment conflicts for a doctor at a specific time
    pub async fn check_conflicts(
        &self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        if end_time <= start_time {
            return Err(AppointmentError::Validation("end_time must be after start_time".to_string()));
        }

        debug!("Checking conflicts for doctor {} from {} to {}",
               doctor_id, start_time, end_time);

        let existing = self.list_scheduled_between(doctor_id, start_time, end_time).await?;
        let conflicting_appointments: Vec<Appointment> =
            find_conflicts(&existing, start_time, end_time, exclude_appointment_id)
                .cloned()
                .collect();

        let has_conflict = !conflicting_appointments.is_empty();
        if has_conflict {
            warn!("Conflict detected for doctor {} - {} conflicting appointments",
                  doctor_id, conflicting_appointments.len());
        }

        Ok(ConflictCheckResponse {
            has_conflict,
            conflicting_appointments,
        })
    }

    /// Bulk preload of busy intervals, so callers do not query per candidate.
    pub async fn list_scheduled_between(
        &self,
        doctor_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.store.scheduled_between(doctor_id, range_start, range_end).await?;

        // Store filters are trusted only as a prefilter.
        Ok(appointments
            .into_iter()
            .filter(|apt| apt.doctor_id == doctor_id && apt.is_scheduled())
            .collect())
    }
}

/// SCHEDULED appointments in `existing` overlapping `[start, end)`.
pub fn find_conflicts<'a>(
    existing: &'a [Appointment],
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    exclude_appointment_id: Option<Uuid>,
) -> impl Iterator<Item = &'a Appointment> + 'a {
    existing.iter().filter(move |apt| {
        Some(apt.id) != exclude_appointment_id
            && apt.is_scheduled()
            && apt.overlaps(start_time, end_time)
    })
}
