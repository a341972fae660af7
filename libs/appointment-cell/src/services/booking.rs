// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::services::AvailabilityCalendar;
use shared_config::SchedulingConfig;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, ConflictCheckResponse, Page,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::directory::ParticipantDirectory;
use crate::services::lifecycle::{AppointmentLifecycleService, Transition};
use crate::services::locks::DoctorLockRegistry;
use crate::services::notifications::{NotificationSink, SchedulingEvent, SchedulingEventKind};
use crate::services::store::AppointmentStore;

/// Owns every appointment state change.
///
/// Book, cancel, status update and reschedule each run their checks and
/// their write while holding the doctor's lock from `DoctorLockRegistry`,
/// so two requests for the same doctor can never both pass the conflict
/// check. The store's own exclusion constraint backs this up. Notifications
/// go out after the lock is released and cannot fail the operation.
pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    directory: Arc<dyn ParticipantDirectory>,
    calendar: Arc<AvailabilityCalendar>,
    conflict_service: Arc<ConflictDetectionService>,
    lifecycle_service: AppointmentLifecycleService,
    notifier: Arc<dyn NotificationSink>,
    locks: DoctorLockRegistry,
    notification_timeout: Duration,
}

impl AppointmentBookingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        directory: Arc<dyn ParticipantDirectory>,
        calendar: Arc<AvailabilityCalendar>,
        notifier: Arc<dyn NotificationSink>,
        config: &SchedulingConfig,
    ) -> Self {
        let conflict_service = Arc::new(ConflictDetectionService::new(Arc::clone(&store)));

        Self {
            store,
            directory,
            calendar,
            conflict_service,
            lifecycle_service: AppointmentLifecycleService::new(config),
            notifier,
            locks: DoctorLockRegistry::new(),
            notification_timeout: Duration::from_millis(config.notification_timeout_ms),
        }
    }

    pub fn conflict_service(&self) -> Arc<ConflictDetectionService> {
        Arc::clone(&self.conflict_service)
    }

    pub fn calendar(&self) -> Arc<AvailabilityCalendar> {
        Arc::clone(&self.calendar)
    }

    /// Book a new appointment
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, patient_id = %request.patient_id))]
    pub async fn book_appointment(&self, request: BookAppointmentRequest) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment from {} to {}", request.start_time, request.end_time);

        self.lifecycle_service.validate_interval(request.start_time, request.end_time)?;
        self.lifecycle_service.validate_text("reason", request.reason.as_deref())?;

        self.directory.resolve_doctor(request.doctor_id).await?;
        self.directory.resolve_patient(request.patient_id).await?;

        let appointment = {
            let _guard = self.locks.acquire(request.doctor_id).await;

            self.ensure_within_availability(request.doctor_id, request.start_time, request.end_time).await?;
            self.ensure_no_conflict(request.doctor_id, request.start_time, request.end_time, None).await?;

            let appointment = Appointment::new(
                request.patient_id,
                request.doctor_id,
                request.start_time,
                request.end_time,
                request.reason,
            );
            self.store.insert(appointment).await?
        };

        info!("Appointment {} booked successfully", appointment.id);
        self.notify(SchedulingEventKind::Booked, &appointment).await;
        Ok(appointment)
    }

    /// Cancel an appointment. Cancelling twice returns the stored appointment
    /// untouched and announces nothing.
    #[instrument(skip(self, cancellation_reason))]
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        cancellation_reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        self.lifecycle_service
            .validate_text("cancellation_reason", cancellation_reason.as_deref())?;

        let doctor_id = self.get_appointment(appointment_id).await?.doctor_id;

        let transition = {
            let _guard = self.locks.acquire(doctor_id).await;
            let current = self.get_appointment(appointment_id).await?;

            match self.lifecycle_service.cancel(current, cancellation_reason, Utc::now()) {
                Transition::Changed(cancelled) => Transition::Changed(self.store.update(cancelled).await?),
                unchanged => unchanged,
            }
        };

        match transition {
            Transition::Changed(cancelled) => {
                info!("Appointment {} cancelled successfully", appointment_id);
                self.notify(SchedulingEventKind::Cancelled, &cancelled).await;
                Ok(cancelled)
            }
            Transition::Unchanged(current) => Ok(current),
        }
    }

    /// Set the status to any of the three valid values, whatever the
    /// current status is. Reviving an appointment into `SCHEDULED` is still
    /// refused when its interval is now taken by another booking.
    #[instrument(skip(self))]
    pub async fn update_status(&self, appointment_id: Uuid, status: &str) -> Result<Appointment, AppointmentError> {
        let new_status: AppointmentStatus = status.parse()?;
        debug!("Updating status of appointment {} to {}", appointment_id, new_status);

        let doctor_id = self.get_appointment(appointment_id).await?.doctor_id;

        let updated = {
            let _guard = self.locks.acquire(doctor_id).await;
            let current = self.get_appointment(appointment_id).await?;

            if new_status == AppointmentStatus::Scheduled && !current.is_scheduled() {
                self.ensure_no_conflict(doctor_id, current.start_time, current.end_time, Some(current.id))
                    .await?;
            }

            let updated = self.lifecycle_service.set_status(current, new_status, Utc::now());
            self.store.update(updated).await?
        };

        info!("Appointment {} status set to {}", appointment_id, updated.status);
        self.notify(SchedulingEventKind::StatusChanged, &updated).await;
        Ok(updated)
    }

    /// Move an appointment to a new interval. The status always ends up
    /// `SCHEDULED`, whatever it was before.
    #[instrument(skip(self))]
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Rescheduling appointment: {}", appointment_id);

        let doctor_id = self.get_appointment(appointment_id).await?.doctor_id;
        self.lifecycle_service.validate_interval(start_time, end_time)?;

        let rescheduled = {
            let _guard = self.locks.acquire(doctor_id).await;
            let current = self.get_appointment(appointment_id).await?;

            self.ensure_within_availability(doctor_id, start_time, end_time).await?;
            // The row keeps its old interval until the update lands; it is
            // excluded here instead of being removed first.
            self.ensure_no_conflict(doctor_id, start_time, end_time, Some(current.id)).await?;

            let rescheduled = self.lifecycle_service.reschedule(current, start_time, end_time, Utc::now());
            self.store.update(rescheduled).await?
        };

        info!("Appointment {} rescheduled to {} - {}", appointment_id, start_time, end_time);
        self.notify(SchedulingEventKind::Rescheduled, &rescheduled).await;
        Ok(rescheduled)
    }

    /// Get appointment by ID
    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get(appointment_id)
            .await?
            .ok_or_else(AppointmentError::appointment_not_found)
    }

    pub async fn list_patient_appointments(
        &self,
        patient_id: Uuid,
        page: Page,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_for_patient(patient_id, page).await
    }

    pub async fn list_doctor_appointments(
        &self,
        doctor_id: Uuid,
        page: Page,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_for_doctor(doctor_id, page).await
    }

    pub async fn check_conflicts(
        &self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        self.conflict_service
            .check_conflicts(doctor_id, start_time, end_time, exclude_appointment_id)
            .await
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn ensure_within_availability(
        &self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        let check = self.calendar.check(doctor_id, start_time, end_time).await?;
        if !check.permitted {
            warn!("Requested {} - {} is outside the {} availability of doctor {}",
                  start_time, end_time, check.weekday, doctor_id);
            return Err(AppointmentError::outside_availability());
        }
        Ok(())
    }

    async fn ensure_no_conflict(
        &self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let has_conflict = match exclude_appointment_id {
            Some(own_id) => {
                self.conflict_service
                    .has_conflict_excluding(doctor_id, start_time, end_time, own_id)
                    .await?
            }
            None => self.conflict_service.has_conflict(doctor_id, start_time, end_time).await?,
        };

        if has_conflict {
            return Err(AppointmentError::doctor_unavailable());
        }
        Ok(())
    }

    async fn notify(&self, kind: SchedulingEventKind, appointment: &Appointment) {
        let event = SchedulingEvent::for_appointment(kind, appointment);

        match tokio::time::timeout(self.notification_timeout, self.notifier.emit(&event)).await {
            Ok(Ok(())) => debug!("Sent {} notification for appointment {}", kind.as_str(), appointment.id),
            Ok(Err(e)) => warn!("Failed to send {} notification for appointment {}: {}",
                                kind.as_str(), appointment.id, e),
            Err(_) => warn!("{} notification for appointment {} timed out", kind.as_str(), appointment.id),
        }
    }
}
