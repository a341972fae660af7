#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentError, BookAppointmentRequest};
use appointment_cell::services::{NotificationSink, SchedulingEvent, SchedulingEventKind};
use appointment_cell::state::{InMemoryBackends, SchedulingState};
use doctor_cell::models::{AvailabilityWindow, Weekday};
use shared_config::SchedulingConfig;

// 2030-06-03 is a Monday.
pub const MONDAY: (i32, u32, u32) = (2030, 6, 3);
pub const TUESDAY: (i32, u32, u32) = (2030, 6, 4);

pub fn monday_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(MONDAY.0, MONDAY.1, MONDAY.2).unwrap()
}

pub fn tuesday_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(TUESDAY.0, TUESDAY.1, TUESDAY.2).unwrap()
}

pub fn monday(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(MONDAY.0, MONDAY.1, MONDAY.2, h, m, 0).unwrap()
}

pub fn tuesday(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(TUESDAY.0, TUESDAY.1, TUESDAY.2, h, m, 0).unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// A reference instant well before every fixture date.
pub fn long_ago() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

// ==============================================================================
// NOTIFICATION SINKS
// ==============================================================================

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SchedulingEvent>>,
}

impl RecordingSink {
    pub async fn events(&self) -> Vec<SchedulingEvent> {
        self.events.lock().await.clone()
    }

    pub async fn kinds(&self) -> Vec<SchedulingEventKind> {
        self.events.lock().await.iter().map(|event| event.kind).collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn emit(&self, event: &SchedulingEvent) -> Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn emit(&self, _event: &SchedulingEvent) -> Result<()> {
        Err(anyhow!("notification service unreachable"))
    }
}

pub struct StalledSink;

#[async_trait]
impl NotificationSink for StalledSink {
    async fn emit(&self, _event: &SchedulingEvent) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

// ==============================================================================
// CLINIC FIXTURE
// ==============================================================================

/// One registered doctor with a Monday 09:00-13:00 window and one patient.
pub struct Clinic {
    pub state: Arc<SchedulingState>,
    pub backends: InMemoryBackends,
    pub events: Arc<RecordingSink>,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
}

impl Clinic {
    pub async fn new() -> Self {
        let events = Arc::new(RecordingSink::default());
        Self::build(events.clone(), events, SchedulingConfig::default()).await
    }

    pub async fn with_notifier(notifier: Arc<dyn NotificationSink>, config: SchedulingConfig) -> Self {
        Self::build(notifier, Arc::new(RecordingSink::default()), config).await
    }

    async fn build(
        notifier: Arc<dyn NotificationSink>,
        events: Arc<RecordingSink>,
        config: SchedulingConfig,
    ) -> Self {
        let (state, backends) = SchedulingState::in_memory(config, notifier);

        let doctor_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();
        backends.directory.register_doctor(doctor_id).await;
        backends.directory.register_patient(patient_id).await;
        backends
            .availability
            .publish(AvailabilityWindow::new(doctor_id, Weekday::Mon, hm(9, 0), hm(13, 0)).unwrap())
            .await;

        Self {
            state: Arc::new(state),
            backends,
            events,
            doctor_id,
            patient_id,
        }
    }

    pub async fn add_doctor(&self, windows: &[(Weekday, NaiveTime, NaiveTime)]) -> Uuid {
        let doctor_id = Uuid::new_v4();
        self.backends.directory.register_doctor(doctor_id).await;
        for &(weekday, start, end) in windows {
            self.backends
                .availability
                .publish(AvailabilityWindow::new(doctor_id, weekday, start, end).unwrap())
                .await;
        }
        doctor_id
    }

    pub fn request(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> BookAppointmentRequest {
        self.request_for(self.doctor_id, start, end)
    }

    pub fn request_for(&self, doctor_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_id: self.patient_id,
            doctor_id,
            start_time: start,
            end_time: end,
            reason: Some("Routine checkup".to_string()),
        }
    }

    pub async fn book(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Appointment, AppointmentError> {
        self.state.booking.book_appointment(self.request(start, end)).await
    }
}

/// No two SCHEDULED appointments of the doctor overlap.
pub fn assert_no_double_booking(appointments: &[Appointment]) {
    let scheduled: Vec<&Appointment> = appointments.iter().filter(|apt| apt.is_scheduled()).collect();
    for (i, a) in scheduled.iter().enumerate() {
        for b in &scheduled[i + 1..] {
            assert!(
                a.doctor_id != b.doctor_id || !a.overlaps(b.start_time, b.end_time),
                "double booking: {} and {}",
                a.id,
                b.id
            );
        }
    }
}
