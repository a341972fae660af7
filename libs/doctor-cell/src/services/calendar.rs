use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{AvailabilityCheck, AvailabilityError, AvailabilityWindow, WeeklySchedule, Weekday};
use crate::services::store::AvailabilityStore;

/// Answers "is this doctor open then?" from published weekly windows.
pub struct AvailabilityCalendar {
    store: Arc<dyn AvailabilityStore>,
}

impl AvailabilityCalendar {
    pub fn new(store: Arc<dyn AvailabilityStore>) -> Self {
        Self { store }
    }

    /// Active windows for one weekday, sorted by start. Empty when the
    /// doctor published nothing for that day.
    pub async fn windows_for(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        let mut windows: Vec<AvailabilityWindow> = self
            .store
            .active_windows(doctor_id, weekday)
            .await?
            .into_iter()
            .filter(|w| w.is_active && w.doctor_id == doctor_id && w.weekday == weekday)
            .collect();
        windows.sort_by_key(|w| (w.window_start, w.window_end));

        debug!("Doctor {} has {} active windows on {}", doctor_id, windows.len(), weekday);
        Ok(windows)
    }

    /// All active windows of a doctor, loaded in one round trip.
    pub async fn weekly_schedule(&self, doctor_id: Uuid) -> Result<WeeklySchedule, AvailabilityError> {
        let windows = self.store.active_windows_for_doctor(doctor_id).await?;
        Ok(WeeklySchedule::from_windows(
            windows.into_iter().filter(|w| w.doctor_id == doctor_id),
        ))
    }

    /// Availability gate used by booking and rescheduling.
    pub async fn check(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AvailabilityCheck, AvailabilityError> {
        let weekday = Weekday::from(start.weekday());
        let windows = self.windows_for(doctor_id, weekday).await?;
        let permitted = fits_windows(&windows, start, end);

        Ok(AvailabilityCheck {
            doctor_id,
            start_time: start,
            end_time: end,
            weekday,
            windows_considered: windows.len(),
            permitted,
        })
    }

    pub async fn permits(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, AvailabilityError> {
        Ok(self.check(doctor_id, start, end).await?.permitted)
    }
}

/// No windows on the day means the day is unconstrained. Otherwise the
/// interval must sit inside at least one window. An interval that runs
/// past midnight can never sit inside a single-day window.
pub fn fits_windows(windows: &[AvailabilityWindow], start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    if windows.is_empty() {
        return true;
    }
    if start.date_naive() != end.date_naive() {
        return false;
    }

    let (start_t, end_t) = (start.time(), end.time());
    windows.iter().any(|w| w.contains(start_t, end_t))
}
