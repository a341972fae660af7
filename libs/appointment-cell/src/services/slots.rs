// libs/appointment-cell/src/services/slots.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, Utc};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::{WeeklySchedule, Weekday};
use doctor_cell::services::AvailabilityCalendar;
use shared_config::SchedulingConfig;

use crate::models::{intervals_overlap, AppointmentError, Slot};
use crate::services::conflict::ConflictDetectionService;

/// Read-only composition of the calendar and the conflict detector.
/// Takes no locks; a listed slot must still be re-validated at booking.
pub struct SlotGenerator {
    calendar: Arc<AvailabilityCalendar>,
    conflicts: Arc<ConflictDetectionService>,
    config: SchedulingConfig,
}

impl SlotGenerator {
    pub fn new(
        calendar: Arc<AvailabilityCalendar>,
        conflicts: Arc<ConflictDetectionService>,
        config: SchedulingConfig,
    ) -> Self {
        Self { calendar, conflicts, config }
    }

    /// Loads windows and busy intervals once and returns a restartable
    /// schedule. Slots ending at or before `now` are never offered.
    pub async fn generate_slots(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        days: u32,
        slot_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<SlotSchedule, AppointmentError> {
        if days < 1 {
            return Err(AppointmentError::Validation("days must be at least 1".to_string()));
        }
        if days > self.config.max_slot_days {
            return Err(AppointmentError::Validation(format!(
                "days must be at most {}",
                self.config.max_slot_days
            )));
        }
        if slot_minutes < self.config.min_slot_minutes {
            return Err(AppointmentError::Validation(format!(
                "slot_minutes must be at least {}",
                self.config.min_slot_minutes
            )));
        }
        if slot_minutes > self.config.max_slot_minutes {
            return Err(AppointmentError::Validation(format!(
                "slot_minutes must be at most {}",
                self.config.max_slot_minutes
            )));
        }

        let range_start = start_of(start_date);
        let range_end = start_date
            .checked_add_days(Days::new(u64::from(days)))
            .map(start_of)
            .ok_or_else(|| AppointmentError::Validation("Date range out of bounds".to_string()))?;

        debug!("Generating {}-minute slots for doctor {} from {} to {}",
               slot_minutes, doctor_id, range_start, range_end);

        let schedule = self.calendar.weekly_schedule(doctor_id).await?;

        // A doctor with no published hours has nothing to offer.
        let busy = if schedule.is_empty() {
            Vec::new()
        } else {
            self.conflicts
                .list_scheduled_between(doctor_id, range_start, range_end)
                .await?
                .into_iter()
                .map(|apt| (apt.start_time, apt.end_time))
                .collect()
        };

        Ok(SlotSchedule {
            start_date,
            days,
            slot_length: Duration::minutes(i64::from(slot_minutes)),
            now,
            schedule,
            busy,
        })
    }
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Open slots over a date range, computed lazily one day at a time.
/// Iterating twice yields the same slots.
#[derive(Debug, Clone)]
pub struct SlotSchedule {
    start_date: NaiveDate,
    days: u32,
    slot_length: Duration,
    now: DateTime<Utc>,
    schedule: WeeklySchedule,
    busy: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

impl SlotSchedule {
    pub fn iter(&self) -> impl Iterator<Item = Slot> + '_ {
        (0..self.days)
            .filter_map(move |offset| self.start_date.checked_add_days(Days::new(u64::from(offset))))
            .flat_map(move |date| self.slots_on(date))
    }

    pub fn to_vec(&self) -> Vec<Slot> {
        self.iter().collect()
    }

    fn slots_on(&self, date: NaiveDate) -> std::collections::btree_set::IntoIter<Slot> {
        let weekday = Weekday::from(date.weekday());
        // Set order is chronological and drops slots produced by two windows.
        let mut day = BTreeSet::new();

        for window in self.schedule.windows_on(weekday) {
            let window_end = date.and_time(window.window_end).and_utc();
            let mut start_time = date.and_time(window.window_start).and_utc();

            // Stops at the window end or at the edge of the representable range.
            while let Some(end_time) = start_time.checked_add_signed(self.slot_length) {
                if end_time > window_end {
                    break;
                }
                if end_time > self.now && !self.is_busy(start_time, end_time) {
                    day.insert(Slot { start_time, end_time });
                }
                start_time = end_time;
            }
        }

        day.into_iter()
    }

    fn is_busy(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.busy
            .iter()
            .any(|&(busy_start, busy_end)| intervals_overlap(busy_start, busy_end, start, end))
    }
}

impl<'a> IntoIterator for &'a SlotSchedule {
    type Item = Slot;
    type IntoIter = Box<dyn Iterator<Item = Slot> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
