use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

// ==============================================================================
// WEEKDAY CODES
// ==============================================================================

/// Day of the recurring week, independent of any calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Mon,
            chrono::Weekday::Tue => Weekday::Tue,
            chrono::Weekday::Wed => Weekday::Wed,
            chrono::Weekday::Thu => Weekday::Thu,
            chrono::Weekday::Fri => Weekday::Fri,
            chrono::Weekday::Sat => Weekday::Sat,
            chrono::Weekday::Sun => Weekday::Sun,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Weekday {
    type Err = AvailabilityError;

    /// Accepts three-letter codes and full English names, any case.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mon" | "monday" => Ok(Weekday::Mon),
            "tue" | "tues" | "tuesday" => Ok(Weekday::Tue),
            "wed" | "wednesday" => Ok(Weekday::Wed),
            "thu" | "thur" | "thurs" | "thursday" => Ok(Weekday::Thu),
            "fri" | "friday" => Ok(Weekday::Fri),
            "sat" | "saturday" => Ok(Weekday::Sat),
            "sun" | "sunday" => Ok(Weekday::Sun),
            _ => Err(AvailabilityError::InvalidWindow(format!("Unknown weekday: {}", raw))),
        }
    }
}

impl Serialize for Weekday {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Weekday {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// AVAILABILITY WINDOWS
// ==============================================================================

/// One recurring weekly open interval for a doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub weekday: Weekday,
    #[serde(rename = "start_time")]
    pub window_start: NaiveTime,
    #[serde(rename = "end_time")]
    pub window_end: NaiveTime,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl AvailabilityWindow {
    pub fn new(
        doctor_id: Uuid,
        weekday: Weekday,
        window_start: NaiveTime,
        window_end: NaiveTime,
    ) -> Result<Self, AvailabilityError> {
        if window_end <= window_start {
            return Err(AvailabilityError::InvalidWindow(
                "window_end must be after window_start".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            doctor_id,
            weekday,
            window_start,
            window_end,
            is_active: true,
        })
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Whether `[start, end]` as times of day sits inside this window.
    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.window_start <= start && self.window_end >= end
    }
}

/// A doctor's active windows grouped by weekday, each group sorted by start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: BTreeMap<Weekday, Vec<AvailabilityWindow>>,
}

impl WeeklySchedule {
    pub fn from_windows(windows: impl IntoIterator<Item = AvailabilityWindow>) -> Self {
        let mut days: BTreeMap<Weekday, Vec<AvailabilityWindow>> = BTreeMap::new();

        for window in windows.into_iter().filter(|w| w.is_active) {
            days.entry(window.weekday).or_default().push(window);
        }
        for windows in days.values_mut() {
            windows.sort_by_key(|w| (w.window_start, w.window_end));
        }

        Self { days }
    }

    pub fn windows_on(&self, weekday: Weekday) -> &[AvailabilityWindow] {
        self.days.get(&weekday).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Result of an availability check, kept for logging and API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityCheck {
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub weekday: Weekday,
    pub windows_considered: usize,
    pub permitted: bool,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Invalid availability window: {0}")]
    InvalidWindow(String),

    #[error("Availability storage error: {0}")]
    Storage(String),
}
