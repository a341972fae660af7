pub mod calendar;
pub mod store;

pub use calendar::{fits_windows, AvailabilityCalendar};
pub use store::{AvailabilityStore, InMemoryAvailabilityStore, SupabaseAvailabilityStore};
