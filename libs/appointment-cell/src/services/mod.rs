pub mod booking;
pub mod conflict;
pub mod directory;
pub mod lifecycle;
pub mod locks;
pub mod notifications;
pub mod slots;
pub mod store;

pub use booking::AppointmentBookingService;
pub use conflict::{find_conflicts, ConflictDetectionService};
pub use directory::{InMemoryDirectory, Participant, ParticipantDirectory, ParticipantRole, SupabaseDirectory};
pub use lifecycle::{AppointmentLifecycleService, Transition};
pub use locks::DoctorLockRegistry;
pub use notifications::{
    NotificationSink, SchedulingEvent, SchedulingEventKind, SupabaseNotificationSink, TracingNotificationSink,
};
pub use slots::{SlotGenerator, SlotSchedule};
pub use store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
