// libs/appointment-cell/src/state.rs
use std::sync::Arc;

use tracing::{info, warn};

use doctor_cell::services::{AvailabilityCalendar, AvailabilityStore, InMemoryAvailabilityStore, SupabaseAvailabilityStore};
use shared_config::{AppConfig, SchedulingConfig};
use shared_database::SupabaseClient;

use crate::services::{
    AppointmentBookingService, AppointmentStore, InMemoryAppointmentStore, InMemoryDirectory, NotificationSink,
    ParticipantDirectory, SlotGenerator, SupabaseAppointmentStore, SupabaseDirectory, SupabaseNotificationSink,
    TracingNotificationSink,
};

/// Shared router state. Built once at startup so the stores and the
/// per-doctor lock registry outlive individual requests.
pub struct SchedulingState {
    pub booking: AppointmentBookingService,
    pub slots: SlotGenerator,
    pub config: SchedulingConfig,
}

/// Handles to the in-memory stores behind a state built with
/// [`SchedulingState::in_memory`], for seeding doctors, patients and hours.
#[derive(Clone)]
pub struct InMemoryBackends {
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub availability: Arc<InMemoryAvailabilityStore>,
    pub directory: Arc<InMemoryDirectory>,
}

impl SchedulingState {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn ParticipantDirectory>,
        availability: Arc<dyn AvailabilityStore>,
        notifier: Arc<dyn NotificationSink>,
        config: SchedulingConfig,
    ) -> Self {
        let calendar = Arc::new(AvailabilityCalendar::new(availability));
        let booking = AppointmentBookingService::new(appointments, directory, calendar, notifier, &config);
        let slots = SlotGenerator::new(booking.calendar(), booking.conflict_service(), config.clone());

        Self { booking, slots, config }
    }

    /// Supabase-backed stores when credentials are present, in-memory
    /// stores otherwise.
    pub fn from_config(config: &AppConfig) -> Self {
        if config.is_configured() {
            info!("Using Supabase-backed scheduling stores at {}", config.supabase_url);
            let supabase = Arc::new(SupabaseClient::new(config));

            Self::new(
                Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase))),
                Arc::new(SupabaseDirectory::new(Arc::clone(&supabase))),
                Arc::new(SupabaseAvailabilityStore::new(Arc::clone(&supabase))),
                Arc::new(SupabaseNotificationSink::new(supabase)),
                config.scheduling.clone(),
            )
        } else {
            warn!("Supabase is not configured; scheduling data lives in memory only");
            let (state, _) = Self::in_memory(config.scheduling.clone(), Arc::new(TracingNotificationSink));
            state
        }
    }

    pub fn in_memory(config: SchedulingConfig, notifier: Arc<dyn NotificationSink>) -> (Self, InMemoryBackends) {
        let backends = InMemoryBackends {
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            availability: Arc::new(InMemoryAvailabilityStore::new()),
            directory: Arc::new(InMemoryDirectory::new()),
        };

        let state = Self::new(
            backends.appointments.clone(),
            backends.directory.clone(),
            backends.availability.clone(),
            notifier,
            config,
        );
        (state, backends)
    }
}
