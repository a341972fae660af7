use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{AvailabilityError, AvailabilityWindow, Weekday};

/// Read access to published availability. Windows are written by doctor
/// profile management, never by the scheduling engine.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn active_windows(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError>;

    async fn active_windows_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError>;
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAvailabilityStore {
    windows: RwLock<HashMap<Uuid, Vec<AvailabilityWindow>>>,
}

impl InMemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a window, replacing any existing window with the same id.
    pub async fn publish(&self, window: AvailabilityWindow) {
        let mut windows = self.windows.write().await;
        let doctor_windows = windows.entry(window.doctor_id).or_default();
        doctor_windows.retain(|w| w.id != window.id);
        doctor_windows.push(window);
    }

    /// Returns false when no window has that id.
    pub async fn deactivate(&self, window_id: Uuid) -> bool {
        let mut windows = self.windows.write().await;
        windows
            .values_mut()
            .flat_map(|doctor_windows| doctor_windows.iter_mut())
            .find(|w| w.id == window_id)
            .map(|w| w.is_active = false)
            .is_some()
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn active_windows(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        let windows = self.windows.read().await;
        Ok(windows
            .get(&doctor_id)
            .map(|doctor_windows| {
                doctor_windows
                    .iter()
                    .filter(|w| w.is_active && w.weekday == weekday)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn active_windows_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        let windows = self.windows.read().await;
        Ok(windows
            .get(&doctor_id)
            .map(|doctor_windows| doctor_windows.iter().filter(|w| w.is_active).cloned().collect())
            .unwrap_or_default())
    }
}

// ==============================================================================
// SUPABASE STORE
// ==============================================================================

pub struct SupabaseAvailabilityStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAvailabilityStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(|e| {
                error!("Failed to load availability: {}", e);
                AvailabilityError::Storage(e.to_string())
            })?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilityWindow>, _>>()
            .map_err(|e| AvailabilityError::Storage(format!("Failed to parse availability: {}", e)))
    }
}

#[async_trait]
impl AvailabilityStore for SupabaseAvailabilityStore {
    async fn active_windows(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        debug!("Fetching {} availability for doctor {}", weekday, doctor_id);

        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&weekday=eq.{}&is_active=eq.true&order=start_time.asc",
            doctor_id, weekday
        );
        self.fetch(&path).await
    }

    async fn active_windows_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        debug!("Fetching weekly availability for doctor {}", doctor_id);

        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&is_active=eq.true&order=start_time.asc",
            doctor_id
        );
        self.fetch(&path).await
    }
}
