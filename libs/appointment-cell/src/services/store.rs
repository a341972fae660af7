// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, warn};
use uuid::Uuid;

use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{Appointment, AppointmentError, Page};

/// Appointment persistence. Implementations must reject a write that would
/// leave two overlapping SCHEDULED appointments for one doctor with
/// `AppointmentError::Conflict`.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    /// SCHEDULED appointments of a doctor intersecting `[range_start, range_end)`,
    /// ordered by start.
    async fn scheduled_between(
        &self,
        doctor_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Newest first.
    async fn list_for_patient(&self, patient_id: Uuid, page: Page) -> Result<Vec<Appointment>, AppointmentError>;

    /// Newest first.
    async fn list_for_doctor(&self, doctor_id: Uuid, page: Page) -> Result<Vec<Appointment>, AppointmentError>;
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusion constraint on `(doctor_id, [start_time, end_time))` for
    /// SCHEDULED rows.
    fn violates_exclusion(existing: &HashMap<Uuid, Appointment>, candidate: &Appointment) -> bool {
        candidate.is_scheduled()
            && existing.values().any(|other| {
                other.id != candidate.id
                    && other.doctor_id == candidate.doctor_id
                    && other.is_scheduled()
                    && other.overlaps(candidate.start_time, candidate.end_time)
            })
    }

    fn paginate(mut rows: Vec<Appointment>, page: Page) -> Vec<Appointment> {
        rows.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        rows.into_iter().skip(page.skip).take(page.limit).collect()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;

        if appointments.contains_key(&appointment.id) {
            return Err(AppointmentError::Storage(format!(
                "Appointment {} already exists",
                appointment.id
            )));
        }
        if Self::violates_exclusion(&appointments, &appointment) {
            warn!("Exclusion constraint rejected insert for doctor {}", appointment.doctor_id);
            return Err(AppointmentError::doctor_unavailable());
        }

        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;

        if !appointments.contains_key(&appointment.id) {
            return Err(AppointmentError::appointment_not_found());
        }
        if Self::violates_exclusion(&appointments, &appointment) {
            warn!("Exclusion constraint rejected update of appointment {}", appointment.id);
            return Err(AppointmentError::doctor_unavailable());
        }

        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn scheduled_between(
        &self,
        doctor_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.read().await;
        let mut rows: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.is_scheduled() && a.overlaps(range_start, range_end))
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.start_time);
        Ok(rows)
    }

    async fn list_for_patient(&self, patient_id: Uuid, page: Page) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.read().await;
        let rows = appointments.values().filter(|a| a.patient_id == patient_id).cloned().collect();
        Ok(Self::paginate(rows, page))
    }

    async fn list_for_doctor(&self, doctor_id: Uuid, page: Page) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.read().await;
        let rows = appointments.values().filter(|a| a.doctor_id == doctor_id).cloned().collect();
        Ok(Self::paginate(rows, page))
    }
}

// ==============================================================================
// SUPABASE STORE
// ==============================================================================

/// PostgREST-backed store. The `appointments` table is expected to carry
/// `EXCLUDE USING gist (doctor_id WITH =, tstzrange(start_time, end_time) WITH &&)
/// WHERE (status = 'SCHEDULED')`; its 409 surfaces as a conflict.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn timestamp(instant: DateTime<Utc>) -> String {
        // `Z` suffix keeps `+` out of query strings.
        instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    fn to_row(appointment: &Appointment) -> Value {
        json!({
            "id": appointment.id,
            "patient_id": appointment.patient_id,
            "doctor_id": appointment.doctor_id,
            "start_time": Self::timestamp(appointment.start_time),
            "end_time": Self::timestamp(appointment.end_time),
            "status": appointment.status,
            "reason": appointment.reason,
            "cancellation_reason": appointment.cancellation_reason,
            "created_at": appointment.created_at.to_rfc3339(),
            "updated_at": appointment.updated_at.to_rfc3339(),
        })
    }

    fn parse_rows(result: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::Storage(format!("Failed to parse appointments: {}", e)))
    }

    fn map_write_error(err: anyhow::Error) -> AppointmentError {
        if is_conflict(&err) {
            warn!("Store rejected overlapping appointment: {}", err);
            AppointmentError::doctor_unavailable()
        } else {
            error!("Appointment write failed: {}", err);
            AppointmentError::Storage(err.to_string())
        }
    }

    async fn select(&self, path: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))?;
        Self::parse_rows(result)
    }

    fn single(rows: Vec<Appointment>, action: &str) -> Result<Appointment, AppointmentError> {
        rows.into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Storage(format!("Failed to {} appointment", action)))
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        Ok(self.select(&path).await?.into_iter().next())
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        debug!("Inserting appointment {}", appointment.id);

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                None,
                Some(Self::to_row(&appointment)),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(Self::map_write_error)?;

        Self::single(Self::parse_rows(result)?, "create")
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment {}", appointment.id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let body = json!({
            "start_time": Self::timestamp(appointment.start_time),
            "end_time": Self::timestamp(appointment.end_time),
            "status": appointment.status,
            "reason": appointment.reason,
            "cancellation_reason": appointment.cancellation_reason,
            "updated_at": appointment.updated_at.to_rfc3339(),
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(Self::map_write_error)?;

        let rows = Self::parse_rows(result)?;
        rows.into_iter().next().ok_or_else(AppointmentError::appointment_not_found)
    }

    async fn scheduled_between(
        &self,
        doctor_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&status=eq.SCHEDULED&start_time=lt.{}&end_time=gt.{}&order=start_time.asc",
            doctor_id,
            Self::timestamp(range_end),
            Self::timestamp(range_start),
        );
        self.select(&path).await
    }

    async fn list_for_patient(&self, patient_id: Uuid, page: Page) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=start_time.desc&offset={}&limit={}",
            patient_id, page.skip, page.limit
        );
        self.select(&path).await
    }

    async fn list_for_doctor(&self, doctor_id: Uuid, page: Page) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=start_time.desc&offset={}&limit={}",
            doctor_id, page.skip, page.limit
        );
        self.select(&path).await
    }
}
