// libs/appointment-cell/src/services/directory.rs
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::AppointmentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Patient,
    Doctor,
}

/// A resolved patient or doctor identity. Only existence matters here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub role: ParticipantRole,
}

/// Existence lookups against the patient and doctor directories.
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    async fn resolve_patient(&self, patient_id: Uuid) -> Result<Participant, AppointmentError>;

    async fn resolve_doctor(&self, doctor_id: Uuid) -> Result<Participant, AppointmentError>;
}

#[derive(Default)]
pub struct InMemoryDirectory {
    patients: RwLock<HashSet<Uuid>>,
    doctors: RwLock<HashSet<Uuid>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_patient(&self, patient_id: Uuid) {
        self.patients.write().await.insert(patient_id);
    }

    pub async fn register_doctor(&self, doctor_id: Uuid) {
        self.doctors.write().await.insert(doctor_id);
    }
}

#[async_trait]
impl ParticipantDirectory for InMemoryDirectory {
    async fn resolve_patient(&self, patient_id: Uuid) -> Result<Participant, AppointmentError> {
        if self.patients.read().await.contains(&patient_id) {
            Ok(Participant { id: patient_id, role: ParticipantRole::Patient })
        } else {
            Err(AppointmentError::NotFound("Patient not found".to_string()))
        }
    }

    async fn resolve_doctor(&self, doctor_id: Uuid) -> Result<Participant, AppointmentError> {
        if self.doctors.read().await.contains(&doctor_id) {
            Ok(Participant { id: doctor_id, role: ParticipantRole::Doctor })
        } else {
            Err(AppointmentError::NotFound("Doctor not found".to_string()))
        }
    }
}

pub struct SupabaseDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn exists(&self, table: &str, id: Uuid) -> Result<bool, AppointmentError> {
        debug!("Resolving {} {}", table, id);

        let path = format!("/rest/v1/{}?id=eq.{}&select=id", table, id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))?;

        Ok(!result.is_empty())
    }
}

#[async_trait]
impl ParticipantDirectory for SupabaseDirectory {
    async fn resolve_patient(&self, patient_id: Uuid) -> Result<Participant, AppointmentError> {
        if self.exists("patients", patient_id).await? {
            Ok(Participant { id: patient_id, role: ParticipantRole::Patient })
        } else {
            Err(AppointmentError::NotFound("Patient not found".to_string()))
        }
    }

    async fn resolve_doctor(&self, doctor_id: Uuid) -> Result<Participant, AppointmentError> {
        if self.exists("doctors", doctor_id).await? {
            Ok(Participant { id: doctor_id, role: ParticipantRole::Doctor })
        } else {
            Err(AppointmentError::NotFound("Doctor not found".to_string()))
        }
    }
}
