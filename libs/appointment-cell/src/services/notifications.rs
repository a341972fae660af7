// libs/appointment-cell/src/services/notifications.rs
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::Appointment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingEventKind {
    Booked,
    Cancelled,
    Rescheduled,
    StatusChanged,
}

impl SchedulingEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulingEventKind::Booked => "booked",
            SchedulingEventKind::Cancelled => "cancelled",
            SchedulingEventKind::Rescheduled => "rescheduled",
            SchedulingEventKind::StatusChanged => "status_changed",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            SchedulingEventKind::Booked => "Appointment booked",
            SchedulingEventKind::Cancelled => "Appointment cancelled",
            SchedulingEventKind::Rescheduled => "Appointment rescheduled",
            SchedulingEventKind::StatusChanged => "Appointment status updated",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulingEvent {
    pub kind: SchedulingEventKind,
    pub recipients: Vec<Uuid>,
    pub payload: Value,
}

impl SchedulingEvent {
    /// Addressed to both participants of the appointment.
    pub fn for_appointment(kind: SchedulingEventKind, appointment: &Appointment) -> Self {
        Self {
            kind,
            recipients: vec![appointment.patient_id, appointment.doctor_id],
            payload: json!({ "appointment": appointment }),
        }
    }

    pub fn appointment_id(&self) -> Option<&str> {
        self.payload["appointment"]["id"].as_str()
    }
}

/// Fire-and-forget delivery. Errors are reported to the caller only so they
/// can be logged; they never affect the scheduling operation.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, event: &SchedulingEvent) -> Result<()>;
}

/// Logs events and delivers nothing.
#[derive(Debug, Default, Clone)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn emit(&self, event: &SchedulingEvent) -> Result<()> {
        info!(
            kind = event.kind.as_str(),
            recipients = event.recipients.len(),
            appointment_id = event.appointment_id().unwrap_or("unknown"),
            "Scheduling event"
        );
        Ok(())
    }
}

/// Writes one row per recipient into the `notifications` table.
pub struct SupabaseNotificationSink {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseNotificationSink {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl NotificationSink for SupabaseNotificationSink {
    async fn emit(&self, event: &SchedulingEvent) -> Result<()> {
        let appointment = &event.payload["appointment"];
        let body = format!(
            "{} ({} - {})",
            event.kind.title(),
            appointment["start_time"].as_str().unwrap_or_default(),
            appointment["end_time"].as_str().unwrap_or_default(),
        );

        let rows: Vec<Value> = event
            .recipients
            .iter()
            .map(|user_id| {
                json!({
                    "user_id": user_id,
                    "type": "APPOINTMENT",
                    "title": event.kind.title(),
                    "body": body,
                })
            })
            .collect();

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/notifications",
                None,
                Some(Value::Array(rows)),
                Some(SupabaseClient::return_representation()),
            )
            .await?;
        Ok(())
    }
}
