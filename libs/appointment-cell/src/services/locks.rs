// libs/appointment-cell/src/services/locks.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

const PRUNE_THRESHOLD: usize = 1024;

/// One mutex per doctor. Holding a doctor's guard serializes every
/// check-then-write against that doctor's calendar while leaving other
/// doctors untouched.
#[derive(Default)]
pub struct DoctorLockRegistry {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl DoctorLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, doctor_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() >= PRUNE_THRESHOLD {
                // Entries only the registry still references are idle.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(doctor_id).or_default().clone()
        };

        debug!("Waiting for scheduling lock of doctor {}", doctor_id);
        lock.lock_owned().await
    }

    pub async fn tracked_doctors(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_doctor_is_serialized() {
        let registry = DoctorLockRegistry::new();
        let doctor = Uuid::new_v4();

        let guard = registry.acquire(doctor).await;
        let second = tokio::time::timeout(Duration::from_millis(50), registry.acquire(doctor)).await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(50), registry.acquire(doctor)).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn different_doctors_do_not_contend() {
        let registry = DoctorLockRegistry::new();

        let _first = registry.acquire(Uuid::new_v4()).await;
        let other = tokio::time::timeout(Duration::from_millis(50), registry.acquire(Uuid::new_v4())).await;
        assert!(other.is_ok());
        assert_eq!(registry.tracked_doctors().await, 2);
    }
}
