use std::sync::Arc;

use shared::{
    domain::{Truck, TruckId},
    protocol::encode_truck_snapshot,
};
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tracing::debug;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("truck {0} already exists")]
    DuplicateId(TruckId),
    #[error("failed to encode truck snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
    Unchanged,
}

/// Ordered set of trucks known to the feed. Every change re-encodes the full
/// snapshot and publishes it to watchers, so a slow watcher only ever skips
/// to the newest one.
pub struct Fleet {
    trucks: RwLock<Vec<Truck>>,
    published: watch::Sender<Arc<str>>,
}

impl Fleet {
    pub fn new(seed: Vec<Truck>) -> Result<Self, FleetError> {
        for (index, truck) in seed.iter().enumerate() {
            if seed[..index].iter().any(|other| other.id == truck.id) {
                return Err(FleetError::DuplicateId(truck.id.clone()));
            }
        }
        let encoded: Arc<str> = encode_truck_snapshot(&seed)?.into();
        Ok(Self {
            trucks: RwLock::new(seed),
            published: watch::Sender::new(encoded),
        })
    }

    pub async fn list(&self) -> Vec<Truck> {
        self.trucks.read().await.clone()
    }

    pub fn current_snapshot(&self) -> Arc<str> {
        Arc::clone(&self.published.borrow())
    }

    pub fn watch(&self) -> watch::Receiver<Arc<str>> {
        self.published.subscribe()
    }

    pub async fn add(&self, truck: Truck) -> Result<(), FleetError> {
        let mut trucks = self.trucks.write().await;
        if trucks.iter().any(|existing| existing.id == truck.id) {
            return Err(FleetError::DuplicateId(truck.id));
        }
        trucks.push(truck);
        self.publish(&trucks)
    }

    /// Replaces the truck with the same id in place, or appends it.
    pub async fn upsert(&self, truck: Truck) -> Result<Upsert, FleetError> {
        let mut trucks = self.trucks.write().await;
        let outcome = match trucks.iter_mut().find(|existing| existing.id == truck.id) {
            Some(existing) if *existing == truck => return Ok(Upsert::Unchanged),
            Some(existing) => {
                *existing = truck;
                Upsert::Replaced
            }
            None => {
                trucks.push(truck);
                Upsert::Inserted
            }
        };
        self.publish(&trucks)?;
        Ok(outcome)
    }

    pub async fn remove(&self, id: &TruckId) -> Result<Option<Truck>, FleetError> {
        let mut trucks = self.trucks.write().await;
        let Some(index) = trucks.iter().position(|truck| &truck.id == id) else {
            return Ok(None);
        };
        let removed = trucks.remove(index);
        self.publish(&trucks)?;
        Ok(Some(removed))
    }

    fn publish(&self, trucks: &[Truck]) -> Result<(), FleetError> {
        let encoded: Arc<str> = encode_truck_snapshot(trucks)?.into();
        self.published.send_replace(encoded);
        debug!(trucks = trucks.len(), "published truck snapshot");
        Ok(())
    }
}
