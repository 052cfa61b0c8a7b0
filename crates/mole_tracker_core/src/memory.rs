//! crates/mole_tracker_core/src/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. Records are kept
//! in insertion order. The uniqueness constraints, the observation-to-mole
//! foreign key and its cascading delete behave as in the SQL schema.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{LatestPointer, Mole, Observation};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Tables {
    moles: Vec<Mole>,
    observations: Vec<Observation>,
}

/// A `DatabaseService` backed by two in-memory vectors.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Storage("memory database lock poisoned".to_string()))
    }
}

fn sorted_by_number(mut observations: Vec<Observation>) -> Vec<Observation> {
    observations.sort_by_key(|o| o.observation_number);
    observations
}

#[async_trait]
impl DatabaseService for MemoryDatabase {
    async fn insert_mole(&self, mole: &Mole) -> PortResult<()> {
        let mut tables = self.lock()?;
        if tables.moles.iter().any(|m| m.mole_id == mole.mole_id) {
            return Err(PortError::Storage(format!(
                "duplicate key moles_mole_id_key: {}",
                mole.mole_id
            )));
        }
        tables.moles.push(mole.clone());
        Ok(())
    }

    async fn find_mole(&self, mole_id: &str) -> PortResult<Option<Mole>> {
        let tables = self.lock()?;
        Ok(tables.moles.iter().find(|m| m.mole_id == mole_id).cloned())
    }

    async fn find_moles(&self) -> PortResult<Vec<Mole>> {
        Ok(self.lock()?.moles.clone())
    }

    async fn update_mole_latest(
        &self,
        mole_id: &str,
        latest: &LatestPointer,
        updated_at: DateTime<Utc>,
    ) -> PortResult<bool> {
        let mut tables = self.lock()?;
        match tables.moles.iter_mut().find(|m| m.mole_id == mole_id) {
            Some(mole) => {
                mole.latest_observation_id = latest.latest_observation_id;
                mole.current_risk = latest.current_risk;
                mole.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_mole(&self, mole_id: &str) -> PortResult<u64> {
        let mut tables = self.lock()?;
        let before = tables.moles.len();
        tables.moles.retain(|m| m.mole_id != mole_id);
        tables.observations.retain(|o| o.mole_id != mole_id);
        Ok((before - tables.moles.len()) as u64)
    }

    async fn delete_all_moles(&self) -> PortResult<u64> {
        let mut tables = self.lock()?;
        let deleted = tables.moles.len() as u64;
        tables.moles.clear();
        tables.observations.clear();
        Ok(deleted)
    }

    async fn insert_observation(&self, observation: &Observation) -> PortResult<()> {
        let mut tables = self.lock()?;
        if !tables.moles.iter().any(|m| m.mole_id == observation.mole_id) {
            return Err(PortError::Storage(format!(
                "foreign key observations_mole_id_fkey: mole {} does not exist",
                observation.mole_id
            )));
        }
        let clash = tables.observations.iter().any(|o| {
            o.id == observation.id
                || (o.mole_id == observation.mole_id
                    && o.observation_number == observation.observation_number)
        });
        if clash {
            return Err(PortError::Storage(format!(
                "duplicate key observations_mole_id_observation_number_key: ({}, {})",
                observation.mole_id, observation.observation_number
            )));
        }
        tables.observations.push(observation.clone());
        Ok(())
    }

    async fn find_observation(
        &self,
        mole_id: &str,
        observation_id: Uuid,
    ) -> PortResult<Option<Observation>> {
        let tables = self.lock()?;
        Ok(tables
            .observations
            .iter()
            .find(|o| o.id == observation_id && o.mole_id == mole_id)
            .cloned())
    }

    async fn find_observations(&self, mole_id: &str) -> PortResult<Vec<Observation>> {
        let tables = self.lock()?;
        let matching = tables
            .observations
            .iter()
            .filter(|o| o.mole_id == mole_id)
            .cloned()
            .collect();
        Ok(sorted_by_number(matching))
    }

    async fn find_latest_observation(&self, mole_id: &str) -> PortResult<Option<Observation>> {
        let tables = self.lock()?;
        Ok(tables
            .observations
            .iter()
            .filter(|o| o.mole_id == mole_id)
            .max_by_key(|o| o.observation_number)
            .cloned())
    }

    async fn find_observations_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Observation>> {
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        let tables = self.lock()?;
        Ok(tables
            .observations
            .iter()
            .filter(|o| wanted.contains(&o.id))
            .cloned()
            .collect())
    }

    async fn find_all_observations(&self) -> PortResult<Vec<Observation>> {
        let all = self.lock()?.observations.clone();
        Ok(sorted_by_number(all))
    }

    async fn delete_observation(&self, observation_id: Uuid) -> PortResult<u64> {
        let mut tables = self.lock()?;
        let before = tables.observations.len();
        tables.observations.retain(|o| o.id != observation_id);
        Ok((before - tables.observations.len()) as u64)
    }

    async fn delete_observations_for_mole(&self, mole_id: &str) -> PortResult<u64> {
        let mut tables = self.lock()?;
        let before = tables.observations.len();
        tables.observations.retain(|o| o.mole_id != mole_id);
        Ok((before - tables.observations.len()) as u64)
    }

    async fn delete_all_observations(&self) -> PortResult<u64> {
        let mut tables = self.lock()?;
        let deleted = tables.observations.len() as u64;
        tables.observations.clear();
        Ok(deleted)
    }
}
