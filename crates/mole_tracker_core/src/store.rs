//! crates/mole_tracker_core/src/store.rs
//!
//! The aggregate store: the only writer of moles, observations and the
//! denormalized latest pointer.
//!
//! The persistence port offers no cross-record transactions, so each mutation
//! is a short sequence of single-record writes. Existence is always checked
//! before the first write. A crash between an observation insert and the mole
//! update leaves the pointer stale until [`MoleStore::refresh_latest`] runs.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    format_image_link, recompute_latest, LatestPointer, Mole, NewObservation, Observation,
};
use crate::ports::{DatabaseService, IdGenerator, PortError, PortResult};
use crate::projection::{
    attach_latest, nest_observations, MoleHistory, MoleWithLatest, MoleWithObservations,
};

//=========================================================================================
// Operation Results
//=========================================================================================

/// Result of creating a mole or appending to one.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedObservation {
    pub mole_id: String,
    pub observation: Observation,
}

/// One observation together with the mole it was looked up under.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedObservation {
    pub mole_id: String,
    pub observation: Observation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedMole {
    pub mole: Mole,
    pub deleted_observations: u64,
    pub observation_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedObservation {
    pub observation: Observation,
    pub remaining_observations: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletedCounts {
    pub moles: u64,
    pub observations: u64,
}

//=========================================================================================
// The Store
//=========================================================================================

#[derive(Clone)]
pub struct MoleStore {
    db: Arc<dyn DatabaseService>,
    ids: Arc<dyn IdGenerator>,
    user_id: String,
}

fn mole_not_found(mole_id: &str) -> PortError {
    warn!(mole_id, "mole not found");
    PortError::NotFound("Mole not found".to_string())
}

impl MoleStore {
    /// Creates a store whose new moles are owned by `user_id`.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        ids: Arc<dyn IdGenerator>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            db,
            ids,
            user_id: user_id.into(),
        }
    }

    async fn require_mole(&self, mole_id: &str) -> PortResult<Mole> {
        self.db
            .find_mole(mole_id)
            .await?
            .ok_or_else(|| mole_not_found(mole_id))
    }

    /// Creates a new mole with observation #1, or appends the next-numbered
    /// observation to the mole named in the payload.
    ///
    /// An explicit mole id never creates a mole: it must already exist.
    pub async fn create_observation(&self, payload: NewObservation) -> PortResult<CreatedObservation> {
        payload.validate()?;
        let now = Utc::now();

        let (mole_id, observation_number) = match payload.target_mole_id() {
            None => {
                let mole_id = self.ids.generate();
                let mole = Mole::new(
                    self.user_id.clone(),
                    mole_id.clone(),
                    payload.image_date,
                    payload.user_risk,
                    now,
                );
                self.db.insert_mole(&mole).await?;
                info!(mole_id = %mole_id, "created mole");
                (mole_id, 1)
            }
            Some(existing) => {
                if self.db.find_mole(existing).await?.is_none() {
                    warn!(mole_id = existing, "append to unknown mole rejected");
                    return Err(PortError::NotFound(format!(
                        "Mole with ID '{}' not found. Use POST without moleId to create a new mole.",
                        existing
                    )));
                }
                // Max plus one rather than a count, so gaps left by deletes are never refilled.
                let next = self
                    .db
                    .find_latest_observation(existing)
                    .await?
                    .map_or(1, |last| last.observation_number + 1);
                (existing.to_string(), next)
            }
        };

        let observation = Observation {
            id: Uuid::new_v4(),
            mole_id: mole_id.clone(),
            observation_number,
            image_date: payload.image_date,
            image_link: format_image_link(&mole_id, observation_number, &payload.original_filename),
            original_filename: payload.original_filename,
            notes: payload.notes,
            user_risk: payload.user_risk,
            ai_risk: None,
            ai_confidence: None,
            ai_recommendation: None,
            logged_at: now,
        };
        observation.validate()?;
        self.db.insert_observation(&observation).await?;

        // The new observation is the maximum by construction; no scan needed.
        let matched = self
            .db
            .update_mole_latest(&mole_id, &LatestPointer::of(&observation), now)
            .await?;
        if !matched {
            // The mole was deleted between the two writes.
            self.db.delete_observation(observation.id).await?;
            return Err(mole_not_found(&mole_id));
        }

        info!(
            mole_id = %mole_id,
            observation_number,
            observation_id = %observation.id,
            "logged observation"
        );
        Ok(CreatedObservation {
            mole_id,
            observation,
        })
    }

    /// Returns a mole with its latest observation resolved.
    pub async fn get_mole(&self, mole_id: &str) -> PortResult<MoleWithLatest> {
        let mole = self.require_mole(mole_id).await?;
        let latest_observation = match mole.latest_observation_id {
            Some(id) => self.db.find_observation(mole_id, id).await?,
            None => None,
        };
        debug!(mole_id, has_latest = latest_observation.is_some(), "fetched mole");
        Ok(MoleWithLatest {
            mole,
            latest_observation,
        })
    }

    /// Returns a mole and all of its observations, oldest number first.
    pub async fn get_history(&self, mole_id: &str) -> PortResult<MoleHistory> {
        let mole = self.require_mole(mole_id).await?;
        let observations = self.db.find_observations(mole_id).await?;
        debug!(mole_id, count = observations.len(), "fetched mole history");
        Ok(MoleHistory { mole, observations })
    }

    /// Returns one observation, only if it belongs to `mole_id`.
    pub async fn get_observation(
        &self,
        mole_id: &str,
        observation_id: Uuid,
    ) -> PortResult<ScopedObservation> {
        self.require_mole(mole_id).await?;
        let observation = self
            .db
            .find_observation(mole_id, observation_id)
            .await?
            .ok_or_else(|| observation_not_found(mole_id, observation_id))?;
        Ok(ScopedObservation {
            mole_id: mole_id.to_string(),
            observation,
        })
    }

    /// Returns every mole with its latest observation resolved.
    pub async fn list_moles(&self) -> PortResult<Vec<MoleWithLatest>> {
        let moles = self.db.find_moles().await?;
        let latest_ids: Vec<Uuid> = moles
            .iter()
            .filter_map(|m| m.latest_observation_id)
            .collect();
        let latest = if latest_ids.is_empty() {
            Vec::new()
        } else {
            self.db.find_observations_by_ids(&latest_ids).await?
        };
        debug!(count = moles.len(), "listed moles");
        Ok(attach_latest(moles, latest))
    }

    /// Returns every mole with its complete observation history nested.
    ///
    /// Moles and observations are fetched concurrently, once each, then grouped.
    pub async fn list_moles_with_history(&self) -> PortResult<Vec<MoleWithObservations>> {
        let (moles, observations) =
            futures::try_join!(self.db.find_moles(), self.db.find_all_observations())?;
        debug!(
            moles = moles.len(),
            observations = observations.len(),
            "listed moles with observations"
        );
        Ok(nest_observations(moles, observations))
    }

    /// Deletes a mole and every observation it owns.
    ///
    /// Observations go first so an interrupted delete never leaves orphans.
    pub async fn delete_mole(&self, mole_id: &str) -> PortResult<DeletedMole> {
        let mole = self.require_mole(mole_id).await?;
        let observations = self.db.find_observations(mole_id).await?;
        let deleted_observations = self.db.delete_observations_for_mole(mole_id).await?;
        self.db.delete_mole(mole_id).await?;

        info!(mole_id, deleted_observations, "deleted mole");
        Ok(DeletedMole {
            mole,
            deleted_observations,
            observation_ids: observations.iter().map(|o| o.id).collect(),
        })
    }

    /// Deletes one observation of a mole and re-derives the mole's latest pointer.
    pub async fn delete_observation(
        &self,
        mole_id: &str,
        observation_id: Uuid,
    ) -> PortResult<DeletedObservation> {
        self.require_mole(mole_id).await?;
        let observation = self
            .db
            .find_observation(mole_id, observation_id)
            .await?
            .ok_or_else(|| observation_not_found(mole_id, observation_id))?;

        self.db.delete_observation(observation_id).await?;
        let remaining = self.db.find_observations(mole_id).await?;
        self.write_latest(mole_id, &remaining).await?;

        info!(
            mole_id,
            observation_id = %observation_id,
            remaining = remaining.len(),
            "deleted observation"
        );
        Ok(DeletedObservation {
            observation,
            remaining_observations: remaining.len(),
        })
    }

    /// Removes every observation and every mole. Succeeds on an empty store.
    pub async fn delete_all(&self) -> PortResult<DeletedCounts> {
        let observations = self.db.delete_all_observations().await?;
        let moles = self.db.delete_all_moles().await?;
        info!(moles, observations, "deleted all moles");
        Ok(DeletedCounts { moles, observations })
    }

    /// Re-derives a mole's latest pointer from its surviving observations and stores it.
    pub async fn refresh_latest(&self, mole_id: &str) -> PortResult<LatestPointer> {
        self.require_mole(mole_id).await?;
        let observations = self.db.find_observations(mole_id).await?;
        self.write_latest(mole_id, &observations).await
    }

    async fn write_latest(
        &self,
        mole_id: &str,
        observations: &[Observation],
    ) -> PortResult<LatestPointer> {
        let latest = recompute_latest(observations);
        let matched = self
            .db
            .update_mole_latest(mole_id, &latest, Utc::now())
            .await?;
        if !matched {
            return Err(mole_not_found(mole_id));
        }
        debug!(mole_id, latest = ?latest.latest_observation_id, "recomputed latest pointer");
        Ok(latest)
    }
}

fn observation_not_found(mole_id: &str, observation_id: Uuid) -> PortError {
    warn!(mole_id, observation_id = %observation_id, "observation not found for mole");
    PortError::NotFound("Observation not found for this mole".to_string())
}
