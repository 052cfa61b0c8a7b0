//! crates/mole_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete database and identifier implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{LatestPointer, Mole, Observation};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type for all core and port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// A mole or observation required by the operation does not exist.
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The caller supplied missing or out-of-range input.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The persistence layer is unreachable or rejected the request.
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for the mole and observation collections.
///
/// Implementations must enforce uniqueness of `mole_id` across moles and of
/// `(mole_id, observation_number)` across observations. Writes are atomic per
/// record only; nothing here spans both collections.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Moles ---
    async fn insert_mole(&self, mole: &Mole) -> PortResult<()>;

    async fn find_mole(&self, mole_id: &str) -> PortResult<Option<Mole>>;

    async fn find_moles(&self) -> PortResult<Vec<Mole>>;

    /// Overwrites the denormalized latest fields. Returns `false` if no mole matched.
    async fn update_mole_latest(
        &self,
        mole_id: &str,
        latest: &LatestPointer,
        updated_at: DateTime<Utc>,
    ) -> PortResult<bool>;

    async fn delete_mole(&self, mole_id: &str) -> PortResult<u64>;

    async fn delete_all_moles(&self) -> PortResult<u64>;

    // --- Observations ---
    async fn insert_observation(&self, observation: &Observation) -> PortResult<()>;

    /// Finds an observation only if it belongs to `mole_id`.
    async fn find_observation(
        &self,
        mole_id: &str,
        observation_id: Uuid,
    ) -> PortResult<Option<Observation>>;

    /// All observations of a mole, ascending by observation number.
    async fn find_observations(&self, mole_id: &str) -> PortResult<Vec<Observation>>;

    /// The observation with the highest number for a mole.
    async fn find_latest_observation(&self, mole_id: &str) -> PortResult<Option<Observation>>;

    async fn find_observations_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Observation>>;

    /// Every observation, ascending by observation number.
    async fn find_all_observations(&self) -> PortResult<Vec<Observation>>;

    async fn delete_observation(&self, observation_id: Uuid) -> PortResult<u64>;

    async fn delete_observations_for_mole(&self, mole_id: &str) -> PortResult<u64>;

    async fn delete_all_observations(&self) -> PortResult<u64>;
}

/// Mints globally unique, opaque mole identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}
