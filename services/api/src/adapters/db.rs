//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mole_tracker_core::domain::{AiRecommendation, LatestPointer, Mole, Observation};
use mole_tracker_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const MOLE_COLUMNS: &str = "mole_id, user_id, body_location, discovered_date, current_risk, \
     current_ai_risk, latest_observation_id, created_at, updated_at";

const OBSERVATION_COLUMNS: &str = "id, mole_id, observation_number, image_date, image_link, \
     original_filename, notes, user_risk, ai_risk, ai_confidence, ai_recommendation, logged_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Converts a driver error into a storage failure, naming the violated
/// constraint when a uniqueness backstop fires.
fn storage_error(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return PortError::Storage(format!(
                "unique constraint violated: {}",
                db_err.constraint().unwrap_or("unknown")
            ));
        }
    }
    PortError::Storage(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

fn risk_from_db(column: &str, value: Option<i16>) -> PortResult<Option<u8>> {
    value
        .map(|v| {
            u8::try_from(v).map_err(|_| {
                PortError::Storage(format!("column {} holds out-of-range value {}", column, v))
            })
        })
        .transpose()
}

#[derive(FromRow)]
struct MoleRecord {
    mole_id: String,
    user_id: String,
    body_location: Option<String>,
    discovered_date: Option<DateTime<Utc>>,
    current_risk: Option<i16>,
    current_ai_risk: Option<i16>,
    latest_observation_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl MoleRecord {
    fn to_domain(self) -> PortResult<Mole> {
        Ok(Mole {
            user_id: self.user_id,
            mole_id: self.mole_id,
            body_location: self.body_location,
            discovered_date: self.discovered_date,
            current_risk: risk_from_db("current_risk", self.current_risk)?,
            current_ai_risk: risk_from_db("current_ai_risk", self.current_ai_risk)?,
            latest_observation_id: self.latest_observation_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ObservationRecord {
    id: Uuid,
    mole_id: String,
    observation_number: i32,
    image_date: DateTime<Utc>,
    image_link: String,
    original_filename: String,
    notes: Option<String>,
    user_risk: Option<i16>,
    ai_risk: Option<i16>,
    ai_confidence: Option<f64>,
    ai_recommendation: Option<String>,
    logged_at: DateTime<Utc>,
}
impl ObservationRecord {
    fn to_domain(self) -> PortResult<Observation> {
        let observation_number = u32::try_from(self.observation_number).map_err(|_| {
            PortError::Storage(format!(
                "observation {} has invalid number {}",
                self.id, self.observation_number
            ))
        })?;
        let ai_recommendation = self
            .ai_recommendation
            .as_deref()
            .map(str::parse::<AiRecommendation>)
            .transpose()
            .map_err(|e| PortError::Storage(e.to_string()))?;

        Ok(Observation {
            id: self.id,
            mole_id: self.mole_id,
            observation_number,
            image_date: self.image_date,
            image_link: self.image_link,
            original_filename: self.original_filename,
            notes: self.notes,
            user_risk: risk_from_db("user_risk", self.user_risk)?,
            ai_risk: risk_from_db("ai_risk", self.ai_risk)?,
            ai_confidence: self.ai_confidence,
            ai_recommendation,
            logged_at: self.logged_at,
        })
    }
}

fn observations_to_domain(records: Vec<ObservationRecord>) -> PortResult<Vec<Observation>> {
    records.into_iter().map(ObservationRecord::to_domain).collect()
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Moles ---

    async fn insert_mole(&self, mole: &Mole) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO moles (mole_id, user_id, body_location, discovered_date, current_risk, \
             current_ai_risk, latest_observation_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&mole.mole_id)
        .bind(&mole.user_id)
        .bind(&mole.body_location)
        .bind(mole.discovered_date)
        .bind(mole.current_risk.map(i16::from))
        .bind(mole.current_ai_risk.map(i16::from))
        .bind(mole.latest_observation_id)
        .bind(mole.created_at)
        .bind(mole.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn find_mole(&self, mole_id: &str) -> PortResult<Option<Mole>> {
        let sql = format!("SELECT {} FROM moles WHERE mole_id = $1", MOLE_COLUMNS);
        let record = sqlx::query_as::<_, MoleRecord>(&sql)
            .bind(mole_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        record.map(MoleRecord::to_domain).transpose()
    }

    async fn find_moles(&self) -> PortResult<Vec<Mole>> {
        let sql = format!(
            "SELECT {} FROM moles ORDER BY created_at ASC, mole_id ASC",
            MOLE_COLUMNS
        );
        let records = sqlx::query_as::<_, MoleRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        records.into_iter().map(MoleRecord::to_domain).collect()
    }

    async fn update_mole_latest(
        &self,
        mole_id: &str,
        latest: &LatestPointer,
        updated_at: DateTime<Utc>,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE moles SET latest_observation_id = $1, current_risk = $2, updated_at = $3 \
             WHERE mole_id = $4",
        )
        .bind(latest.latest_observation_id)
        .bind(latest.current_risk.map(i16::from))
        .bind(updated_at)
        .bind(mole_id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_mole(&self, mole_id: &str) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM moles WHERE mole_id = $1")
            .bind(mole_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_all_moles(&self) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM moles")
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    // --- Observations ---

    async fn insert_observation(&self, observation: &Observation) -> PortResult<()> {
        let observation_number = i32::try_from(observation.observation_number).map_err(|_| {
            PortError::Storage(format!(
                "observation number {} does not fit the schema",
                observation.observation_number
            ))
        })?;
        sqlx::query(
            "INSERT INTO observations (id, mole_id, observation_number, image_date, image_link, \
             original_filename, notes, user_risk, ai_risk, ai_confidence, ai_recommendation, logged_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(observation.id)
        .bind(&observation.mole_id)
        .bind(observation_number)
        .bind(observation.image_date)
        .bind(&observation.image_link)
        .bind(&observation.original_filename)
        .bind(&observation.notes)
        .bind(observation.user_risk.map(i16::from))
        .bind(observation.ai_risk.map(i16::from))
        .bind(observation.ai_confidence)
        .bind(observation.ai_recommendation.map(|r| r.as_str()))
        .bind(observation.logged_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn find_observation(
        &self,
        mole_id: &str,
        observation_id: Uuid,
    ) -> PortResult<Option<Observation>> {
        let sql = format!(
            "SELECT {} FROM observations WHERE id = $1 AND mole_id = $2",
            OBSERVATION_COLUMNS
        );
        let record = sqlx::query_as::<_, ObservationRecord>(&sql)
            .bind(observation_id)
            .bind(mole_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        record.map(ObservationRecord::to_domain).transpose()
    }

    async fn find_observations(&self, mole_id: &str) -> PortResult<Vec<Observation>> {
        let sql = format!(
            "SELECT {} FROM observations WHERE mole_id = $1 ORDER BY observation_number ASC",
            OBSERVATION_COLUMNS
        );
        let records = sqlx::query_as::<_, ObservationRecord>(&sql)
            .bind(mole_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        observations_to_domain(records)
    }

    async fn find_latest_observation(&self, mole_id: &str) -> PortResult<Option<Observation>> {
        let sql = format!(
            "SELECT {} FROM observations WHERE mole_id = $1 \
             ORDER BY observation_number DESC LIMIT 1",
            OBSERVATION_COLUMNS
        );
        let record = sqlx::query_as::<_, ObservationRecord>(&sql)
            .bind(mole_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        record.map(ObservationRecord::to_domain).transpose()
    }

    async fn find_observations_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Observation>> {
        let sql = format!(
            "SELECT {} FROM observations WHERE id = ANY($1)",
            OBSERVATION_COLUMNS
        );
        let records = sqlx::query_as::<_, ObservationRecord>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        observations_to_domain(records)
    }

    async fn find_all_observations(&self) -> PortResult<Vec<Observation>> {
        let sql = format!(
            "SELECT {} FROM observations ORDER BY observation_number ASC",
            OBSERVATION_COLUMNS
        );
        let records = sqlx::query_as::<_, ObservationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        observations_to_domain(records)
    }

    async fn delete_observation(&self, observation_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM observations WHERE id = $1")
            .bind(observation_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_observations_for_mole(&self, mole_id: &str) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM observations WHERE mole_id = $1")
            .bind(mole_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_all_observations(&self) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM observations")
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }
}
