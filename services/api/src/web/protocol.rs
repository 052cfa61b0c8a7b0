//! services/api/src/web/protocol.rs
//!
//! Defines the JSON request and response payloads of the REST API.
//! Keys are camelCase on the wire.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use mole_tracker_core::domain::{Mole, NewObservation, Observation};
use mole_tracker_core::projection::{MoleHistory, MoleWithLatest, MoleWithObservations};
use mole_tracker_core::store::{
    CreatedObservation, DeletedCounts, DeletedMole, DeletedObservation, ScopedObservation,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;

//=========================================================================================
// Requests
//=========================================================================================

/// Payload for creating a new mole, or appending an observation when `moleId` is given.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateObservationRequest {
    /// Existing mole to append to. Omit (or send an empty string) to create a new mole.
    pub mole_id: Option<String>,
    /// Capture date: an RFC 3339 timestamp or a plain `YYYY-MM-DD` date.
    #[schema(example = "2024-03-01")]
    pub image_date: Option<String>,
    /// Original filename of the uploaded photo.
    #[schema(example = "photo.png")]
    pub image_link: Option<String>,
    pub notes: Option<String>,
    /// User-assessed risk, 1-5.
    #[schema(minimum = 1, maximum = 5)]
    pub user_risk: Option<u8>,
}

impl CreateObservationRequest {
    /// Checks the required fields and converts the request into the core payload.
    pub fn into_domain(self) -> Result<NewObservation, ApiError> {
        let raw_date = self
            .image_date
            .ok_or_else(|| ApiError::Validation("imageDate is required".to_string()))?;
        let image_link = self
            .image_link
            .ok_or_else(|| ApiError::Validation("imageLink is required".to_string()))?;

        Ok(NewObservation {
            mole_id: self.mole_id,
            image_date: parse_image_date(&raw_date)?,
            original_filename: image_link,
            notes: self.notes,
            user_risk: self.user_risk,
        })
    }
}

/// Accepts a full RFC 3339 timestamp, or a bare date taken as midnight UTC.
pub fn parse_image_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .ok_or_else(|| ApiError::Validation(format!("imageDate '{}' is not a valid date", raw)))
}

//=========================================================================================
// Records
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationBody {
    pub id: Uuid,
    pub mole_id: String,
    pub observation_number: u32,
    pub image_date: DateTime<Utc>,
    /// Stored filename, e.g. `uploads/mole_3f2a9c1e_obs_1.png`.
    pub image_link: String,
    pub original_filename: String,
    pub notes: Option<String>,
    pub user_risk: Option<u8>,
    pub ai_risk: Option<u8>,
    pub ai_confidence: Option<f64>,
    /// One of `monitor`, `see_doctor`, `urgent`.
    pub ai_recommendation: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl From<Observation> for ObservationBody {
    fn from(o: Observation) -> Self {
        Self {
            id: o.id,
            mole_id: o.mole_id,
            observation_number: o.observation_number,
            image_date: o.image_date,
            image_link: o.image_link,
            original_filename: o.original_filename,
            notes: o.notes,
            user_risk: o.user_risk,
            ai_risk: o.ai_risk,
            ai_confidence: o.ai_confidence,
            ai_recommendation: o.ai_recommendation.map(|r| r.as_str().to_string()),
            logged_at: o.logged_at,
        }
    }
}

fn observation_bodies(observations: Vec<Observation>) -> Vec<ObservationBody> {
    observations.into_iter().map(ObservationBody::from).collect()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoleBody {
    pub user_id: String,
    pub mole_id: String,
    pub body_location: Option<String>,
    pub discovered_date: Option<DateTime<Utc>>,
    pub current_risk: Option<u8>,
    pub current_ai_risk: Option<u8>,
    pub latest_observation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Mole> for MoleBody {
    fn from(m: Mole) -> Self {
        Self {
            user_id: m.user_id,
            mole_id: m.mole_id,
            body_location: m.body_location,
            discovered_date: m.discovered_date,
            current_risk: m.current_risk,
            current_ai_risk: m.current_ai_risk,
            latest_observation_id: m.latest_observation_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// A mole with its latest observation resolved.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoleWithLatestBody {
    #[serde(flatten)]
    pub mole: MoleBody,
    pub latest_observation: Option<ObservationBody>,
}

impl From<MoleWithLatest> for MoleWithLatestBody {
    fn from(m: MoleWithLatest) -> Self {
        Self {
            mole: m.mole.into(),
            latest_observation: m.latest_observation.map(Into::into),
        }
    }
}

/// A mole with every observation nested, oldest number first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoleWithObservationsBody {
    #[serde(flatten)]
    pub mole: MoleBody,
    pub observations: Vec<ObservationBody>,
}

impl From<MoleWithObservations> for MoleWithObservationsBody {
    fn from(m: MoleWithObservations) -> Self {
        Self {
            mole: m.mole.into(),
            observations: observation_bodies(m.observations),
        }
    }
}

//=========================================================================================
// Responses
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MolesWithObservationsResponse {
    pub moles: Vec<MoleWithObservationsBody>,
}

impl From<Vec<MoleWithObservations>> for MolesWithObservationsResponse {
    fn from(moles: Vec<MoleWithObservations>) -> Self {
        Self {
            moles: moles.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MoleHistoryResponse {
    pub mole: MoleBody,
    pub observations: Vec<ObservationBody>,
}

impl From<MoleHistory> for MoleHistoryResponse {
    fn from(h: MoleHistory) -> Self {
        Self {
            mole: h.mole.into(),
            observations: observation_bodies(h.observations),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoleObservationsResponse {
    pub mole_id: String,
    pub observations: Vec<ObservationBody>,
}

impl From<MoleHistory> for MoleObservationsResponse {
    fn from(h: MoleHistory) -> Self {
        Self {
            mole_id: h.mole.mole_id,
            observations: observation_bodies(h.observations),
        }
    }
}

/// One observation and the mole it belongs to. Returned on create and on lookup.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationResponse {
    pub mole_id: String,
    pub observation: ObservationBody,
}

impl From<CreatedObservation> for ObservationResponse {
    fn from(c: CreatedObservation) -> Self {
        Self {
            mole_id: c.mole_id,
            observation: c.observation.into(),
        }
    }
}

impl From<ScopedObservation> for ObservationResponse {
    fn from(s: ScopedObservation) -> Self {
        Self {
            mole_id: s.mole_id,
            observation: s.observation.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMoleResponse {
    pub message: String,
    pub deleted_mole: MoleBody,
    pub deleted_observations: u64,
    pub observation_ids: Vec<Uuid>,
}

impl From<DeletedMole> for DeleteMoleResponse {
    fn from(d: DeletedMole) -> Self {
        Self {
            message: "Mole and all observations deleted successfully".to_string(),
            deleted_mole: d.mole.into(),
            deleted_observations: d.deleted_observations,
            observation_ids: d.observation_ids,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteObservationResponse {
    pub message: String,
    pub deleted_observation: ObservationBody,
    pub remaining_observations: usize,
}

impl From<DeletedObservation> for DeleteObservationResponse {
    fn from(d: DeletedObservation) -> Self {
        Self {
            message: "Observation deleted successfully".to_string(),
            deleted_observation: d.observation.into(),
            remaining_observations: d.remaining_observations,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedCountsBody {
    pub moles: u64,
    pub observations: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteAllResponse {
    pub message: String,
    pub deleted: DeletedCountsBody,
}

impl From<DeletedCounts> for DeleteAllResponse {
    fn from(d: DeletedCounts) -> Self {
        Self {
            message: "All moles and observations deleted successfully".to_string(),
            deleted: DeletedCountsBody {
                moles: d.moles,
                observations: d.observations,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn plain_dates_become_utc_midnight() {
        let parsed = parse_image_date("2024-03-01").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let parsed = parse_image_date("2024-03-01T10:30:00+02:00").unwrap();
        assert_eq!(parsed.hour(), 8);
    }

    #[test]
    fn garbage_dates_are_validation_errors() {
        assert!(matches!(parse_image_date("last tuesday"), Err(ApiError::Validation(_))));
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let no_date = CreateObservationRequest {
            image_link: Some("a.png".into()),
            ..Default::default()
        };
        assert!(matches!(no_date.into_domain(), Err(ApiError::Validation(m)) if m.contains("imageDate")));

        let no_link = CreateObservationRequest {
            image_date: Some("2024-03-01".into()),
            ..Default::default()
        };
        assert!(matches!(no_link.into_domain(), Err(ApiError::Validation(m)) if m.contains("imageLink")));
    }

    #[test]
    fn request_keys_are_camel_case() {
        let request: CreateObservationRequest = serde_json::from_str(
            r#"{"moleId":"abc","imageDate":"2024-03-01","imageLink":"p.png","userRisk":2}"#,
        )
        .unwrap();
        let payload = request.into_domain().unwrap();
        assert_eq!(payload.mole_id.as_deref(), Some("abc"));
        assert_eq!(payload.original_filename, "p.png");
        assert_eq!(payload.user_risk, Some(2));
    }
}
