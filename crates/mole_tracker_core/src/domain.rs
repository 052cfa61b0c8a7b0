//! crates/mole_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ports::{PortError, PortResult};

/// Owner assigned to every mole while the system runs with a single implicit user.
pub const DEFAULT_USER_ID: &str = "default-user";

/// Lowest and highest accepted values for user and AI risk scores.
pub const MIN_RISK: u8 = 1;
pub const MAX_RISK: u8 = 5;

/// Represents one physical mole.
///
/// `current_risk` and `latest_observation_id` are denormalized from the
/// highest-numbered surviving observation and are only written by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Mole {
    pub user_id: String,
    pub mole_id: String,
    pub body_location: Option<String>,
    pub discovered_date: Option<DateTime<Utc>>,
    pub current_risk: Option<u8>,
    /// Reserved for automated scoring; never written by the store.
    pub current_ai_risk: Option<u8>,
    pub latest_observation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mole {
    /// Builds a fresh mole discovered on `discovered_date` with no observations yet.
    pub fn new(
        user_id: impl Into<String>,
        mole_id: impl Into<String>,
        discovered_date: DateTime<Utc>,
        current_risk: Option<u8>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            mole_id: mole_id.into(),
            body_location: None,
            discovered_date: Some(discovered_date),
            current_risk,
            current_ai_risk: None,
            latest_observation_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the latest pointer currently stored on this mole.
    pub fn latest_pointer(&self) -> LatestPointer {
        LatestPointer {
            latest_observation_id: self.latest_observation_id,
            current_risk: self.current_risk,
        }
    }
}

/// Follow-up advice produced by automated scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiRecommendation {
    Monitor,
    SeeDoctor,
    Urgent,
}

impl AiRecommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiRecommendation::Monitor => "monitor",
            AiRecommendation::SeeDoctor => "see_doctor",
            AiRecommendation::Urgent => "urgent",
        }
    }
}

impl fmt::Display for AiRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiRecommendation {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monitor" => Ok(AiRecommendation::Monitor),
            "see_doctor" => Ok(AiRecommendation::SeeDoctor),
            "urgent" => Ok(AiRecommendation::Urgent),
            other => Err(PortError::Validation(format!(
                "Unknown AI recommendation '{}'",
                other
            ))),
        }
    }
}

/// Represents one dated, numbered photo and assessment of a mole.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub id: Uuid,
    pub mole_id: String,
    /// Starts at 1 per mole; each append takes the highest surviving number plus one.
    pub observation_number: u32,
    pub image_date: DateTime<Utc>,
    /// Storage-internal filename, see [`format_image_link`].
    pub image_link: String,
    pub original_filename: String,
    pub notes: Option<String>,
    pub user_risk: Option<u8>,
    pub ai_risk: Option<u8>,
    pub ai_confidence: Option<f64>,
    pub ai_recommendation: Option<AiRecommendation>,
    pub logged_at: DateTime<Utc>,
}

impl Observation {
    /// Range-checks the assessment fields before the record is persisted.
    pub fn validate(&self) -> PortResult<()> {
        if let Some(risk) = self.user_risk {
            validate_risk("userRisk", risk)?;
        }
        if let Some(risk) = self.ai_risk {
            validate_risk("aiRisk", risk)?;
        }
        if let Some(confidence) = self.ai_confidence {
            validate_confidence(confidence)?;
        }
        Ok(())
    }
}

/// Caller input for creating a mole or appending to an existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservation {
    /// `None` (or an empty string) creates a new mole with a freshly minted id.
    pub mole_id: Option<String>,
    pub image_date: DateTime<Utc>,
    /// The filename as uploaded by the caller.
    pub original_filename: String,
    pub notes: Option<String>,
    pub user_risk: Option<u8>,
}

impl NewObservation {
    pub fn new(image_date: DateTime<Utc>, original_filename: impl Into<String>) -> Self {
        Self {
            mole_id: None,
            image_date,
            original_filename: original_filename.into(),
            notes: None,
            user_risk: None,
        }
    }

    pub fn for_mole(mut self, mole_id: impl Into<String>) -> Self {
        self.mole_id = Some(mole_id.into());
        self
    }

    pub fn with_user_risk(mut self, risk: u8) -> Self {
        self.user_risk = Some(risk);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// The target mole id, treating an empty string the same as no id.
    pub fn target_mole_id(&self) -> Option<&str> {
        self.mole_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn validate(&self) -> PortResult<()> {
        if self.original_filename.trim().is_empty() {
            return Err(PortError::Validation("imageLink is required".to_string()));
        }
        if let Some(risk) = self.user_risk {
            validate_risk("userRisk", risk)?;
        }
        Ok(())
    }
}

/// Checks that a risk score lies within the accepted 1-5 scale.
pub fn validate_risk(field: &str, value: u8) -> PortResult<()> {
    if (MIN_RISK..=MAX_RISK).contains(&value) {
        Ok(())
    } else {
        Err(PortError::Validation(format!(
            "{} must be between {} and {}, got {}",
            field, MIN_RISK, MAX_RISK, value
        )))
    }
}

/// Checks that an AI confidence value lies within 0-1.
pub fn validate_confidence(value: f64) -> PortResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PortError::Validation(format!(
            "aiConfidence must be between 0 and 1, got {}",
            value
        )))
    }
}

/// The denormalized fields a mole carries about its most recent observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatestPointer {
    pub latest_observation_id: Option<Uuid>,
    pub current_risk: Option<u8>,
}

impl LatestPointer {
    /// The pointer of a mole with no observations.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(observation: &Observation) -> Self {
        Self {
            latest_observation_id: Some(observation.id),
            current_risk: observation.user_risk,
        }
    }
}

/// Derives the latest pointer from a mole's surviving observations.
///
/// The highest `observation_number` wins regardless of input order.
pub fn recompute_latest(observations: &[Observation]) -> LatestPointer {
    observations
        .iter()
        .max_by_key(|o| o.observation_number)
        .map(LatestPointer::of)
        .unwrap_or_default()
}

/// Builds the stored filename for an observation image:
/// `uploads/mole_<first segment of mole id>_obs_<number>.<extension>`.
///
/// The extension is everything after the last `.` of the original filename,
/// or empty when it has none.
pub fn format_image_link(mole_id: &str, observation_number: u32, original_filename: &str) -> String {
    let short_id = mole_id.split('-').next().unwrap_or(mole_id);
    let extension = original_filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or("");
    format!(
        "uploads/mole_{}_obs_{}.{}",
        short_id, observation_number, extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn observation(number: u32, risk: Option<u8>) -> Observation {
        Observation {
            id: Uuid::new_v4(),
            mole_id: "m-1".to_string(),
            observation_number: number,
            image_date: Utc::now(),
            image_link: format_image_link("m-1", number, "a.png"),
            original_filename: "a.png".to_string(),
            notes: None,
            user_risk: risk,
            ai_risk: None,
            ai_confidence: None,
            ai_recommendation: None,
            logged_at: Utc::now(),
        }
    }

    #[test]
    fn image_link_uses_first_id_segment_and_extension() {
        let link = format_image_link("3f2a9c1e-7b4d-4c3e-9a11-0d5e6f7a8b9c", 1, "photo.png");
        assert_eq!(link, "uploads/mole_3f2a9c1e_obs_1.png");
    }

    #[test]
    fn image_link_takes_text_after_last_dot() {
        let link = format_image_link("abc-def", 12, "holiday.photo.JPEG");
        assert_eq!(link, "uploads/mole_abc_obs_12.JPEG");
    }

    #[test]
    fn image_link_without_extension_leaves_segment_empty() {
        assert_eq!(format_image_link("abc", 2, "scan"), "uploads/mole_abc_obs_2.");
    }

    #[test]
    fn recompute_latest_on_empty_clears_pointer() {
        assert_eq!(recompute_latest(&[]), LatestPointer::empty());
    }

    #[test]
    fn recompute_latest_picks_highest_number_in_any_order() {
        let third = observation(3, Some(5));
        let first = observation(1, Some(2));
        let seventh = observation(7, None);
        let pointer = recompute_latest(&[third.clone(), seventh.clone(), first]);

        assert_eq!(pointer.latest_observation_id, Some(seventh.id));
        // Risk follows the winning observation even when it is unset.
        assert_eq!(pointer.current_risk, None);

        let pointer = recompute_latest(&[third.clone()]);
        assert_eq!(pointer, LatestPointer::of(&third));
    }

    #[test]
    fn validation_rejects_blank_filename_and_out_of_range_risk() {
        let now = Utc::now();
        assert!(matches!(
            NewObservation::new(now, "  ").validate(),
            Err(PortError::Validation(_))
        ));
        assert!(matches!(
            NewObservation::new(now, "a.png").with_user_risk(6).validate(),
            Err(PortError::Validation(_))
        ));
        assert!(matches!(
            NewObservation::new(now, "a.png").with_user_risk(0).validate(),
            Err(PortError::Validation(_))
        ));
        assert!(NewObservation::new(now, "a.png").with_user_risk(5).validate().is_ok());
    }

    #[test]
    fn empty_mole_id_is_treated_as_absent() {
        let payload = NewObservation::new(Utc::now(), "a.png").for_mole("");
        assert_eq!(payload.target_mole_id(), None);
    }

    #[test]
    fn ai_recommendation_parses_known_values_only() {
        assert_eq!("see_doctor".parse::<AiRecommendation>().ok(), Some(AiRecommendation::SeeDoctor));
        assert_eq!(AiRecommendation::Urgent.to_string(), "urgent");
        assert!("panic".parse::<AiRecommendation>().is_err());
    }

    #[test]
    fn confidence_bounds() {
        assert!(validate_confidence(0.0).is_ok());
        assert!(validate_confidence(1.0).is_ok());
        assert!(validate_confidence(1.01).is_err());
    }

    #[test]
    fn observation_validation_covers_ai_fields() {
        assert!(observation(1, Some(5)).validate().is_ok());

        let mut bad_risk = observation(1, None);
        bad_risk.ai_risk = Some(7);
        assert!(matches!(bad_risk.validate(), Err(PortError::Validation(m)) if m.contains("aiRisk")));

        let mut bad_confidence = observation(1, None);
        bad_confidence.ai_confidence = Some(1.5);
        assert!(matches!(
            bad_confidence.validate(),
            Err(PortError::Validation(m)) if m.contains("aiConfidence")
        ));

        let mut scored = observation(1, Some(2));
        scored.ai_risk = Some(4);
        scored.ai_confidence = Some(0.8);
        assert!(scored.validate().is_ok());
    }
}
