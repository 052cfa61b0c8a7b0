//! crates/mole_tracker_core/src/projection.rs
//!
//! Read-side shapes assembled from store primitives. Nothing here writes.

use std::collections::HashMap;

use crate::domain::{Mole, Observation};

/// A mole paired with its most recent observation, resolved from the latest pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleWithLatest {
    pub mole: Mole,
    pub latest_observation: Option<Observation>,
}

/// A mole and its full observation history, ascending by observation number.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleHistory {
    pub mole: Mole,
    pub observations: Vec<Observation>,
}

/// A mole with every observation nested beneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleWithObservations {
    pub mole: Mole,
    pub observations: Vec<Observation>,
}

/// Groups `observations` by mole id and attaches each group to its mole.
///
/// Moles keep their input order. Every mole gets a list, empty if it has no
/// observations, sorted ascending by observation number. Observations whose
/// mole is not in `moles` are dropped.
pub fn nest_observations(
    moles: Vec<Mole>,
    observations: Vec<Observation>,
) -> Vec<MoleWithObservations> {
    let mut by_mole: HashMap<String, Vec<Observation>> = HashMap::new();
    for observation in observations {
        by_mole
            .entry(observation.mole_id.clone())
            .or_default()
            .push(observation);
    }

    moles
        .into_iter()
        .map(|mole| {
            let mut observations = by_mole.remove(&mole.mole_id).unwrap_or_default();
            observations.sort_by_key(|o| o.observation_number);
            MoleWithObservations { mole, observations }
        })
        .collect()
}

/// Resolves each mole's latest pointer against a batch of observations fetched by id.
pub fn attach_latest(moles: Vec<Mole>, latest: Vec<Observation>) -> Vec<MoleWithLatest> {
    let mut by_id: HashMap<_, _> = latest.into_iter().map(|o| (o.id, o)).collect();
    moles
        .into_iter()
        .map(|mole| {
            let latest_observation = mole
                .latest_observation_id
                .and_then(|id| by_id.remove(&id))
                .filter(|o| o.mole_id == mole.mole_id);
            MoleWithLatest {
                mole,
                latest_observation,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn mole(id: &str) -> Mole {
        Mole::new("u", id, Utc::now(), None, Utc::now())
    }

    fn observation(mole_id: &str, number: u32) -> Observation {
        Observation {
            id: Uuid::new_v4(),
            mole_id: mole_id.to_string(),
            observation_number: number,
            image_date: Utc::now(),
            image_link: String::new(),
            original_filename: "a.png".to_string(),
            notes: None,
            user_risk: None,
            ai_risk: None,
            ai_confidence: None,
            ai_recommendation: None,
            logged_at: Utc::now(),
        }
    }

    fn numbers(group: &MoleWithObservations) -> Vec<u32> {
        group.observations.iter().map(|o| o.observation_number).collect()
    }

    #[test]
    fn groups_observations_under_their_moles_in_order() {
        let nested = nest_observations(
            vec![mole("a"), mole("b"), mole("c")],
            vec![
                observation("b", 2),
                observation("a", 4),
                observation("b", 1),
                observation("a", 1),
            ],
        );

        assert_eq!(nested.len(), 3);
        assert_eq!(nested[0].mole.mole_id, "a");
        assert_eq!(numbers(&nested[0]), vec![1, 4]);
        assert_eq!(numbers(&nested[1]), vec![1, 2]);
        assert!(nested[2].observations.is_empty());
    }

    #[test]
    fn drops_observations_without_a_mole() {
        let nested = nest_observations(vec![mole("a")], vec![observation("ghost", 1)]);
        assert_eq!(nested.len(), 1);
        assert!(nested[0].observations.is_empty());
    }

    #[test]
    fn attach_latest_resolves_only_matching_pointers() {
        let first = observation("a", 1);
        let mut with_pointer = mole("a");
        with_pointer.latest_observation_id = Some(first.id);
        let without_pointer = mole("b");

        let resolved = attach_latest(vec![with_pointer, without_pointer], vec![first.clone()]);
        assert_eq!(resolved[0].latest_observation, Some(first));
        assert_eq!(resolved[1].latest_observation, None);
    }
}
