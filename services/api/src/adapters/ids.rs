//! services/api/src/adapters/ids.rs
//!
//! Identifier minting for new moles.

use mole_tracker_core::ports::IdGenerator;
use uuid::Uuid;

/// Produces hyphenated random (v4) UUID strings.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_distinct_hyphenated_uuids() {
        let ids = UuidGenerator;
        let (a, b) = (ids.generate(), ids.generate());
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert_eq!(a.split('-').next().map(str::len), Some(8));
    }
}
