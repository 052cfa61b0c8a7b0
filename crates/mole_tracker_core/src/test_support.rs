//! Shared test utilities for the core crate.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::domain::{NewObservation, DEFAULT_USER_ID};
use crate::memory::MemoryDatabase;
use crate::ports::IdGenerator;
use crate::store::MoleStore;

/// Deterministic ids shaped like UUIDs: `00000001-test-mole`, `00000002-test-mole`, ...
#[derive(Default)]
pub(crate) struct SequentialIds {
    next: AtomicU32,
}

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{:08}-test-mole", n)
    }
}

/// A store over a fresh in-memory database, with a handle to inspect the database directly.
pub(crate) fn test_store() -> (MoleStore, Arc<MemoryDatabase>) {
    let db = Arc::new(MemoryDatabase::new());
    let store = MoleStore::new(db.clone(), Arc::new(SequentialIds::default()), DEFAULT_USER_ID);
    (store, db)
}

/// Creates a new mole with `count` observations (risks cycling 1..=5) and returns its id.
pub(crate) async fn seeded_store(store: &MoleStore, count: u32) -> String {
    let date = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
    let first = store
        .create_observation(NewObservation::new(date(1), "seed.png").with_user_risk(1))
        .await
        .unwrap();
    for n in 2..=count {
        store
            .create_observation(
                NewObservation::new(date(n), format!("seed{}.jpg", n))
                    .for_mole(first.mole_id.clone())
                    .with_user_risk(((n - 1) % 5 + 1) as u8),
            )
            .await
            .unwrap();
    }
    first.mole_id
}
