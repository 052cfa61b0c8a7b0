pub mod domain;
pub mod memory;
pub mod ports;
pub mod projection;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use domain::{
    format_image_link, recompute_latest, AiRecommendation, LatestPointer, Mole, NewObservation,
    Observation, DEFAULT_USER_ID,
};
pub use memory::MemoryDatabase;
pub use ports::{DatabaseService, IdGenerator, PortError, PortResult};
pub use projection::{MoleHistory, MoleWithLatest, MoleWithObservations};
pub use store::{
    CreatedObservation, DeletedCounts, DeletedMole, DeletedObservation, MoleStore,
    ScopedObservation,
};
