pub mod db;
pub mod ids;

pub use db::DbAdapter;
pub use ids::UuidGenerator;
