pub mod calculations;
pub mod db;
pub mod models;
pub mod timeline;

pub use db::repository::{BillingRepository, RepositoryError};
pub use models::*;
