pub mod loader;

pub use loader::{RosterLoader, RosterLoaderError, RosterRecord};
