//! Data files for the colony engine: static configuration loaded into a
//! [`colony_core::registry::Registry`], and save files holding a world
//! document.

pub mod loader;
pub mod save;
pub mod schema;

pub use loader::{DataLoadError, load_config, load_registry};
pub use save::{load_world, record_world};
