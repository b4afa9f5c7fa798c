pub mod batch;
pub mod config;
pub mod error;
pub mod imports;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod presets;
pub mod rules;
pub mod transform;
pub mod types;
pub mod verify;
pub mod walk;

pub use error::{MigrateError, Result};
