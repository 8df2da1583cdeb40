pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use error::{ArcsealError, ArcsealResult};
pub use types::{ArchiveJsonBlock, EncConfig, CURRENT_SCHEMA_VERSION};
