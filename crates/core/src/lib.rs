pub mod api;
pub mod config;
pub mod error;
pub mod types;

pub use config::AssemblyConfig;
pub use error::{AssemblyError, AssemblyResult};
