//! Geographic name resolution and per-variant geo targeting policy.

pub mod directory;
pub mod policy;
pub mod resolver;
pub mod tables;

pub use directory::GeoDirectory;
pub use policy::GeoTargetingPolicy;
pub use resolver::{GeoAutoSelection, GeoResolver};
