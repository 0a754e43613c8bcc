//! Inventory placement aggregation across external placement directories.

pub mod aggregator;
pub mod directory;
pub mod nwp;
pub mod sites;

pub use aggregator::PlacementAggregator;
pub use directory::{DirectorySource, PlacementDirectory, SizeFilter};
pub use sites::SitePartition;
