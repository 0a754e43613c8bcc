//! Seam onto the external placement directory service.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use linehaul_core::error::AssemblyResult;
use linehaul_core::types::{AdSize, PlacementGroup};

/// One named external directory: a spreadsheet-style source addressed by
/// url plus sheet name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySource {
    pub sheet_url: String,
    pub sheet_name: String,
}

/// Row filters applied when fetching inventory ids for one canonical size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeFilter {
    pub adtype_filter: Vec<String>,
    pub section_filter: Vec<String>,
    /// Pre-alias creative sizes that map into this canonical size.
    pub original_sizes: BTreeSet<AdSize>,
    /// For rich-media lines only: the effective platform set for this
    /// bucket, already intersected with the operator's platforms.
    pub richmedia_platforms: Option<Vec<String>>,
}

/// Query interface onto an external placement directory. One fetch covers
/// one source sheet for a subset of sites.
#[async_trait]
pub trait PlacementDirectory: Send + Sync {
    /// Candidate inventory ids per canonical size, filtered by site code,
    /// platform, and the adtype/section filters in `size_filters`. Sizes
    /// with no matching rows may be absent from the result.
    async fn fetch_placement_ids(
        &self,
        source: &DirectorySource,
        site_codes: &[String],
        platforms: &[String],
        size_filters: &BTreeMap<AdSize, SizeFilter>,
    ) -> AssemblyResult<BTreeMap<AdSize, PlacementGroup>>;
}
