//! Seam onto the platform's geographic directory.

use async_trait::async_trait;
use linehaul_core::error::AssemblyResult;
use linehaul_core::types::{GeoMatch, GeoType};

/// Country whose geo ids anchor psbk/nwp targeting.
pub const PRIMARY_COUNTRY_CODE: &str = "IN";
/// Directory name of the primary operating country.
pub const PRIMARY_COUNTRY_NAME: &str = "India";
/// Known-good directory id for the primary country, used when the lookup
/// itself fails.
pub const PRIMARY_COUNTRY_FALLBACK_ID: u64 = 2356;
/// Preferred when no primary-country match exists.
pub const SECONDARY_COUNTRY_CODE: &str = "US";
/// Sub-country rows from this code are noise for our campaigns and are
/// filtered out at query time.
pub const NOISE_COUNTRY_CODE: &str = "PK";

/// Read-only query interface onto the platform's geographic directory.
#[async_trait]
pub trait GeoDirectory: Send + Sync {
    /// All targetable rows named `name` at the given hierarchy level,
    /// excluding `exclude_country` when set. Row order is the directory's
    /// own; the resolver treats it as stable.
    async fn query(
        &self,
        name: &str,
        level: GeoType,
        exclude_country: Option<&str>,
    ) -> AssemblyResult<Vec<GeoMatch>>;

    /// Name of the immediate parent region of a geo id, if the directory
    /// knows one.
    async fn parent_region_name(&self, geo_id: u64) -> AssemblyResult<Option<String>>;
}
