//! Per-variant geo targeting rules.

use std::sync::Arc;

use tracing::{info, warn};

use linehaul_core::error::AssemblyResult;
use linehaul_core::types::{LineVariant, TargetingSet};

use crate::directory::{PRIMARY_COUNTRY_FALLBACK_ID, PRIMARY_COUNTRY_NAME};
use crate::resolver::GeoResolver;

/// Builds the include/exclude geo id sets for one line-item variant.
///
/// Standard lines target exactly what the operator asked for, tolerating
/// unresolvable names. The psbk and nwp companions invert the shape: they
/// always target the primary operating country and carve the operator's
/// locations out as exclusions, so a bad exclusion there is a correctness
/// problem and aborts the build.
pub struct GeoTargetingPolicy {
    resolver: Arc<GeoResolver>,
}

impl GeoTargetingPolicy {
    pub fn new(resolver: Arc<GeoResolver>) -> Self {
        Self { resolver }
    }

    pub async fn build_targeting(
        &self,
        variant: LineVariant,
        user_locations: &[String],
    ) -> AssemblyResult<TargetingSet> {
        match variant {
            LineVariant::Standard => Ok(self.inclusion_targeting(user_locations).await),
            LineVariant::Psbk | LineVariant::Nwp => {
                self.country_with_exclusions(user_locations).await
            }
        }
    }

    /// Best-effort inclusion set. Unresolvable names are dropped; an empty
    /// set means no geo restriction and is valid.
    async fn inclusion_targeting(&self, user_locations: &[String]) -> TargetingSet {
        let mut targeting = TargetingSet::default();
        for location in user_locations {
            match self.resolver.resolve(location).await {
                Ok(id) => {
                    targeting.included_geo_ids.insert(id);
                }
                Err(err) => {
                    warn!(location, %err, "skipping unresolvable location");
                }
            }
        }
        info!(
            included = targeting.included_geo_ids.len(),
            "built inclusion targeting"
        );
        targeting
    }

    /// Primary-country inclusion with the operator's locations excluded.
    /// Resolution errors on the exclusions propagate.
    async fn country_with_exclusions(
        &self,
        user_locations: &[String],
    ) -> AssemblyResult<TargetingSet> {
        let mut targeting = TargetingSet::default();

        let country_id = match self.resolver.resolve(PRIMARY_COUNTRY_NAME).await {
            Ok(id) => id,
            Err(err) => {
                warn!(%err, fallback = PRIMARY_COUNTRY_FALLBACK_ID, "primary country lookup failed, using fallback id");
                PRIMARY_COUNTRY_FALLBACK_ID
            }
        };
        targeting.included_geo_ids.insert(country_id);

        for location in user_locations {
            let id = self.resolver.resolve(location).await?;
            targeting.excluded_geo_ids.insert(id);
        }

        info!(
            excluded = targeting.excluded_geo_ids.len(),
            "built country-with-exclusions targeting"
        );
        Ok(targeting)
    }
}
