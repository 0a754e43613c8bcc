//! Fixed ad-unit inventory for nwp lines. These lines never consult the
//! external directories; they target a hand-picked set of ad units.

use std::collections::BTreeMap;

use linehaul_core::types::{AdSize, PlacementGroup, TargetingType};

const MREC: AdSize = AdSize::new(300, 250);
const BOTTOM_BANNER: AdSize = AdSize::new(320, 50);

// NP_MWEB_PSBK_CAN_MREC / NP_AMP_PSBK_CAN_MREC
const MREC_AD_UNITS: [u64; 2] = [23_314_114_031, 23_314_120_439];
// NP_MWEB_PSBK_CAN_ATF / NP_AMP_PSBK_CAN_ATF
const BOTTOM_BANNER_AD_UNITS: [u64; 2] = [23_314_114_448, 23_312_946_423];

/// The only sizes an nwp line can carry.
pub const NWP_SIZES: [AdSize; 2] = [MREC, BOTTOM_BANNER];

/// Ad-unit groups for an nwp line, both mobile-web and AMP units per size.
pub fn ad_unit_map() -> BTreeMap<AdSize, PlacementGroup> {
    let mut map = BTreeMap::new();
    map.insert(MREC, group(MREC, &MREC_AD_UNITS));
    map.insert(BOTTOM_BANNER, group(BOTTOM_BANNER, &BOTTOM_BANNER_AD_UNITS));
    map
}

fn group(size: AdSize, ad_units: &[u64]) -> PlacementGroup {
    PlacementGroup {
        placement_ids: ad_units.iter().copied().collect(),
        original_sizes: [size].into(),
        targeting_type: TargetingType::AdUnit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_covers_exactly_the_nwp_sizes() {
        let map = ad_unit_map();
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), NWP_SIZES.to_vec());
        for group in map.values() {
            assert_eq!(group.targeting_type, TargetingType::AdUnit);
            assert_eq!(group.placement_ids.len(), 2);
        }
    }
}
