//! Size consolidation: canonical placement buckets, placeholder/targeting
//! assembly, and the fixed structural add-on rules.

use std::collections::BTreeMap;

use tracing::{info, warn};

use linehaul_core::types::{
    AdSize, CreativePlaceholder, CreativeTargeting, LineFlavor, PlacementGroup,
};
use linehaul_inventory::directory::SizeFilter;

use crate::presets;

pub const MREC: AdSize = AdSize::new(300, 250);
pub const BOTTOM_BANNER: AdSize = AdSize::new(320, 50);
pub const PPD: AdSize = AdSize::new(320, 100);
pub const TOWER: AdSize = AdSize::new(300, 600);
pub const LEADERBOARD: AdSize = AdSize::new(728, 90);
pub const WIDE_LEADERBOARD: AdSize = AdSize::new(980, 200);
pub const LARGE_INTERSTITIAL: AdSize = AdSize::new(1260, 570);
pub const EXPANDO: AdSize = AdSize::new(600, 250);

const INTERSTITIAL_COMPANIONS: [AdSize; 2] = [AdSize::new(728, 500), AdSize::new(1320, 570)];
const EXPANDO_DISPLAY_NAME: &str = "Mrec Expando";

/// Canonical placement bucket for a declared size. The narrow bottom
/// banner absorbs the taller 320x100 for targeting purposes only; the
/// creative placeholder keeps the original size.
pub fn canonical_bucket(size: AdSize) -> AdSize {
    if size == PPD {
        BOTTOM_BANNER
    } else {
        size
    }
}

/// Turns declared/detected sizes plus aggregated inventory into the
/// placeholder and targeting lists the ad server expects.
pub struct SizeGroupConsolidator {
    flavor: LineFlavor,
    /// Operator platforms, already normalized to upper case.
    platforms: Vec<String>,
}

impl SizeGroupConsolidator {
    pub fn new(flavor: LineFlavor, platforms: Vec<String>) -> Self {
        Self { flavor, platforms }
    }

    /// Directory fetch filters per canonical bucket, derived from the
    /// preset table. Rich-media sizes whose supported-platform set does
    /// not intersect the request are dropped here.
    pub fn build_size_groups(&self, declared: &[AdSize]) -> BTreeMap<AdSize, SizeFilter> {
        let presets = presets::presets_for(self.flavor);
        let mut groups: BTreeMap<AdSize, SizeFilter> = BTreeMap::new();

        for &size in declared {
            let Some(preset) = presets.get(&size) else {
                warn!(%size, "size has no preset for this line flavor, skipping");
                continue;
            };

            let richmedia_platforms = if self.flavor.is_rich_media() {
                let supported = preset.platforms.unwrap_or(&[]);
                let effective: Vec<String> = self
                    .platforms
                    .iter()
                    .filter(|p| supported.contains(&p.as_str()))
                    .cloned()
                    .collect();
                if effective.is_empty() {
                    warn!(%size, ?supported, "no requested platform supports this rich-media size, dropping");
                    continue;
                }
                Some(effective)
            } else {
                None
            };

            let bucket = canonical_bucket(size);
            let entry = groups.entry(bucket).or_default();
            entry.original_sizes.insert(size);
            for adtype in preset.adtypes {
                if !entry.adtype_filter.iter().any(|a| a == adtype) {
                    entry.adtype_filter.push(adtype.to_string());
                }
            }
            for section in preset.sections {
                if !entry.section_filter.iter().any(|s| s == section) {
                    entry.section_filter.push(section.to_string());
                }
            }
            if let Some(platforms) = richmedia_platforms {
                let merged = entry.richmedia_platforms.get_or_insert_with(Vec::new);
                for p in platforms {
                    if !merged.contains(&p) {
                        merged.push(p);
                    }
                }
            }
        }
        groups
    }

    /// Display name used to pair a placeholder with its targeting entry.
    pub fn display_name(&self, original: AdSize) -> String {
        if original == PPD {
            "Mweb_PPD".to_string()
        } else if original == MREC && self.flavor.is_rich_media() {
            "Mrec_ex".to_string()
        } else if original == TOWER && self.flavor.is_rich_media() {
            "Tower_ex".to_string()
        } else {
            original.to_string()
        }
    }

    /// Placeholder/targeting assembly over the aggregated placement map,
    /// including the structural add-on placeholders.
    pub fn consolidate(
        &self,
        placement_map: &BTreeMap<AdSize, PlacementGroup>,
        has_in_banner_video: bool,
    ) -> (Vec<CreativePlaceholder>, Vec<CreativeTargeting>) {
        let mut placeholders = Vec::new();
        let mut targetings = Vec::new();

        for (bucket, group) in placement_map {
            if group.placement_ids.is_empty() {
                warn!(%bucket, "bucket has no inventory ids, skipping");
                continue;
            }
            for &original in &group.original_sizes {
                let name = self.display_name(original);
                placeholders.push(CreativePlaceholder {
                    targeting_name: Some(name.clone()),
                    size: original,
                });
                targetings.push(CreativeTargeting {
                    name,
                    targeting_type: group.targeting_type,
                    targeted_ids: group.placement_ids.clone(),
                });
            }
        }

        if has_in_banner_video && !placement_map.contains_key(&MREC) {
            placeholders.push(untargeted(MREC));
            info!("added untargeted 300x250 placeholder for in-banner video");
        }

        if has_ids(placement_map, LARGE_INTERSTITIAL) {
            for size in INTERSTITIAL_COMPANIONS {
                placeholders.push(untargeted(size));
            }
            info!("added interstitial companion placeholders");
        }

        if has_ids(placement_map, WIDE_LEADERBOARD) && !placement_map.contains_key(&LEADERBOARD) {
            placeholders.push(untargeted(LEADERBOARD));
            info!("added standard leaderboard placeholder alongside 980x200");
        }

        let any_original = |size: AdSize| {
            placement_map
                .values()
                .any(|g| g.original_sizes.contains(&size))
        };
        if any_original(PPD) && !any_original(BOTTOM_BANNER) {
            // Untargeted so any 320x50 creative can serve into it.
            placeholders.push(untargeted(BOTTOM_BANNER));
            info!("added untargeted 320x50 placeholder alongside 320x100");
        }

        if let Some(group) = placement_map.get(&EXPANDO) {
            if !group.placement_ids.is_empty() {
                placeholders.push(CreativePlaceholder {
                    targeting_name: Some(EXPANDO_DISPLAY_NAME.to_string()),
                    size: MREC,
                });
                targetings.push(CreativeTargeting {
                    name: EXPANDO_DISPLAY_NAME.to_string(),
                    targeting_type: group.targeting_type,
                    targeted_ids: group.placement_ids.clone(),
                });
                info!("added expando placeholder/targeting pair");
            }
        }

        (placeholders, targetings)
    }
}

fn untargeted(size: AdSize) -> CreativePlaceholder {
    CreativePlaceholder {
        targeting_name: None,
        size,
    }
}

fn has_ids(map: &BTreeMap<AdSize, PlacementGroup>, size: AdSize) -> bool {
    map.get(&size).is_some_and(|g| !g.placement_ids.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linehaul_core::types::TargetingType;

    fn consolidator(flavor: LineFlavor, platforms: &[&str]) -> SizeGroupConsolidator {
        SizeGroupConsolidator::new(flavor, platforms.iter().map(|p| p.to_string()).collect())
    }

    fn group(ids: &[u64], originals: &[AdSize]) -> PlacementGroup {
        PlacementGroup {
            placement_ids: ids.iter().copied().collect(),
            original_sizes: originals.iter().copied().collect(),
            targeting_type: TargetingType::Placement,
        }
    }

    // 1. Size group building ------------------------------------------------

    #[test]
    fn test_ppd_aliases_into_bottom_banner_bucket() {
        let c = consolidator(LineFlavor::Standard, &["MWEB"]);
        let groups = c.build_size_groups(&[PPD]);
        let filter = &groups[&BOTTOM_BANNER];
        assert_eq!(filter.original_sizes, [PPD].into());
        assert!(filter.adtype_filter.iter().any(|a| a == "SLUG1"));
    }

    #[test]
    fn test_alias_and_explicit_size_share_a_bucket() {
        let c = consolidator(LineFlavor::Standard, &["MWEB"]);
        let groups = c.build_size_groups(&[PPD, BOTTOM_BANNER]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&BOTTOM_BANNER].original_sizes, [BOTTOM_BANNER, PPD].into());
    }

    #[test]
    fn test_richmedia_drops_unsupported_platform_sizes() {
        let c = consolidator(LineFlavor::RichMedia, &["MWEB"]);
        // 300x250 richmedia is WEB-only, 320x100 is MWEB-only
        let groups = c.build_size_groups(&[MREC, PPD]);
        assert!(!groups.contains_key(&MREC));
        let filter = &groups[&BOTTOM_BANNER];
        assert_eq!(filter.original_sizes, [PPD].into());
        assert_eq!(filter.richmedia_platforms.as_deref(), Some(&["MWEB".to_string()][..]));
    }

    // 2. Display names ------------------------------------------------------

    #[test]
    fn test_display_names_per_flavor() {
        let std = consolidator(LineFlavor::Standard, &[]);
        let rm = consolidator(LineFlavor::RichMedia, &[]);
        assert_eq!(std.display_name(PPD), "Mweb_PPD");
        assert_eq!(rm.display_name(MREC), "Mrec_ex");
        assert_eq!(rm.display_name(TOWER), "Tower_ex");
        assert_eq!(std.display_name(MREC), "300x250");
    }

    // 3. Consolidation ------------------------------------------------------

    #[test]
    fn test_placeholder_per_original_size_with_matching_targeting() {
        let c = consolidator(LineFlavor::Standard, &[]);
        let mut map = BTreeMap::new();
        map.insert(BOTTOM_BANNER, group(&[1, 2], &[BOTTOM_BANNER, PPD]));

        let (placeholders, targetings) = c.consolidate(&map, false);
        // one per original size plus no 320x50 companion (explicit 320x50 exists)
        assert_eq!(placeholders.len(), 2);
        assert_eq!(targetings.len(), 2);
        let names: Vec<_> = targetings.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"320x50"));
        assert!(names.contains(&"Mweb_PPD"));
    }

    #[test]
    fn test_wide_leaderboard_adds_untargeted_standard_leaderboard() {
        let c = consolidator(LineFlavor::Standard, &[]);
        let mut map = BTreeMap::new();
        map.insert(WIDE_LEADERBOARD, group(&[9], &[WIDE_LEADERBOARD]));

        let (placeholders, targetings) = c.consolidate(&map, false);
        let extras: Vec<_> = placeholders
            .iter()
            .filter(|p| p.size == LEADERBOARD)
            .collect();
        assert_eq!(extras.len(), 1);
        assert!(extras[0].targeting_name.is_none());
        assert!(targetings.iter().all(|t| t.name != "728x90"));
    }

    #[test]
    fn test_no_leaderboard_companion_when_explicitly_present() {
        let c = consolidator(LineFlavor::Standard, &[]);
        let mut map = BTreeMap::new();
        map.insert(WIDE_LEADERBOARD, group(&[9], &[WIDE_LEADERBOARD]));
        map.insert(LEADERBOARD, group(&[10], &[LEADERBOARD]));

        let (placeholders, _) = c.consolidate(&map, false);
        assert_eq!(
            placeholders.iter().filter(|p| p.size == LEADERBOARD).count(),
            1
        );
    }

    #[test]
    fn test_ppd_alone_gets_untargeted_bottom_banner_companion() {
        let c = consolidator(LineFlavor::Standard, &[]);
        let mut map = BTreeMap::new();
        map.insert(BOTTOM_BANNER, group(&[1], &[PPD]));

        let (placeholders, _) = c.consolidate(&map, false);
        let companions: Vec<_> = placeholders
            .iter()
            .filter(|p| p.size == BOTTOM_BANNER && p.targeting_name.is_none())
            .collect();
        assert_eq!(companions.len(), 1);
    }

    #[test]
    fn test_interstitial_injects_companion_placeholders() {
        let c = consolidator(LineFlavor::Standard, &[]);
        let mut map = BTreeMap::new();
        map.insert(LARGE_INTERSTITIAL, group(&[3], &[LARGE_INTERSTITIAL]));

        let (placeholders, _) = c.consolidate(&map, false);
        for size in INTERSTITIAL_COMPANIONS {
            assert!(placeholders
                .iter()
                .any(|p| p.size == size && p.targeting_name.is_none()));
        }
    }

    #[test]
    fn test_expando_pairs_mrec_placeholder_with_expando_targeting() {
        let c = consolidator(LineFlavor::Standard, &[]);
        let mut map = BTreeMap::new();
        map.insert(EXPANDO, group(&[41, 42], &[EXPANDO]));

        let (placeholders, targetings) = c.consolidate(&map, false);
        let expando_ph = placeholders
            .iter()
            .find(|p| p.targeting_name.as_deref() == Some("Mrec Expando"))
            .unwrap();
        assert_eq!(expando_ph.size, MREC);
        let expando_t = targetings.iter().find(|t| t.name == "Mrec Expando").unwrap();
        assert_eq!(expando_t.targeted_ids, [41, 42].into());
    }

    #[test]
    fn test_in_banner_video_forces_mrec_placeholder() {
        let c = consolidator(LineFlavor::Standard, &[]);
        let mut map = BTreeMap::new();
        map.insert(BOTTOM_BANNER, group(&[1], &[BOTTOM_BANNER]));

        let (placeholders, _) = c.consolidate(&map, true);
        assert!(placeholders
            .iter()
            .any(|p| p.size == MREC && p.targeting_name.is_none()));

        // not forced when an MREC bucket already exists
        map.insert(MREC, group(&[2], &[MREC]));
        let (placeholders, _) = c.consolidate(&map, true);
        assert_eq!(placeholders.iter().filter(|p| p.size == MREC).count(), 1);
    }
}
