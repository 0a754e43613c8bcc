//! Site-code partitioning rules: which directory sheet serves which sites.

use std::collections::BTreeMap;

use linehaul_core::config::DirectoryConfig;
use linehaul_core::types::AdSize;

use crate::directory::SizeFilter;

/// Operator shorthand that expands to the full language-site list.
pub const ALL_LANGUAGES_TOKEN: &str = "ALL_Languages";

/// Site codes the shorthand expands to.
pub const LANGUAGE_SITES: [&str; 8] = [
    "IAG", "ITBANGLA", "MS", "MT", "NBT", "TLG", "TML", "VK",
];

/// Collapsed site code used for non-flagship sites on psbk lines.
pub const PSBK_LANGUAGE_SITE: &str = "language";

/// The three fixed site categories, each served by its own directory sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SitePartition {
    ToiEtimes,
    Et,
    Language,
}

impl SitePartition {
    /// Default sheet for this partition; a caller-supplied custom sheet
    /// name overrides all three.
    pub fn sheet_name<'a>(&self, config: &'a DirectoryConfig) -> &'a str {
        match self {
            SitePartition::ToiEtimes => &config.toi_sheet,
            SitePartition::Et => &config.et_sheet,
            SitePartition::Language => &config.language_sheet,
        }
    }

    fn of(site: &str) -> SitePartition {
        match site {
            "TOI" | "ETIMES" => SitePartition::ToiEtimes,
            "ET" => SitePartition::Et,
            _ => SitePartition::Language,
        }
    }
}

/// Replace the all-languages shorthand with the concrete site list,
/// preserving order and dropping duplicates.
pub fn expand_site_filter(sites: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    for site in sites {
        if site == ALL_LANGUAGES_TOKEN {
            for lang in LANGUAGE_SITES {
                if !expanded.iter().any(|s| s == lang) {
                    expanded.push(lang.to_string());
                }
            }
        } else if !expanded.iter().any(|s| s == site) {
            expanded.push(site.clone());
        }
    }
    expanded
}

/// Split an already-expanded site list into its partitions, keeping only
/// non-empty groups in fixed partition order.
pub fn partition_sites(sites: &[String]) -> Vec<(SitePartition, Vec<String>)> {
    let mut groups: BTreeMap<SitePartition, Vec<String>> = BTreeMap::new();
    for site in sites {
        groups
            .entry(SitePartition::of(site))
            .or_default()
            .push(site.clone());
    }
    groups.into_iter().collect()
}

/// Site mapping for psbk lines: flagship codes survive, everything else
/// collapses to the shared language code.
pub fn map_psbk_sites(sites: &[String]) -> Vec<String> {
    let mut mapped: Vec<String> = Vec::new();
    for site in sites {
        let code = match site.as_str() {
            "TOI" | "ET" => site.as_str(),
            _ => PSBK_LANGUAGE_SITE,
        };
        if !mapped.iter().any(|s| s == code) {
            mapped.push(code.to_string());
        }
    }
    mapped
}

/// Fixed size filters for psbk lines, independent of the operator's
/// declared sizes.
pub fn psbk_size_filters() -> BTreeMap<AdSize, SizeFilter> {
    let mut filters = BTreeMap::new();
    filters.insert(
        AdSize::new(300, 250),
        SizeFilter {
            adtype_filter: vec!["MREC_1".to_string(), "MREC".to_string()],
            section_filter: vec!["ROS".to_string()],
            original_sizes: [AdSize::new(300, 250)].into(),
            richmedia_platforms: None,
        },
    );
    filters.insert(
        AdSize::new(320, 50),
        SizeFilter {
            adtype_filter: vec!["BOTTOM OVERLAY".to_string()],
            section_filter: vec!["ROS".to_string()],
            original_sizes: [AdSize::new(320, 50)].into(),
            richmedia_platforms: None,
        },
    );
    filters.insert(
        AdSize::new(728, 90),
        SizeFilter {
            adtype_filter: vec!["LEADERBOARD".to_string()],
            section_filter: vec!["ROS".to_string()],
            original_sizes: [AdSize::new(728, 90)].into(),
            richmedia_platforms: None,
        },
    );
    filters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sites(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_all_languages_expands_in_place() {
        let expanded = expand_site_filter(&sites(&["TOI", "ALL_Languages", "NBT"]));
        assert_eq!(
            expanded,
            sites(&["TOI", "IAG", "ITBANGLA", "MS", "MT", "NBT", "TLG", "TML", "VK"])
        );
    }

    #[test]
    fn test_partition_covers_all_three_groups() {
        let groups = partition_sites(&sites(&["TOI", "ETIMES", "ET", "NBT", "VK"]));
        assert_eq!(
            groups,
            vec![
                (SitePartition::ToiEtimes, sites(&["TOI", "ETIMES"])),
                (SitePartition::Et, sites(&["ET"])),
                (SitePartition::Language, sites(&["NBT", "VK"])),
            ]
        );
    }

    #[test]
    fn test_partition_drops_empty_groups() {
        let groups = partition_sites(&sites(&["NBT"]));
        assert_eq!(groups, vec![(SitePartition::Language, sites(&["NBT"]))]);
    }

    #[test]
    fn test_psbk_mapping_collapses_non_flagship_sites() {
        let mapped = map_psbk_sites(&sites(&["TOI", "NBT", "VK", "ET", "ETIMES"]));
        assert_eq!(mapped, sites(&["TOI", "language", "ET"]));
    }

    #[test]
    fn test_psbk_size_filters_cover_fixed_buckets() {
        let filters = psbk_size_filters();
        assert_eq!(filters.len(), 3);
        assert!(filters.contains_key(&AdSize::new(300, 250)));
        assert!(filters.contains_key(&AdSize::new(320, 50)));
        assert!(filters.contains_key(&AdSize::new(728, 90)));
    }
}
