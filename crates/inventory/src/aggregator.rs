//! Fetches and merges inventory ids across the partitioned directory
//! sources.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use linehaul_core::config::DirectoryConfig;
use linehaul_core::error::{AssemblyError, AssemblyResult};
use linehaul_core::types::{AdSize, PlacementGroup};

use crate::directory::{DirectorySource, PlacementDirectory, SizeFilter};
use crate::sites;

/// Aggregates placement ids from every directory source relevant to the
/// requested sites, keyed by canonical size.
pub struct PlacementAggregator {
    directory: Arc<dyn PlacementDirectory>,
    config: DirectoryConfig,
}

impl PlacementAggregator {
    pub fn new(directory: Arc<dyn PlacementDirectory>, config: DirectoryConfig) -> Self {
        Self { directory, config }
    }

    /// Fetch from each partition's sheet and merge by set union. Sizes left
    /// with zero ids are dropped; an entirely empty result is a hard
    /// failure since the line cannot be created without inventory.
    pub async fn fetch_and_merge(
        &self,
        site_filter: &[String],
        platforms: &[String],
        size_filters: &BTreeMap<AdSize, SizeFilter>,
        custom_sheet_name: Option<&str>,
    ) -> AssemblyResult<BTreeMap<AdSize, PlacementGroup>> {
        let expanded = sites::expand_site_filter(site_filter);
        let partitions = sites::partition_sites(&expanded);
        info!(sites = ?expanded, ?platforms, partitions = partitions.len(), "aggregating placements");

        let mut merged: BTreeMap<AdSize, PlacementGroup> = BTreeMap::new();
        for (partition, group_sites) in &partitions {
            let source = DirectorySource {
                sheet_url: self.config.sheet_url.clone(),
                sheet_name: custom_sheet_name
                    .unwrap_or_else(|| partition.sheet_name(&self.config))
                    .to_string(),
            };
            debug!(?partition, sheet = %source.sheet_name, sites = ?group_sites, "fetching placements");

            let fetched = self
                .directory
                .fetch_placement_ids(&source, group_sites, platforms, size_filters)
                .await?;

            for (size, group) in fetched {
                merged
                    .entry(size)
                    .and_modify(|existing| existing.merge(&group))
                    .or_insert(group);
            }
        }

        // A directory row can come back without its pre-alias sizes; restore
        // them from the filters that drove the fetch.
        for (size, group) in merged.iter_mut() {
            if let Some(filter) = size_filters.get(size) {
                if group.original_sizes.is_empty() {
                    group.original_sizes = filter.original_sizes.clone();
                }
            }
            if group.original_sizes.is_empty() {
                group.original_sizes.insert(*size);
            }
        }

        merged.retain(|size, group| {
            if group.placement_ids.is_empty() {
                warn!(%size, "no placement ids from any source, dropping size");
                false
            } else {
                true
            }
        });

        if merged.is_empty() {
            warn!("no inventory found in any directory source");
            return Err(AssemblyError::NoInventoryFound);
        }

        info!(sizes = merged.len(), "placement aggregation complete");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use linehaul_core::types::TargetingType;
    use parking_lot::Mutex;

    /// Directory fake returning a canned map per sheet name and recording
    /// each fetch.
    #[derive(Default)]
    struct FakeDirectory {
        by_sheet: BTreeMap<String, BTreeMap<AdSize, PlacementGroup>>,
        fetches: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl FakeDirectory {
        fn with_sheet(mut self, sheet: &str, rows: &[(AdSize, &[u64])]) -> Self {
            let map = rows
                .iter()
                .map(|(size, ids)| {
                    (
                        *size,
                        PlacementGroup {
                            placement_ids: ids.iter().copied().collect(),
                            original_sizes: [*size].into(),
                            targeting_type: TargetingType::Placement,
                        },
                    )
                })
                .collect();
            self.by_sheet.insert(sheet.to_string(), map);
            self
        }
    }

    #[async_trait]
    impl PlacementDirectory for FakeDirectory {
        async fn fetch_placement_ids(
            &self,
            source: &DirectorySource,
            site_codes: &[String],
            _platforms: &[String],
            _size_filters: &BTreeMap<AdSize, SizeFilter>,
        ) -> AssemblyResult<BTreeMap<AdSize, PlacementGroup>> {
            self.fetches
                .lock()
                .push((source.sheet_name.clone(), site_codes.to_vec()));
            Ok(self
                .by_sheet
                .get(&source.sheet_name)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn aggregator(directory: FakeDirectory) -> PlacementAggregator {
        PlacementAggregator::new(Arc::new(directory), DirectoryConfig::default())
    }

    fn sites(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn filter_for(size: AdSize) -> BTreeMap<AdSize, SizeFilter> {
        let mut filters = BTreeMap::new();
        filters.insert(
            size,
            SizeFilter {
                original_sizes: [size].into(),
                ..Default::default()
            },
        );
        filters
    }

    const MREC: AdSize = AdSize::new(300, 250);

    #[tokio::test]
    async fn test_merges_ids_across_partitions() {
        let directory = FakeDirectory::default()
            .with_sheet("TOI + ETIMES", &[(MREC, &[1, 2])])
            .with_sheet("ALL LANGUAGES", &[(MREC, &[2, 3])]);
        let agg = aggregator(directory);

        let merged = agg
            .fetch_and_merge(&sites(&["TOI", "NBT"]), &sites(&["WEB"]), &filter_for(MREC), None)
            .await
            .unwrap();
        assert_eq!(merged[&MREC].placement_ids, [1, 2, 3].into());
    }

    #[tokio::test]
    async fn test_custom_sheet_overrides_every_partition() {
        let directory = FakeDirectory::default().with_sheet("CAN_PSBK", &[(MREC, &[7])]);
        let fetches = Arc::new(directory);
        let agg =
            PlacementAggregator::new(fetches.clone(), DirectoryConfig::default());

        let merged = agg
            .fetch_and_merge(
                &sites(&["TOI", "language"]),
                &sites(&["MWEB"]),
                &filter_for(MREC),
                Some("CAN_PSBK"),
            )
            .await
            .unwrap();
        assert_eq!(merged[&MREC].placement_ids, [7].into());
        let recorded = fetches.fetches.lock();
        assert!(recorded.iter().all(|(sheet, _)| sheet == "CAN_PSBK"));
        assert_eq!(recorded.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_sizes_are_dropped() {
        let directory = FakeDirectory::default()
            .with_sheet("ALL LANGUAGES", &[(MREC, &[5]), (AdSize::new(728, 90), &[])]);
        let agg = aggregator(directory);

        let mut filters = filter_for(MREC);
        filters.extend(filter_for(AdSize::new(728, 90)));

        let merged = agg
            .fetch_and_merge(&sites(&["NBT"]), &sites(&["WEB"]), &filters, None)
            .await
            .unwrap();
        assert_eq!(merged.len(), 1);
        assert!(merged.contains_key(&MREC));
    }

    #[tokio::test]
    async fn test_no_inventory_anywhere_is_fatal() {
        let agg = aggregator(FakeDirectory::default());
        let err = agg
            .fetch_and_merge(&sites(&["NBT"]), &sites(&["WEB"]), &filter_for(MREC), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::NoInventoryFound));
    }

    #[tokio::test]
    async fn test_original_sizes_restored_from_filters() {
        let mut rows = BTreeMap::new();
        rows.insert(
            MREC,
            PlacementGroup {
                placement_ids: [9].into(),
                original_sizes: Default::default(),
                targeting_type: TargetingType::Placement,
            },
        );
        let mut directory = FakeDirectory::default();
        directory.by_sheet.insert("ALL LANGUAGES".to_string(), rows);
        let agg = aggregator(directory);

        let mut filters = BTreeMap::new();
        filters.insert(
            MREC,
            SizeFilter {
                original_sizes: [AdSize::new(320, 100), MREC].into(),
                ..Default::default()
            },
        );

        let merged = agg
            .fetch_and_merge(&sites(&["NBT"]), &sites(&["WEB"]), &filters, None)
            .await
            .unwrap();
        assert_eq!(
            merged[&MREC].original_sizes,
            [AdSize::new(320, 100), MREC].into()
        );
    }
}
