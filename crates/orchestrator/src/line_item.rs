//! One line item end to end: geo targeting, inventory, submission, and the
//! per-size creative loop.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use linehaul_core::api::AdServerApi;
use linehaul_core::config::AssemblyConfig;
use linehaul_core::error::{AssemblyError, AssemblyResult};
use linehaul_core::types::{
    AdSize, CampaignInput, CampaignVariantResult, CreativePlaceholder, CreativeTargeting,
    GeoTargetingClause, InventoryTargeting, LineFlavor, LineItemRequest, LineTargeting,
    LineVariant, Money, PlacementGroup, Schedule, StartTime, TargetingSet, TargetingType,
    OPERATING_TIME_ZONE,
};
use linehaul_creative::assets::{self, AssetFile};
use linehaul_creative::consolidate::{SizeGroupConsolidator, MREC};
use linehaul_creative::dispatcher::{default_template, CreativeContext, CreativeTagDispatcher};
use linehaul_creative::presets;
use linehaul_creative::tags::{self, TagTable};
use linehaul_geo::directory::GeoDirectory;
use linehaul_geo::policy::GeoTargetingPolicy;
use linehaul_geo::resolver::{GeoAutoSelection, GeoResolver};
use linehaul_inventory::aggregator::PlacementAggregator;
use linehaul_inventory::directory::PlacementDirectory;
use linehaul_inventory::{nwp, sites};

/// Creates one line-item variant: targeting, inventory, submission, and
/// creatives. Holds no per-run state; every run owns its targeting set,
/// placement map, and created-sizes tracker.
pub struct LineItemOrchestrator {
    api: Arc<dyn AdServerApi>,
    resolver: Arc<GeoResolver>,
    geo_policy: GeoTargetingPolicy,
    aggregator: PlacementAggregator,
    dispatcher: CreativeTagDispatcher,
    config: AssemblyConfig,
}

impl LineItemOrchestrator {
    pub fn new(
        api: Arc<dyn AdServerApi>,
        geo_directory: Arc<dyn GeoDirectory>,
        placement_directory: Arc<dyn PlacementDirectory>,
        config: AssemblyConfig,
    ) -> Self {
        let resolver = Arc::new(GeoResolver::new(geo_directory));
        Self {
            geo_policy: GeoTargetingPolicy::new(resolver.clone()),
            aggregator: PlacementAggregator::new(
                placement_directory,
                config.directories.clone(),
            ),
            dispatcher: CreativeTagDispatcher::new(api.clone()),
            api,
            resolver,
            config,
        }
    }

    /// Geo auto-selections recorded across runs so far, for the caller's
    /// run summary.
    pub fn take_geo_auto_selections(&self) -> Vec<GeoAutoSelection> {
        self.resolver.take_auto_selections()
    }

    pub async fn create_line(
        &self,
        variant: LineVariant,
        input: &CampaignInput,
        impressions: u64,
        tag_table: &TagTable,
    ) -> AssemblyResult<CampaignVariantResult> {
        let line_name = format!("{}{}", input.line_name.trim(), variant.name_suffix());
        let flavor = LineFlavor::detect(&input.line_name);
        info!(%variant, name = %line_name, ?flavor, impressions, "creating line item");

        self.check_existing_name(&line_name).await;

        let targeting = self
            .geo_policy
            .build_targeting(variant, &input.geo_locations)
            .await?;

        let detected_assets =
            assets::scan_assets(Path::new(&self.config.assets.creatives_folder))?;

        let platforms = input.normalized_platforms();
        let consolidator = SizeGroupConsolidator::new(flavor, platforms.clone());
        let placement_map = self
            .placement_map(variant, input, &platforms, &consolidator, tag_table, &detected_assets)
            .await?;

        let use_in_banner_video = input.has_in_banner_video() && variant != LineVariant::Nwp;
        let (placeholders, targetings) =
            consolidator.consolidate(&placement_map, use_in_banner_video);

        let request = self.build_request(
            line_name.clone(),
            input,
            impressions,
            targeting,
            &placement_map,
            placeholders,
            targetings,
        )?;

        let line_item_id = match self.api.create_line_item(&request).await {
            Ok(id) => id,
            Err(err @ AssemblyError::DuplicateObject { .. }) => {
                warn!(
                    name = %line_name,
                    name_len = line_name.len(),
                    name_prefix = name_prefix(&line_name, 40),
                    "ad server rejected line item name as duplicate"
                );
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        info!(line_item_id, name = %line_name, "line item created");

        let (creative_ids, creative_errors) = self
            .create_creatives(variant, input, flavor, line_item_id, &placement_map, tag_table, &detected_assets)
            .await;

        Ok(CampaignVariantResult {
            variant,
            line_item_id,
            creative_ids,
            error: if creative_errors.is_empty() {
                None
            } else {
                Some(creative_errors.join("; "))
            },
        })
    }

    /// Exact-name pre-check plus a fragment scan, both purely diagnostic:
    /// the name is used as-is either way and the ad server remains the
    /// authority on true duplicates.
    async fn check_existing_name(&self, line_name: &str) {
        match self.api.find_line_items_by_name(line_name).await {
            Ok(existing) if !existing.is_empty() => {
                warn!(
                    name = %line_name,
                    count = existing.len(),
                    "line item name already exists, submitting unchanged"
                );
                if let Ok(similar) = self.api.find_line_items_by_name_fragment(line_name).await {
                    for item in similar {
                        debug!(id = item.id, name = %item.name, order_id = item.order_id, "similar line item");
                    }
                }
            }
            Ok(_) => {}
            Err(err) => warn!(name = %line_name, %err, "name pre-check failed, continuing"),
        }
    }

    async fn placement_map(
        &self,
        variant: LineVariant,
        input: &CampaignInput,
        platforms: &[String],
        consolidator: &SizeGroupConsolidator,
        tag_table: &TagTable,
        detected_assets: &BTreeMap<AdSize, Vec<AssetFile>>,
    ) -> AssemblyResult<BTreeMap<AdSize, PlacementGroup>> {
        match variant {
            LineVariant::Nwp => {
                let mut map = nwp::ad_unit_map();
                map.retain(|size, _| detected_assets.contains_key(size));
                if map.is_empty() {
                    warn!("no creative files for any nwp size");
                    return Err(AssemblyError::NoCreativesFound);
                }
                Ok(map)
            }
            LineVariant::Psbk => {
                let mapped_sites = sites::map_psbk_sites(&input.sites);
                self.aggregator
                    .fetch_and_merge(
                        &mapped_sites,
                        platforms,
                        &sites::psbk_size_filters(),
                        Some(&self.config.directories.psbk_sheet),
                    )
                    .await
            }
            LineVariant::Standard => {
                let mut declared: Vec<AdSize> = if tag_table.is_empty() {
                    detected_assets.keys().copied().collect()
                } else {
                    tag_table.sizes().collect()
                };
                if declared.is_empty() {
                    // Nothing declared anywhere; fall back to the mrec
                    // bucket so trackers-only campaigns still get a line.
                    declared.push(MREC);
                }
                let size_filters = consolidator.build_size_groups(&declared);
                self.aggregator
                    .fetch_and_merge(
                        &input.sites,
                        platforms,
                        &size_filters,
                        input.custom_sheet_name.as_deref(),
                    )
                    .await
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_request(
        &self,
        name: String,
        input: &CampaignInput,
        impressions: u64,
        targeting: TargetingSet,
        placement_map: &BTreeMap<AdSize, PlacementGroup>,
        placeholders: Vec<CreativePlaceholder>,
        targetings: Vec<CreativeTargeting>,
    ) -> AssemblyResult<LineItemRequest> {
        let mut targeted_ids: BTreeSet<u64> = BTreeSet::new();
        let mut targeting_type = TargetingType::Placement;
        for group in placement_map.values() {
            targeted_ids.extend(group.placement_ids.iter().copied());
            targeting_type = group.targeting_type;
        }

        let geo = if targeting.is_empty() {
            None
        } else {
            Some(GeoTargetingClause {
                targeted_location_ids: targeting.included_geo_ids,
                excluded_location_ids: targeting.excluded_geo_ids,
            })
        };

        let request = LineItemRequest {
            name,
            order_id: input.order_id,
            targeting: LineTargeting {
                inventory: InventoryTargeting {
                    targeting_type,
                    targeted_ids,
                },
                geo,
            },
            creative_placeholders: placeholders,
            creative_targetings: targetings,
            schedule: build_schedule(input),
            cost_per_unit: Money::from_cpm(&input.currency(), input.cpm),
            goal_units: impressions,
            frequency_cap: (input.fcap > 0).then_some(input.fcap),
            allow_overbook: true,
            skip_inventory_check: true,
        };

        request
            .check_targeting_correspondence()
            .map_err(|detail| AssemblyError::Api(format!("targeting correspondence: {detail}")))?;
        Ok(request)
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_creatives(
        &self,
        variant: LineVariant,
        input: &CampaignInput,
        flavor: LineFlavor,
        line_item_id: u64,
        placement_map: &BTreeMap<AdSize, PlacementGroup>,
        tag_table: &TagTable,
        detected_assets: &BTreeMap<AdSize, Vec<AssetFile>>,
    ) -> (Vec<u64>, Vec<String>) {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let filled = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        let ctx = CreativeContext {
            order_id: input.order_id,
            line_item_id,
            flavor,
            destination_url: opt(&input.destination_url),
            // creatives without an explicit landing page click through to
            // the destination url
            landing_page: filled(&input.landing_page)
                .or_else(|| filled(&input.destination_url))
                .unwrap_or_default(),
            impression_tracker: tags::normalize_cachebuster(&opt(&input.impression_tracker)),
            script_tracker: filled(&input.script_tracker)
                .map(|t| tags::wrap_script_tracker(&t))
                .unwrap_or_default(),
            in_banner_video: if variant == LineVariant::Nwp {
                String::new()
            } else {
                opt(&input.in_banner_video)
            },
            external_campaign_id: opt(&input.external_campaign_id),
            default_template: default_template(input.has_landing_target()),
        };

        let mut created_sizes: BTreeSet<AdSize> = BTreeSet::new();
        let mut creative_ids = Vec::new();
        let mut errors = Vec::new();

        for (bucket, group) in placement_map {
            if group.placement_ids.is_empty() {
                continue;
            }
            for &original in &group.original_sizes {
                let payloads = tag_table.payloads_for(original);
                let size_assets = detected_assets
                    .get(&original)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                match self
                    .dispatcher
                    .create_for_size(&ctx, original, payloads, size_assets, &mut created_sizes)
                    .await
                {
                    Ok(ids) => creative_ids.extend(ids),
                    Err(err) => {
                        warn!(%original, %bucket, %err, "creative creation failed, skipping size");
                        errors.push(format!("{original}: {err}"));
                    }
                }
            }
        }

        // Tag sizes outside the placement map still get creatives as long
        // as they are recognized sizes; the untargeted placeholders added
        // during consolidation can serve them.
        for size in tag_table.sizes().collect::<Vec<_>>() {
            if created_sizes.contains(&size) || !presets::AVAILABLE_SIZES.contains(&size) {
                continue;
            }
            let payloads = tag_table.payloads_for(size);
            let size_assets = detected_assets
                .get(&size)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            match self
                .dispatcher
                .create_for_size(&ctx, size, payloads, size_assets, &mut created_sizes)
                .await
            {
                Ok(ids) => creative_ids.extend(ids),
                Err(err) => {
                    warn!(%size, %err, "creative creation failed for tag-only size");
                    errors.push(format!("{size}: {err}"));
                }
            }
        }

        (creative_ids, errors)
    }
}

/// Longest prefix of at most `max` bytes ending on a char boundary. Line
/// names come from operators and may carry multi-byte characters.
fn name_prefix(name: &str, max: usize) -> &str {
    let mut end = name.len().min(max);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Start immediately when no start date is given or it is not in the
/// future; otherwise start at the given time. A missing end date falls
/// back to end of the current year.
fn build_schedule(input: &CampaignInput) -> Schedule {
    let now = Local::now().naive_local();
    let start = match input.start_date {
        Some(start) if start > now => StartTime::At(start),
        _ => StartTime::Immediately,
    };
    let end = input.end_date.unwrap_or_else(|| default_end_of_year(now));
    Schedule {
        start,
        end,
        time_zone: OPERATING_TIME_ZONE.to_string(),
    }
}

fn default_end_of_year(now: NaiveDateTime) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(now.date().year(), 12, 31)
        .unwrap_or(now.date())
        .and_hms_opt(23, 59, 0)
        .unwrap_or(now)
}
