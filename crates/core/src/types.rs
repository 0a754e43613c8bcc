//! Shared domain types for the campaign assembly engine.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Time zone the ad server schedules line items in.
pub const OPERATING_TIME_ZONE: &str = "Asia/Kolkata";

// ---------------------------------------------------------------------------
// Sizes
// ---------------------------------------------------------------------------

/// A creative dimension, rendered on the wire as `"300x250"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdSize {
    pub width: u32,
    pub height: u32,
}

impl AdSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for AdSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAdSizeError(String);

impl fmt::Display for ParseAdSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ad size label: {}", self.0)
    }
}

impl std::error::Error for ParseAdSizeError {}

impl FromStr for AdSize {
    type Err = ParseAdSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| ParseAdSizeError(s.to_string()))?;
        let width = w.trim().parse().map_err(|_| ParseAdSizeError(s.to_string()))?;
        let height = h.trim().parse().map_err(|_| ParseAdSizeError(s.to_string()))?;
        Ok(Self { width, height })
    }
}

impl Serialize for AdSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AdSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SizeVisitor;

        impl Visitor<'_> for SizeVisitor {
            type Value = AdSize;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a size label like \"300x250\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<AdSize, E> {
                v.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(SizeVisitor)
    }
}

// ---------------------------------------------------------------------------
// Variants and flavors
// ---------------------------------------------------------------------------

/// One of the three correlated line items built per campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineVariant {
    Standard,
    Psbk,
    Nwp,
}

impl LineVariant {
    pub const ALL: [LineVariant; 3] = [LineVariant::Standard, LineVariant::Psbk, LineVariant::Nwp];

    /// Suffix appended to the caller-supplied base line name.
    pub fn name_suffix(&self) -> &'static str {
        match self {
            LineVariant::Standard => "",
            LineVariant::Psbk => "_psbk",
            LineVariant::Nwp => "_nwp",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LineVariant::Standard => "Standard line",
            LineVariant::Psbk => "PSBK line",
            LineVariant::Nwp => "NWP line",
        }
    }
}

impl fmt::Display for LineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineVariant::Standard => f.write_str("standard"),
            LineVariant::Psbk => f.write_str("psbk"),
            LineVariant::Nwp => f.write_str("nwp"),
        }
    }
}

/// Whether a line carries standard banners or rich media. Detected from the
/// line name unless the operator sets it explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineFlavor {
    #[default]
    Standard,
    RichMedia,
}

impl LineFlavor {
    pub fn detect(line_name: &str) -> Self {
        if line_name.to_uppercase().contains("RICHMEDIA") {
            LineFlavor::RichMedia
        } else {
            LineFlavor::Standard
        }
    }

    pub fn is_rich_media(&self) -> bool {
        matches!(self, LineFlavor::RichMedia)
    }
}

// ---------------------------------------------------------------------------
// Geo
// ---------------------------------------------------------------------------

/// Hierarchy levels in the platform's geographic directory, in query order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeoType {
    Country,
    Region,
    City,
    SubDistrict,
}

impl GeoType {
    pub const LOOKUP_ORDER: [GeoType; 4] = [
        GeoType::Country,
        GeoType::Region,
        GeoType::City,
        GeoType::SubDistrict,
    ];
}

/// One row returned by the platform's geographic directory. Immutable once
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoMatch {
    pub id: u64,
    pub name: String,
    pub geo_type: GeoType,
    pub country_code: String,
    pub parent_region_name: Option<String>,
}

/// Include/exclude geo target sets for a single line-item variant. Owned by
/// one orchestrator run; never shared or mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetingSet {
    pub included_geo_ids: BTreeSet<u64>,
    pub excluded_geo_ids: BTreeSet<u64>,
}

impl TargetingSet {
    pub fn is_empty(&self) -> bool {
        self.included_geo_ids.is_empty() && self.excluded_geo_ids.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// The two alternative inventory-targeting identifier kinds the platform
/// supports. A canonical size uses exactly one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetingType {
    #[default]
    Placement,
    AdUnit,
}

/// Inventory identifiers accumulated for one canonical size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroup {
    /// Placement ids, or ad-unit ids when `targeting_type` is `AdUnit`.
    pub placement_ids: BTreeSet<u64>,
    /// Pre-alias creative sizes that mapped into this canonical size.
    pub original_sizes: BTreeSet<AdSize>,
    pub targeting_type: TargetingType,
}

impl PlacementGroup {
    /// Set-union merge of another group contributing to the same canonical
    /// size. `placement_ids` never shrinks; `original_sizes` accumulates.
    pub fn merge(&mut self, other: &PlacementGroup) {
        self.placement_ids.extend(other.placement_ids.iter().copied());
        self.original_sizes.extend(other.original_sizes.iter().copied());
    }
}

// ---------------------------------------------------------------------------
// Line item request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativePlaceholder {
    /// Present only when a matching `CreativeTargeting` entry exists.
    pub targeting_name: Option<String>,
    pub size: AdSize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeTargeting {
    pub name: String,
    pub targeting_type: TargetingType,
    pub targeted_ids: BTreeSet<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTargeting {
    pub targeting_type: TargetingType,
    pub targeted_ids: BTreeSet<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoTargetingClause {
    pub targeted_location_ids: BTreeSet<u64>,
    pub excluded_location_ids: BTreeSet<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTargeting {
    pub inventory: InventoryTargeting,
    pub geo: Option<GeoTargetingClause>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartTime {
    /// Start serving as soon as the line is approved.
    Immediately,
    At(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub start: StartTime,
    pub end: NaiveDateTime,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub currency: String,
    pub micro_amount: i64,
}

impl Money {
    pub fn from_cpm(currency: &str, cpm: f64) -> Self {
        Self {
            currency: currency.to_string(),
            micro_amount: (cpm * 1_000_000.0) as i64,
        }
    }
}

/// Everything the ad server needs to create one line item. Built once per
/// variant and submitted exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub name: String,
    pub order_id: u64,
    pub targeting: LineTargeting,
    pub creative_placeholders: Vec<CreativePlaceholder>,
    pub creative_targetings: Vec<CreativeTargeting>,
    pub schedule: Schedule,
    pub cost_per_unit: Money,
    pub goal_units: u64,
    pub frequency_cap: Option<u32>,
    pub allow_overbook: bool,
    pub skip_inventory_check: bool,
}

impl LineItemRequest {
    /// Every placeholder carrying a targeting name must match exactly one
    /// entry in the targeting list, and no targeting may dangle. The remote
    /// platform enforces this correspondence; catching it locally turns a
    /// cryptic API fault into a clear error.
    pub fn check_targeting_correspondence(&self) -> Result<(), String> {
        for ph in &self.creative_placeholders {
            if let Some(name) = &ph.targeting_name {
                let count = self
                    .creative_targetings
                    .iter()
                    .filter(|t| &t.name == name)
                    .count();
                if count != 1 {
                    return Err(format!(
                        "placeholder '{name}' has {count} matching creative targetings, expected 1"
                    ));
                }
            }
        }
        for t in &self.creative_targetings {
            let used = self
                .creative_placeholders
                .iter()
                .any(|ph| ph.targeting_name.as_deref() == Some(t.name.as_str()));
            if !used {
                return Err(format!(
                    "creative targeting '{}' has no matching placeholder",
                    t.name
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Campaign input and results
// ---------------------------------------------------------------------------

const SUPPORTED_CURRENCIES: [&str; 4] = ["INR", "USD", "CAD", "AED"];

/// Operator-supplied campaign parameters, consumed read-only by every
/// variant run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignInput {
    pub order_id: u64,
    pub line_name: String,
    #[serde(default)]
    pub sites: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub geo_locations: Vec<String>,
    #[serde(default)]
    pub fcap: u32,
    #[serde(default)]
    pub currency: Option<String>,
    pub impressions: u64,
    pub cpm: f64,
    #[serde(default)]
    pub destination_url: Option<String>,
    #[serde(default)]
    pub landing_page: Option<String>,
    #[serde(default)]
    pub impression_tracker: Option<String>,
    #[serde(default)]
    pub script_tracker: Option<String>,
    #[serde(default)]
    pub in_banner_video: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub end_date: Option<NaiveDateTime>,
    /// External campaign id carried onto creatives for reconciliation.
    #[serde(default)]
    pub external_campaign_id: Option<String>,
    /// Overrides the partition's default directory sheet when set.
    #[serde(default)]
    pub custom_sheet_name: Option<String>,
}

impl CampaignInput {
    /// Currency canonicalized to the supported upper-case set, defaulting
    /// to INR.
    pub fn currency(&self) -> String {
        match &self.currency {
            Some(c) => {
                let code = c.trim().to_uppercase();
                if SUPPORTED_CURRENCIES.contains(&code.as_str()) {
                    code
                } else {
                    "INR".to_string()
                }
            }
            None => "INR".to_string(),
        }
    }

    /// Platform codes trimmed and upper-cased for consistent matching.
    pub fn normalized_platforms(&self) -> Vec<String> {
        self.platforms
            .iter()
            .map(|p| p.trim().to_uppercase())
            .filter(|p| !p.is_empty())
            .collect()
    }

    pub fn has_in_banner_video(&self) -> bool {
        self.in_banner_video
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
    }

    pub fn has_landing_target(&self) -> bool {
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        has(&self.landing_page) || has(&self.destination_url)
    }
}

/// Outcome of one variant's orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignVariantResult {
    pub variant: LineVariant,
    pub line_item_id: u64,
    pub creative_ids: Vec<u64>,
    /// Set when creative creation was partially skipped; line creation
    /// failures are reported as errors, not results.
    pub error: Option<String>,
}

/// Aggregated outcome of a full three-variant campaign build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignBuild {
    pub line_ids: Vec<u64>,
    pub creative_ids: Vec<u64>,
    pub variant_results: Vec<CampaignVariantResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1. Size parsing -------------------------------------------------------

    #[test]
    fn test_ad_size_round_trip() {
        let size: AdSize = "300x250".parse().unwrap();
        assert_eq!(size, AdSize::new(300, 250));
        assert_eq!(size.to_string(), "300x250");

        let upper: AdSize = " 728X90 ".parse().unwrap();
        assert_eq!(upper, AdSize::new(728, 90));

        assert!("banner".parse::<AdSize>().is_err());
        assert!("300x".parse::<AdSize>().is_err());
    }

    #[test]
    fn test_ad_size_serde_as_label() {
        let json = serde_json::to_string(&AdSize::new(320, 50)).unwrap();
        assert_eq!(json, "\"320x50\"");
        let back: AdSize = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AdSize::new(320, 50));
    }

    // 2. Variants ------------------------------------------------------------

    #[test]
    fn test_variant_suffixes() {
        assert_eq!(LineVariant::Standard.name_suffix(), "");
        assert_eq!(LineVariant::Psbk.name_suffix(), "_psbk");
        assert_eq!(LineVariant::Nwp.name_suffix(), "_nwp");
    }

    #[test]
    fn test_flavor_detection_from_name() {
        assert_eq!(
            LineFlavor::detect("Acme_RichMedia_Launch"),
            LineFlavor::RichMedia
        );
        assert_eq!(LineFlavor::detect("Acme_Banner_Launch"), LineFlavor::Standard);
    }

    // 3. Placement group merge ----------------------------------------------

    fn group(ids: &[u64], sizes: &[AdSize]) -> PlacementGroup {
        PlacementGroup {
            placement_ids: ids.iter().copied().collect(),
            original_sizes: sizes.iter().copied().collect(),
            targeting_type: TargetingType::Placement,
        }
    }

    #[test]
    fn test_merge_is_commutative_and_idempotent() {
        let a = group(&[1, 2], &[AdSize::new(300, 250)]);
        let b = group(&[2, 3], &[AdSize::new(320, 100)]);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        assert_eq!(ab.placement_ids, ba.placement_ids);
        assert_eq!(ab.original_sizes, ba.original_sizes);

        let mut aa = a.clone();
        aa.merge(&a);
        assert_eq!(aa, a);
    }

    #[test]
    fn test_merge_never_shrinks() {
        let mut acc = group(&[10, 11], &[AdSize::new(320, 50)]);
        let before = acc.placement_ids.clone();
        acc.merge(&group(&[], &[]));
        assert!(acc.placement_ids.is_superset(&before));
    }

    // 4. Targeting correspondence -------------------------------------------

    fn request_with(
        placeholders: Vec<CreativePlaceholder>,
        targetings: Vec<CreativeTargeting>,
    ) -> LineItemRequest {
        LineItemRequest {
            name: "L".to_string(),
            order_id: 1,
            targeting: LineTargeting {
                inventory: InventoryTargeting {
                    targeting_type: TargetingType::Placement,
                    targeted_ids: [1].into(),
                },
                geo: None,
            },
            creative_placeholders: placeholders,
            creative_targetings: targetings,
            schedule: Schedule {
                start: StartTime::Immediately,
                end: chrono::NaiveDate::from_ymd_opt(2026, 12, 31)
                    .unwrap()
                    .and_hms_opt(23, 59, 0)
                    .unwrap(),
                time_zone: OPERATING_TIME_ZONE.to_string(),
            },
            cost_per_unit: Money::from_cpm("INR", 120.0),
            goal_units: 1000,
            frequency_cap: None,
            allow_overbook: true,
            skip_inventory_check: true,
        }
    }

    #[test]
    fn test_correspondence_holds_for_matching_names() {
        let req = request_with(
            vec![CreativePlaceholder {
                targeting_name: Some("300x250".to_string()),
                size: AdSize::new(300, 250),
            }],
            vec![CreativeTargeting {
                name: "300x250".to_string(),
                targeting_type: TargetingType::Placement,
                targeted_ids: [5].into(),
            }],
        );
        assert!(req.check_targeting_correspondence().is_ok());
    }

    #[test]
    fn test_correspondence_rejects_dangling_targeting() {
        let req = request_with(
            vec![CreativePlaceholder {
                targeting_name: None,
                size: AdSize::new(728, 90),
            }],
            vec![CreativeTargeting {
                name: "ghost".to_string(),
                targeting_type: TargetingType::Placement,
                targeted_ids: [5].into(),
            }],
        );
        assert!(req.check_targeting_correspondence().is_err());
    }

    // 5. Campaign input normalization ---------------------------------------

    #[test]
    fn test_currency_whitelist() {
        let mut input = CampaignInput {
            currency: Some(" usd ".to_string()),
            ..Default::default()
        };
        assert_eq!(input.currency(), "USD");
        input.currency = Some("BTC".to_string());
        assert_eq!(input.currency(), "INR");
        input.currency = None;
        assert_eq!(input.currency(), "INR");
    }

    #[test]
    fn test_platform_normalization() {
        let input = CampaignInput {
            platforms: vec![" web ".to_string(), "Mweb".to_string(), "".to_string()],
            ..Default::default()
        };
        assert_eq!(input.normalized_platforms(), vec!["WEB", "MWEB"]);
    }
}
