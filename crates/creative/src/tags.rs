//! Creative-tag table and the macro/attribute injections applied to raw
//! vendor tags. Every injection is idempotent: a tag that already carries
//! the macro or attribute passes through unchanged.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use linehaul_core::types::AdSize;

/// Click macro expanded by the ad server at serve time.
pub const CLICK_MACRO: &str = "%%CLICK_URL_UNESC%%";
/// Cache-busting macro; vendor placeholders are rewritten to this.
pub const CACHEBUSTER_MACRO: &str = "%%CACHEBUSTER%%";

const DCM_CLICK_ATTR: &str = "data-dcm-click-tracker";

static DIMENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+x\d+)").unwrap());
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(<a\s+[^>]*?href=")([^"]*)""#).unwrap());
static DCM_BEFORE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(<ins|<div)([^>]*?)(\s+class=)").unwrap());
static DCM_AFTER_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(<ins|<div)(\s)").unwrap());
static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)src=["'](https?://[^"']+)["']"#).unwrap());

/// One creative tag ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagPayload {
    JavascriptTag(String),
    DoubleclickTag(String),
    ImpressionClickPair { impression: String, click: String },
}

/// One raw row from an uploaded tag table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRow {
    pub dimension: String,
    #[serde(default)]
    pub javascript_tag: Option<String>,
    #[serde(default)]
    pub impression_tag: Option<String>,
    #[serde(default)]
    pub click_tag: Option<String>,
}

/// Classified tags keyed by creative size. Absence of a table is a valid
/// mode; callers fall back to asset-file detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagTable {
    rows: BTreeMap<AdSize, Vec<TagPayload>>,
}

impl TagTable {
    /// Classify raw rows. An impression/click pair wins over a script tag
    /// on the same row; script tags are patched at ingestion so that the
    /// table only ever holds serve-ready markup.
    pub fn from_rows(rows: &[TagRow]) -> Self {
        let mut table: BTreeMap<AdSize, Vec<TagPayload>> = BTreeMap::new();
        for row in rows {
            let Some(size) = parse_dimension(&row.dimension) else {
                warn!(dimension = %row.dimension, "skipping tag row with unparseable dimension");
                continue;
            };

            let non_empty = |v: &Option<String>| {
                v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from)
            };

            if let (Some(impression), Some(click)) =
                (non_empty(&row.impression_tag), non_empty(&row.click_tag))
            {
                table.entry(size).or_default().push(TagPayload::ImpressionClickPair {
                    impression,
                    click,
                });
                debug!(%size, "classified impression/click pair");
                continue;
            }

            if let Some(mut js_tag) = non_empty(&row.javascript_tag) {
                // Tags shorter than this are column noise, not markup.
                if js_tag.len() <= 10 {
                    continue;
                }
                if has_noscript_anchor(&js_tag) {
                    js_tag = inject_click_macro_into_href(&js_tag);
                }
                if is_doubleclick(&js_tag) {
                    js_tag = inject_dcm_click_tracker(&js_tag);
                    table.entry(size).or_default().push(TagPayload::DoubleclickTag(js_tag));
                    debug!(%size, "classified doubleclick tag");
                } else {
                    table.entry(size).or_default().push(TagPayload::JavascriptTag(js_tag));
                    debug!(%size, "classified javascript tag");
                }
            }
        }
        Self { rows: table }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn payloads_for(&self, size: AdSize) -> &[TagPayload] {
        self.rows.get(&size).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sizes(&self) -> impl Iterator<Item = AdSize> + '_ {
        self.rows.keys().copied()
    }
}

fn parse_dimension(raw: &str) -> Option<AdSize> {
    let cleaned = DIMENSION_RE
        .find(raw)
        .map(|m| m.as_str())
        .unwrap_or_else(|| raw.trim());
    cleaned.parse().ok()
}

/// A structured ad-serving tag: vendor marker plus a container element.
pub fn is_doubleclick(tag: &str) -> bool {
    let lower = tag.to_lowercase();
    (lower.contains("dcmads") || lower.contains("data-dcm"))
        && (lower.contains("<ins") || lower.contains("<div"))
}

/// No-script fallback pattern common in third-party tags.
pub fn has_noscript_anchor(tag: &str) -> bool {
    let lower = tag.to_lowercase();
    lower.contains("<noscript>") && lower.contains("<a href")
}

/// Prepend the click macro to the anchor href. No-op when the macro is
/// already present or no href matches.
pub fn inject_click_macro_into_href(tag: &str) -> String {
    if tag.contains(CLICK_MACRO) {
        return tag.to_string();
    }
    HREF_RE
        .replace_all(tag, format!("${{1}}{CLICK_MACRO}${{2}}\""))
        .into_owned()
}

/// Ensure the container element carries the click-tracker attribute,
/// preferring insertion before an existing class attribute.
pub fn inject_dcm_click_tracker(tag: &str) -> String {
    if tag.contains(DCM_CLICK_ATTR) {
        return tag.to_string();
    }
    let attr = format!(" {DCM_CLICK_ATTR}='{CLICK_MACRO}'");
    let patched = DCM_BEFORE_CLASS_RE
        .replace(tag, format!("${{1}}${{2}}{attr}${{3}}"))
        .into_owned();
    if patched != tag {
        return patched;
    }
    DCM_AFTER_OPEN_RE
        .replace(tag, format!("${{1}}{attr}${{2}}"))
        .into_owned()
}

/// Rewrite vendor cache-busting placeholders to the server macro.
pub fn normalize_cachebuster(url: &str) -> String {
    url.replace("[timestamp]", CACHEBUSTER_MACRO)
        .replace("[CACHEBUSTER]", CACHEBUSTER_MACRO)
}

/// Hide an operator-supplied script tracker inside an invisible container
/// so it fires without rendering. Cache busters are normalized; markup
/// that already carries the hidden container passes through.
pub fn wrap_script_tracker(markup: &str) -> String {
    let normalized = normalize_cachebuster(markup);
    if normalized.contains("display:none") {
        return normalized;
    }
    format!("<div style=\"display:none;\">{normalized}</div>")
}

/// Reduce an image-pixel impression tag to its bare URL. Input without a
/// usable src attribute is treated as already being a bare URL. The cache
/// buster is normalized either way.
pub fn extract_impression_url(markup: &str) -> String {
    match IMG_SRC_RE.captures(markup) {
        Some(caps) => normalize_cachebuster(&caps[1]),
        None => normalize_cachebuster(markup),
    }
}
