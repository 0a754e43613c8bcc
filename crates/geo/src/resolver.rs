//! Hierarchical geo name resolution with auto-select disambiguation.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use linehaul_core::error::{AssemblyError, AssemblyResult};
use linehaul_core::types::{GeoMatch, GeoType};

use crate::directory::{
    GeoDirectory, NOISE_COUNTRY_CODE, PRIMARY_COUNTRY_CODE, SECONDARY_COUNTRY_CODE,
};
use crate::tables;

/// Record of one automatic selection among multiple directory matches.
/// Raised as a follow-up flag, never as a blocker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoAutoSelection {
    pub input: String,
    pub candidates: Vec<GeoMatch>,
    pub selected: GeoMatch,
    /// True when more than two candidates exist or the base name is in the
    /// known-ambiguous set; such selections need CSM confirmation.
    pub requires_confirmation: bool,
}

/// Resolves a human-entered location name to a platform geo id.
///
/// The directory is queried level by level (country, region, city,
/// sub-district); the first level yielding any match wins and no lower
/// level is consulted. Ambiguity is resolved by country preference, then a
/// state hint if the caller supplied one, then auto-select-first with a
/// recorded [`GeoAutoSelection`].
pub struct GeoResolver {
    directory: Arc<dyn GeoDirectory>,
    auto_selections: Mutex<Vec<GeoAutoSelection>>,
}

impl GeoResolver {
    pub fn new(directory: Arc<dyn GeoDirectory>) -> Self {
        Self {
            directory,
            auto_selections: Mutex::new(Vec::new()),
        }
    }

    /// Resolve `"Base"` or `"Base, State"` to a geo id.
    pub async fn resolve(&self, location: &str) -> AssemblyResult<u64> {
        let (base, state_hint) = split_location(location);
        info!(location, base, ?state_hint, "resolving geo location");

        for level in GeoType::LOOKUP_ORDER {
            // The noise-country filter applies below the country level only.
            let exclude = match level {
                GeoType::Country => None,
                _ => Some(NOISE_COUNTRY_CODE),
            };

            let matches = match self.directory.query(base, level, exclude).await {
                Ok(matches) => matches,
                Err(err) => {
                    warn!(base, ?level, %err, "geo directory query failed, trying next level");
                    continue;
                }
            };
            if matches.is_empty() {
                continue;
            }

            let preferred = prefer_by_country(matches);

            if preferred.len() > 1 {
                if let Some(hint) = state_hint {
                    if let Some(selected) = self.disambiguate_by_parent(&preferred, hint).await {
                        info!(base, id = selected.id, "state hint resolved ambiguity");
                        return Ok(selected.id);
                    }
                    warn!(base, hint, "state hint did not disambiguate, falling through");
                }
                return Ok(self.auto_select(base, preferred).await);
            }

            let only = &preferred[0];
            info!(base, ?level, id = only.id, country = %only.country_code, "resolved geo location");
            return Ok(only.id);
        }

        warn!(location, "no matching location at any level");
        Err(AssemblyError::LocationNotFound(location.to_string()))
    }

    /// Auto-selections recorded so far, draining the internal buffer. The
    /// caller surfaces these in its run summary.
    pub fn take_auto_selections(&self) -> Vec<GeoAutoSelection> {
        std::mem::take(&mut self.auto_selections.lock())
    }

    async fn disambiguate_by_parent(
        &self,
        candidates: &[GeoMatch],
        hint: &str,
    ) -> Option<GeoMatch> {
        for candidate in candidates {
            let parent = match self.directory.parent_region_name(candidate.id).await {
                Ok(parent) => parent,
                Err(err) => {
                    warn!(id = candidate.id, %err, "parent region lookup failed");
                    continue;
                }
            };
            if let Some(parent) = parent {
                if tables::parent_matches_hint(&parent, hint) {
                    let mut selected = candidate.clone();
                    selected.parent_region_name = Some(parent);
                    return Some(selected);
                }
            }
        }
        None
    }

    /// Auto-select policy: take the first match in directory order, record
    /// the decision, and flag it for confirmation when the ambiguity is
    /// severe.
    async fn auto_select(&self, base: &str, mut candidates: Vec<GeoMatch>) -> u64 {
        for candidate in &mut candidates {
            if candidate.parent_region_name.is_none() {
                candidate.parent_region_name = self
                    .directory
                    .parent_region_name(candidate.id)
                    .await
                    .ok()
                    .flatten();
            }
        }

        let requires_confirmation =
            candidates.len() > 2 || tables::is_ambiguous_location(base);
        let selected = candidates[0].clone();

        warn!(
            base,
            matches = candidates.len(),
            selected_id = selected.id,
            selected_name = %selected.name,
            requires_confirmation,
            "multiple geo locations found, using first match"
        );

        self.auto_selections.lock().push(GeoAutoSelection {
            input: base.to_string(),
            candidates,
            selected: selected.clone(),
            requires_confirmation,
        });
        selected.id
    }
}

/// Split `"Base, State"` into base name and optional state hint.
fn split_location(location: &str) -> (&str, Option<&str>) {
    match location.split_once(',') {
        Some((base, state)) => (base.trim(), Some(state.trim()).filter(|s| !s.is_empty())),
        None => (location.trim(), None),
    }
}

/// Prefer primary-country matches, then secondary-country, else keep all.
fn prefer_by_country(matches: Vec<GeoMatch>) -> Vec<GeoMatch> {
    let primary: Vec<GeoMatch> = matches
        .iter()
        .filter(|m| m.country_code == PRIMARY_COUNTRY_CODE)
        .cloned()
        .collect();
    if !primary.is_empty() {
        return primary;
    }
    let secondary: Vec<GeoMatch> = matches
        .iter()
        .filter(|m| m.country_code == SECONDARY_COUNTRY_CODE)
        .cloned()
        .collect();
    if !secondary.is_empty() {
        return secondary;
    }
    matches
}
