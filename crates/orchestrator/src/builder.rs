//! Three correlated line items per campaign, built sequentially with
//! retry-on-conflict.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use linehaul_core::config::RetryConfig;
use linehaul_core::error::{AssemblyError, AssemblyResult};
use linehaul_core::types::{CampaignBuild, CampaignInput, LineVariant};
use linehaul_creative::tags::TagTable;

use crate::line_item::LineItemOrchestrator;
use crate::retry::{RetryPolicy, Sleeper};

/// Impression split across standard / psbk / nwp. Round totals get exact
/// splits; everything else floors each part at one unit with psbk taking
/// the remainder.
pub fn split_impressions(total: u64) -> (u64, u64, u64) {
    match total {
        100 => (10, 80, 10),
        10 => (1, 8, 1),
        _ => {
            let standard = (total / 10).max(1);
            let mut psbk = (total * 8 / 10).max(1);
            let nwp = if total > standard + psbk {
                total - standard - psbk
            } else {
                1
            };
            if standard + psbk + nwp > total {
                psbk = (total.saturating_sub(standard + nwp)).max(1);
            }
            (standard, psbk, nwp)
        }
    }
}

/// Drives the three variant runs for one campaign. Execution is strictly
/// sequential with a pause between variants; the remote platform rejects
/// concurrent modifications against the same order.
pub struct MultiVariantCampaignBuilder {
    orchestrator: LineItemOrchestrator,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    inter_variant_delay: Duration,
}

impl MultiVariantCampaignBuilder {
    pub fn new(
        orchestrator: LineItemOrchestrator,
        retry_config: &RetryConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            orchestrator,
            retry: RetryPolicy::from_config(retry_config),
            sleeper,
            inter_variant_delay: Duration::from_millis(retry_config.inter_variant_delay_ms),
        }
    }

    pub fn orchestrator(&self) -> &LineItemOrchestrator {
        &self.orchestrator
    }

    /// Build all three variants. Succeeds only when all three lines exist;
    /// otherwise fails with an aggregate error that still carries the
    /// completed variants' results.
    pub async fn build_campaign(
        &self,
        input: &CampaignInput,
        tag_table: &TagTable,
    ) -> AssemblyResult<CampaignBuild> {
        let run_id = Uuid::new_v4();
        let (standard, psbk, nwp) = split_impressions(input.impressions);
        info!(
            %run_id,
            order_id = input.order_id,
            total = input.impressions,
            standard,
            psbk,
            nwp,
            "starting three-variant campaign build"
        );

        let plan = [
            (LineVariant::Standard, standard),
            (LineVariant::Psbk, psbk),
            (LineVariant::Nwp, nwp),
        ];

        let mut build = CampaignBuild::default();
        let mut failures = Vec::new();

        for (index, (variant, impressions)) in plan.into_iter().enumerate() {
            if index > 0 {
                self.sleeper.sleep(self.inter_variant_delay).await;
            }

            let attempt = self
                .retry
                .run(self.sleeper.as_ref(), || {
                    self.orchestrator
                        .create_line(variant, input, impressions, tag_table)
                })
                .await;

            match attempt {
                Ok(result) => {
                    info!(
                        %run_id,
                        %variant,
                        line_item_id = result.line_item_id,
                        creatives = result.creative_ids.len(),
                        "variant created"
                    );
                    build.line_ids.push(result.line_item_id);
                    build.creative_ids.extend(result.creative_ids.iter().copied());
                    build.variant_results.push(result);
                }
                Err(err) => {
                    let message = format!("Failed to create {}: {err}", variant.description());
                    error!(%run_id, %variant, %err, "variant failed");
                    failures.push(message);
                }
            }
        }

        let auto_selections = self.orchestrator.take_geo_auto_selections();
        for selection in &auto_selections {
            warn!(
                input = %selection.input,
                selected = %selection.selected.name,
                geo_id = selection.selected.id,
                requires_confirmation = selection.requires_confirmation,
                "geo location was auto-selected from multiple matches"
            );
        }

        if failures.is_empty() {
            info!(%run_id, lines = build.line_ids.len(), "campaign build complete");
            Ok(build)
        } else {
            Err(AssemblyError::PartialCampaignFailure {
                failures,
                completed: build.variant_results,
            })
        }
    }
}
