//! Per-size creative creation against the ad server, with template
//! selection and tag transformation.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use linehaul_core::api::{AdServerApi, CreativeRequest};
use linehaul_core::error::{AssemblyError, AssemblyResult};
use linehaul_core::types::{AdSize, LineFlavor};

use crate::assets::{AssetFile, AssetKind};
use crate::consolidate::{MREC, PPD, TOWER};
use crate::tags::{self, TagPayload};

/// Narrow slug banner, any payload.
pub const TEMPLATE_PPD: u64 = 12_363_950;
/// Rich-media mrec.
pub const TEMPLATE_RICHMEDIA_MREC: u64 = 12_460_223;
/// Rich-media tower.
pub const TEMPLATE_RICHMEDIA_TOWER: u64 = 12_443_458;
/// In-banner video.
pub const TEMPLATE_IN_BANNER_VIDEO: u64 = 12_344_286;
/// Impression/click pair, and the image default when a landing target
/// exists.
pub const TEMPLATE_IMPRESSION_CLICK: u64 = 12_330_939;
/// Script-bearing and HTML creatives.
pub const TEMPLATE_RICH: u64 = 12_435_443;
/// Image default when no landing target exists.
pub const TEMPLATE_IMAGE_NO_LANDING: u64 = 12_399_020;

/// Default template for plain image creatives.
pub fn default_template(has_landing_target: bool) -> u64 {
    if has_landing_target {
        TEMPLATE_IMPRESSION_CLICK
    } else {
        TEMPLATE_IMAGE_NO_LANDING
    }
}

/// Template choice: total over (size, flavor, payload kind). Size and
/// flavor specials outrank the payload.
pub fn select_template(
    size: AdSize,
    flavor: LineFlavor,
    payload: Option<&TagPayload>,
    has_in_banner_video: bool,
    asset_kind: Option<AssetKind>,
    default: u64,
) -> u64 {
    if size == PPD {
        return TEMPLATE_PPD;
    }
    if size == MREC && flavor.is_rich_media() {
        return TEMPLATE_RICHMEDIA_MREC;
    }
    if size == TOWER && flavor.is_rich_media() {
        return TEMPLATE_RICHMEDIA_TOWER;
    }
    if has_in_banner_video && size == MREC {
        return TEMPLATE_IN_BANNER_VIDEO;
    }
    match payload {
        Some(TagPayload::ImpressionClickPair { .. }) => TEMPLATE_IMPRESSION_CLICK,
        Some(TagPayload::DoubleclickTag(_)) | Some(TagPayload::JavascriptTag(_)) => TEMPLATE_RICH,
        None => match asset_kind {
            Some(AssetKind::Html) => TEMPLATE_RICH,
            _ => default,
        },
    }
}

/// Immutable per-run inputs for creative creation.
#[derive(Debug, Clone, Default)]
pub struct CreativeContext {
    pub order_id: u64,
    pub line_item_id: u64,
    pub flavor: LineFlavor,
    pub destination_url: String,
    pub landing_page: String,
    pub impression_tracker: String,
    pub script_tracker: String,
    pub in_banner_video: String,
    pub external_campaign_id: String,
    pub default_template: u64,
}

impl CreativeContext {
    fn has_in_banner_video(&self) -> bool {
        !self.in_banner_video.trim().is_empty()
    }

    fn base_request(&self, size: AdSize, template_id: u64) -> CreativeRequest {
        CreativeRequest {
            destination_url: self.destination_url.clone(),
            landing_page: self.landing_page.clone(),
            impression_url: self.impression_tracker.clone(),
            script_markup: self.script_tracker.clone(),
            external_campaign_id: self.external_campaign_id.clone(),
            ..CreativeRequest::new(self.order_id, self.line_item_id, size, template_id)
        }
    }
}

/// Creates creatives for one consolidated size, one call per size within a
/// variant run. The caller passes the run's single created-sizes set so a
/// size reached from several buckets is only built once.
pub struct CreativeTagDispatcher {
    api: Arc<dyn AdServerApi>,
}

impl CreativeTagDispatcher {
    pub fn new(api: Arc<dyn AdServerApi>) -> Self {
        Self { api }
    }

    pub async fn create_for_size(
        &self,
        ctx: &CreativeContext,
        size: AdSize,
        payloads: &[TagPayload],
        assets: &[AssetFile],
        created_sizes: &mut BTreeSet<AdSize>,
    ) -> AssemblyResult<Vec<u64>> {
        if created_sizes.contains(&size) {
            debug!(%size, "creatives already created for size, skipping");
            return Ok(Vec::new());
        }

        let created = if ctx.has_in_banner_video() && size == MREC {
            self.create_in_banner_video(ctx, size).await?
        } else if !payloads.is_empty() {
            let mut ids = Vec::new();
            for payload in payloads {
                ids.extend(self.create_from_payload(ctx, size, payload).await?);
            }
            ids
        } else {
            self.create_from_asset(ctx, size, assets.first()).await?
        };

        created_sizes.insert(size);
        info!(%size, creatives = created.len(), "creatives created");
        Ok(created)
    }

    async fn create_in_banner_video(
        &self,
        ctx: &CreativeContext,
        size: AdSize,
    ) -> AssemblyResult<Vec<u64>> {
        let template = select_template(size, ctx.flavor, None, true, None, ctx.default_template);
        let mut request = ctx.base_request(size, template);
        request.video_url = ctx.in_banner_video.clone();
        self.api.create_creatives(&request).await
    }

    async fn create_from_payload(
        &self,
        ctx: &CreativeContext,
        size: AdSize,
        payload: &TagPayload,
    ) -> AssemblyResult<Vec<u64>> {
        let template = select_template(
            size,
            ctx.flavor,
            Some(payload),
            ctx.has_in_banner_video(),
            None,
            ctx.default_template,
        );
        let mut request = ctx.base_request(size, template);

        match payload {
            TagPayload::ImpressionClickPair { impression, click } => {
                request.impression_url = tags::extract_impression_url(impression);
                request.landing_page = tags::normalize_cachebuster(click);
                request.script_markup.clear();
            }
            TagPayload::DoubleclickTag(tag) => {
                request.script_markup = tags::inject_dcm_click_tracker(tag);
            }
            TagPayload::JavascriptTag(tag) => {
                request.script_markup = if tags::has_noscript_anchor(tag) {
                    tags::inject_click_macro_into_href(tag)
                } else {
                    tag.clone()
                };
            }
        }
        self.api.create_creatives(&request).await
    }

    async fn create_from_asset(
        &self,
        ctx: &CreativeContext,
        size: AdSize,
        asset: Option<&AssetFile>,
    ) -> AssemblyResult<Vec<u64>> {
        let asset_kind = asset.map(|a| a.kind);
        if asset.is_none()
            && ctx.destination_url.trim().is_empty()
            && ctx.landing_page.trim().is_empty()
            && ctx.script_tracker.trim().is_empty()
            && ctx.impression_tracker.trim().is_empty()
        {
            return Err(AssemblyError::TemplateMismatch {
                size,
                detail: "no tag, asset, or tracker to build a creative from".to_string(),
            });
        }

        let template = select_template(
            size,
            ctx.flavor,
            None,
            ctx.has_in_banner_video(),
            asset_kind,
            ctx.default_template,
        );
        let mut request = ctx.base_request(size, template);
        if let Some(asset) = asset {
            request.asset_path = asset.path.display().to_string();
        }
        self.api.create_creatives(&request).await
    }
}
