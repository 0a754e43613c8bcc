//! Narrow interface onto the remote ad-serving platform. The engine only
//! consumes the handful of operations below; credential/session bootstrap
//! and the full API surface live outside this workspace.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AssemblyResult;
use crate::types::{AdSize, LineItemRequest};

/// A line item returned by a name lookup, used for duplicate diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRef {
    pub id: u64,
    pub name: String,
    pub order_id: u64,
}

/// Everything needed to instantiate one creative from a platform template
/// and associate it with a line item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeRequest {
    pub order_id: u64,
    pub line_item_id: u64,
    pub size: AdSize,
    pub template_id: u64,
    pub destination_url: String,
    pub landing_page: String,
    pub impression_url: String,
    /// Script markup already wrapped/patched by the dispatcher.
    pub script_markup: String,
    pub video_url: String,
    /// Local asset file to upload, when the creative is file-backed.
    pub asset_path: String,
    /// External campaign id carried for reconciliation.
    pub external_campaign_id: String,
}

impl CreativeRequest {
    pub fn new(order_id: u64, line_item_id: u64, size: AdSize, template_id: u64) -> Self {
        Self {
            order_id,
            line_item_id,
            size,
            template_id,
            ..Default::default()
        }
    }
}

/// Operations the engine consumes from the ad-serving platform.
#[async_trait]
pub trait AdServerApi: Send + Sync {
    /// Submit a line item; returns the created line item id.
    async fn create_line_item(&self, request: &LineItemRequest) -> AssemblyResult<u64>;

    /// Create one or more creatives from a template and attach them to the
    /// line item named in the request.
    async fn create_creatives(&self, request: &CreativeRequest) -> AssemblyResult<Vec<u64>>;

    /// Exact-name lookup across all orders.
    async fn find_line_items_by_name(&self, name: &str) -> AssemblyResult<Vec<LineItemRef>>;

    /// Substring lookup, used strictly for duplicate diagnostics.
    async fn find_line_items_by_name_fragment(
        &self,
        fragment: &str,
    ) -> AssemblyResult<Vec<LineItemRef>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creative_request_constructor_fills_identity_fields_only() {
        let req = CreativeRequest::new(7, 8, AdSize::new(300, 250), 12_330_939);
        assert_eq!(req.order_id, 7);
        assert_eq!(req.line_item_id, 8);
        assert_eq!(req.size, AdSize::new(300, 250));
        assert_eq!(req.template_id, 12_330_939);
        assert!(req.script_markup.is_empty());
        assert!(req.asset_path.is_empty());
    }
}
