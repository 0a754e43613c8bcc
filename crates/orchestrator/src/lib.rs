//! Orchestration: one line item per variant, three variants per campaign.

pub mod builder;
pub mod line_item;
pub mod retry;

pub use builder::MultiVariantCampaignBuilder;
pub use line_item::LineItemOrchestrator;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
