use thiserror::Error;

use crate::types::{AdSize, CampaignVariantResult};

pub type AssemblyResult<T> = Result<T, AssemblyError>;

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("No matching location found at any level for: {0}")]
    LocationNotFound(String),

    #[error("No placement ids found; inventory targeting is required for line item creation")]
    NoInventoryFound,

    #[error("No creatives detected in the asset folder and no valid tag table provided")]
    NoCreativesFound,

    #[error("Duplicate object rejected by the ad server for line item name '{name}'")]
    DuplicateObject { name: String },

    #[error("Concurrent modification rejected by the ad server: {0}")]
    ConcurrentModification(String),

    #[error("No creative template applies to size {size}: {detail}")]
    TemplateMismatch { size: AdSize, detail: String },

    #[error("{}", format_partial_failure(.failures))]
    PartialCampaignFailure {
        failures: Vec<String>,
        completed: Vec<CampaignVariantResult>,
    },

    #[error("Ad server API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn format_partial_failure(failures: &[String]) -> String {
    format!(
        "Only {} of 3 variant lines created successfully. Errors: {}",
        3usize.saturating_sub(failures.len()),
        failures.join("; ")
    )
}

impl AssemblyError {
    /// Classify a raw fault string from the remote platform into the
    /// matching error arm. `DUPLICATE_OBJECT` and `CONCURRENT_MODIFICATION`
    /// get dedicated arms because the orchestration layer treats them
    /// differently; everything else stays an opaque API error.
    pub fn from_remote_fault(fault: impl Into<String>, line_name: &str) -> Self {
        let fault = fault.into();
        if fault.contains("DUPLICATE_OBJECT") {
            AssemblyError::DuplicateObject {
                name: line_name.to_string(),
            }
        } else if fault.contains("CONCURRENT_MODIFICATION") {
            AssemblyError::ConcurrentModification(fault)
        } else {
            AssemblyError::Api(fault)
        }
    }

    /// Only concurrent-modification faults are safe to retry; everything
    /// else is terminal for the variant that hit it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssemblyError::ConcurrentModification(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_fault_classification() {
        let err = AssemblyError::from_remote_fault(
            "[CommonError.DUPLICATE_OBJECT @ lineItem[0].name]",
            "Line_A",
        );
        assert!(matches!(err, AssemblyError::DuplicateObject { ref name } if name == "Line_A"));

        let err = AssemblyError::from_remote_fault("CONCURRENT_MODIFICATION: order 123", "x");
        assert!(err.is_retryable());

        let err = AssemblyError::from_remote_fault("PERMISSION_DENIED", "x");
        assert!(matches!(err, AssemblyError::Api(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_partial_failure_message_enumerates_variants() {
        let err = AssemblyError::PartialCampaignFailure {
            failures: vec![
                "Failed to create PSBK line: boom".to_string(),
                "Failed to create NWP line: bust".to_string(),
            ],
            completed: Vec::new(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1 of 3"));
        assert!(msg.contains("PSBK line: boom"));
        assert!(msg.contains("NWP line: bust"));
    }
}
