use serde::Deserialize;

/// Root assembly configuration. Loaded from environment variables with the
/// prefix `LINEHAUL__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssemblyConfig {
    #[serde(default)]
    pub directories: DirectoryConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Named external placement directories, one per site partition.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_sheet_url")]
    pub sheet_url: String,
    #[serde(default = "default_language_sheet")]
    pub language_sheet: String,
    #[serde(default = "default_toi_sheet")]
    pub toi_sheet: String,
    #[serde(default = "default_et_sheet")]
    pub et_sheet: String,
    #[serde(default = "default_psbk_sheet")]
    pub psbk_sheet: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    #[serde(default = "default_creatives_folder")]
    pub creatives_folder: String,
}

/// Tuning for the sequential multi-variant build.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Pause between variant submissions; the remote platform rejects
    /// concurrent modifications against the same order.
    #[serde(default = "default_inter_variant_delay_ms")]
    pub inter_variant_delay_ms: u64,
}

// Default functions
fn default_sheet_url() -> String {
    "https://docs.google.com/spreadsheets/d/placement-directory/edit".to_string()
}
fn default_language_sheet() -> String {
    "ALL LANGUAGES".to_string()
}
fn default_toi_sheet() -> String {
    "TOI + ETIMES".to_string()
}
fn default_et_sheet() -> String {
    "ET Placement/Preset".to_string()
}
fn default_psbk_sheet() -> String {
    "CAN_PSBK".to_string()
}
fn default_creatives_folder() -> String {
    "creatives".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    2000
}
fn default_inter_variant_delay_ms() -> u64 {
    2000
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            sheet_url: default_sheet_url(),
            language_sheet: default_language_sheet(),
            toi_sheet: default_toi_sheet(),
            et_sheet: default_et_sheet(),
            psbk_sheet: default_psbk_sheet(),
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            creatives_folder: default_creatives_folder(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            inter_variant_delay_ms: default_inter_variant_delay_ms(),
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            directories: DirectoryConfig::default(),
            assets: AssetConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl AssemblyConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("LINEHAUL")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_all_partitions() {
        let cfg = AssemblyConfig::default();
        assert_eq!(cfg.directories.toi_sheet, "TOI + ETIMES");
        assert_eq!(cfg.directories.et_sheet, "ET Placement/Preset");
        assert_eq!(cfg.directories.language_sheet, "ALL LANGUAGES");
        assert_eq!(cfg.directories.psbk_sheet, "CAN_PSBK");
        assert_eq!(cfg.retry.max_attempts, 3);
    }
}
