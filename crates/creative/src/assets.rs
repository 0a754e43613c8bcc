//! Detection of local creative files by the size token in their filename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use linehaul_core::error::AssemblyResult;
use linehaul_core::types::AdSize;

use crate::presets;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Html,
}

/// One creative file associated with a recognized size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub path: PathBuf,
    pub size: AdSize,
    pub kind: AssetKind,
}

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
const HTML_EXTENSIONS: [&str; 2] = ["html", "htm"];

fn kind_of(path: &Path) -> Option<AssetKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(AssetKind::Image)
    } else if HTML_EXTENSIONS.contains(&ext.as_str()) {
        Some(AssetKind::Html)
    } else {
        None
    }
}

/// Size token embedded in the filename, if any. The first recognized size
/// wins.
pub fn size_in_filename(filename: &str) -> Option<AdSize> {
    let lower = filename.to_lowercase();
    presets::AVAILABLE_SIZES
        .iter()
        .copied()
        .find(|size| lower.contains(&size.to_string()))
}

/// Scan a folder for creative files, keyed by detected size. Files without
/// a recognized size token or extension are ignored. A missing folder
/// yields an empty map rather than an error.
pub fn scan_assets(folder: &Path) -> AssemblyResult<BTreeMap<AdSize, Vec<AssetFile>>> {
    let mut detected: BTreeMap<AdSize, Vec<AssetFile>> = BTreeMap::new();
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(folder = %folder.display(), %err, "creatives folder not readable");
            return Ok(detected);
        }
    };

    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(kind) = kind_of(&path) else {
            continue;
        };
        if let Some(size) = size_in_filename(name) {
            debug!(file = name, %size, "detected creative asset");
            detected.entry(size).or_default().push(AssetFile {
                path: path.clone(),
                size,
                kind,
            });
        }
    }
    Ok(detected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_token_detection() {
        assert_eq!(
            size_in_filename("Acme_300x250_v2.jpg"),
            Some(AdSize::new(300, 250))
        );
        assert_eq!(
            size_in_filename("banner-320X50.PNG"),
            Some(AdSize::new(320, 50))
        );
        assert_eq!(size_in_filename("notes.txt"), None);
    }

    #[test]
    fn test_kind_by_extension() {
        assert_eq!(kind_of(Path::new("a/b_300x250.html")), Some(AssetKind::Html));
        assert_eq!(kind_of(Path::new("a/b_300x250.GIF")), Some(AssetKind::Image));
        assert_eq!(kind_of(Path::new("a/b_300x250.psd")), None);
    }

    #[test]
    fn test_scan_missing_folder_is_empty() {
        let detected = scan_assets(Path::new("/nonexistent/creatives")).unwrap();
        assert!(detected.is_empty());
    }
}
