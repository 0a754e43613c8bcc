//! Fixed size presets: the adtype/section row filters each creative size
//! carries into the placement directories, and the platforms each
//! rich-media size supports.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use linehaul_core::types::{AdSize, LineFlavor};

/// Every size the engine recognizes in filenames and tag tables.
pub const AVAILABLE_SIZES: [AdSize; 12] = [
    AdSize::new(300, 250),
    AdSize::new(320, 50),
    AdSize::new(125, 600),
    AdSize::new(300, 600),
    AdSize::new(728, 90),
    AdSize::new(980, 200),
    AdSize::new(320, 480),
    AdSize::new(1260, 570),
    AdSize::new(728, 500),
    AdSize::new(1320, 570),
    AdSize::new(600, 250),
    AdSize::new(320, 100),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizePreset {
    pub adtypes: &'static [&'static str],
    pub sections: &'static [&'static str],
    /// Platforms the size supports; `None` means unrestricted. Only
    /// consulted for rich-media lines.
    pub platforms: Option<&'static [&'static str]>,
}

pub static STANDARD_PRESETS: LazyLock<BTreeMap<AdSize, SizePreset>> = LazyLock::new(|| {
    let mut m = BTreeMap::new();
    m.insert(
        AdSize::new(300, 250),
        SizePreset {
            adtypes: &[
                "MREC_ALL", "MREC", "MREC_1", "MREC_2", "MREC_3", "MREC_4", "MREC_5", "BTF MREC",
            ],
            sections: &["ROS", "HP", "HOME"],
            platforms: None,
        },
    );
    m.insert(
        AdSize::new(320, 50),
        SizePreset {
            adtypes: &["BOTTOMOVERLAY", "BOTTOM OVERLAY"],
            sections: &["ROS", "HP", "HOME"],
            platforms: None,
        },
    );
    m.insert(
        AdSize::new(300, 600),
        SizePreset {
            adtypes: &["FLYINGCARPET", "FLYING_CARPET", "TOWER"],
            sections: &["ROS", "HP", "HOME"],
            platforms: None,
        },
    );
    m.insert(
        AdSize::new(728, 90),
        SizePreset {
            adtypes: &["LEADERBOARD"],
            sections: &["ROS", "HP", "HOME"],
            platforms: None,
        },
    );
    m.insert(
        AdSize::new(980, 200),
        SizePreset {
            adtypes: &["LEADERBOARD"],
            sections: &["ROS"],
            platforms: None,
        },
    );
    m.insert(
        AdSize::new(320, 480),
        SizePreset {
            adtypes: &["INTERSTITIAL"],
            sections: &["ROS", "HP", "HOME"],
            platforms: None,
        },
    );
    m.insert(
        AdSize::new(1260, 570),
        SizePreset {
            adtypes: &["INTERSTITIAL"],
            sections: &["ROS", "HP", "HOME"],
            platforms: None,
        },
    );
    m.insert(
        AdSize::new(320, 100),
        SizePreset {
            adtypes: &["SLUG1", "SLUG2", "SLUG3", "SLUG4", "SLUG5"],
            sections: &["ROS", "HP", "HOME"],
            platforms: None,
        },
    );
    m
});

pub static RICHMEDIA_PRESETS: LazyLock<BTreeMap<AdSize, SizePreset>> = LazyLock::new(|| {
    let mut m = BTreeMap::new();
    m.insert(
        AdSize::new(300, 250),
        SizePreset {
            adtypes: &["MREC_1"],
            sections: &["ROS", "HP", "HOME"],
            platforms: Some(&["WEB"]),
        },
    );
    m.insert(
        AdSize::new(320, 100),
        SizePreset {
            adtypes: &["TOPBANNER"],
            sections: &["ROS", "HP", "HOME"],
            platforms: Some(&["MWEB"]),
        },
    );
    m.insert(
        AdSize::new(300, 600),
        SizePreset {
            adtypes: &["FLYINGCARPET", "FLYING_CARPET", "TOWER"],
            sections: &["ROS", "HP", "HOME"],
            platforms: Some(&["WEB", "MWEB", "AMP"]),
        },
    );
    m.insert(
        AdSize::new(728, 90),
        SizePreset {
            adtypes: &["LEADERBOARD"],
            sections: &["ROS", "HP", "HOME"],
            platforms: Some(&["WEB", "MWEB", "AMP"]),
        },
    );
    m.insert(
        AdSize::new(320, 50),
        SizePreset {
            adtypes: &["BOTTOMOVERLAY", "BOTTOM OVERLAY"],
            sections: &["ROS", "HP", "HOME"],
            platforms: None,
        },
    );
    m.insert(
        AdSize::new(320, 480),
        SizePreset {
            adtypes: &["INTERSTITIAL"],
            sections: &["ROS", "HP", "HOME"],
            platforms: None,
        },
    );
    m
});

/// Preset table for a line flavor.
pub fn presets_for(flavor: LineFlavor) -> &'static BTreeMap<AdSize, SizePreset> {
    match flavor {
        LineFlavor::Standard => &STANDARD_PRESETS,
        LineFlavor::RichMedia => &RICHMEDIA_PRESETS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_size_is_available() {
        for size in STANDARD_PRESETS.keys().chain(RICHMEDIA_PRESETS.keys()) {
            assert!(AVAILABLE_SIZES.contains(size), "{size} missing");
        }
    }

    #[test]
    fn test_richmedia_platform_restrictions() {
        let rm = presets_for(LineFlavor::RichMedia);
        assert_eq!(rm[&AdSize::new(300, 250)].platforms, Some(&["WEB"][..]));
        assert_eq!(rm[&AdSize::new(320, 100)].platforms, Some(&["MWEB"][..]));
        assert!(rm[&AdSize::new(320, 50)].platforms.is_none());
    }
}
