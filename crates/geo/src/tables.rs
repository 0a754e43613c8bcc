//! Fixed lookup tables for geo disambiguation. Built once at first use and
//! never mutated.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Indian state names and their accepted abbreviations, used to match a
/// caller's state hint against a candidate's parent-region name.
pub static STATE_SYNONYMS: LazyLock<HashMap<&'static str, &'static [&'static str]>> =
    LazyLock::new(|| {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("maharashtra", &["maharashtra", "mh"]);
        m.insert("bihar", &["bihar", "br"]);
        m.insert("uttar pradesh", &["uttar pradesh", "up"]);
        m.insert("west bengal", &["west bengal", "wb"]);
        m.insert("tamil nadu", &["tamil nadu", "tn"]);
        m.insert("karnataka", &["karnataka", "ka"]);
        m.insert("gujarat", &["gujarat", "gj"]);
        m.insert("rajasthan", &["rajasthan", "rj"]);
        m.insert("andhra pradesh", &["andhra pradesh", "ap"]);
        m.insert("telangana", &["telangana", "ts"]);
        m.insert("kerala", &["kerala", "kl"]);
        m.insert("odisha", &["odisha", "or"]);
        m.insert("punjab", &["punjab", "pb"]);
        m.insert("haryana", &["haryana", "hr"]);
        m.insert("himachal pradesh", &["himachal pradesh", "hp"]);
        m.insert("uttarakhand", &["uttarakhand", "uk"]);
        m.insert("jharkhand", &["jharkhand", "jh"]);
        m.insert("chhattisgarh", &["chhattisgarh", "cg"]);
        m.insert("madhya pradesh", &["madhya pradesh", "mp"]);
        m.insert("assam", &["assam", "as"]);
        m.insert("meghalaya", &["meghalaya", "ml"]);
        m.insert("manipur", &["manipur", "mn"]);
        m.insert("mizoram", &["mizoram", "mz"]);
        m.insert("nagaland", &["nagaland", "nl"]);
        m.insert("tripura", &["tripura", "tr"]);
        m.insert("arunachal pradesh", &["arunachal pradesh", "ar"]);
        m.insert("sikkim", &["sikkim", "sk"]);
        m.insert("goa", &["goa", "ga"]);
        m
    });

/// Location names known to exist in several states. A multi-match on one of
/// these is flagged for human follow-up regardless of match count.
pub static AMBIGUOUS_LOCATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "aurangabad",
        "salem",
        "bangalore",
        "mysore",
        "hassan",
        "mandya",
        "tumkur",
        "shimoga",
        "bellary",
        "gulbarga",
        "bijapur",
        "raichur",
        "chitradurga",
        "davangere",
        "bagalkot",
        "haveri",
        "gadag",
        "koppal",
        "yadgir",
        "kolar",
        "chikkaballapur",
        "ramanagara",
        "chamarajanagar",
        "kodagu",
        "udupi",
        "chikkamagaluru",
        "shivamogga",
        "vijayapura",
        "kalburgi",
        "ballari",
        "nellore",
        "kadapa",
        "kurnool",
        "anantapur",
        "chittoor",
        "tirupati",
        "vizianagaram",
        "srikakulam",
        "guntur",
        "krishna",
        "west godavari",
        "east godavari",
        "warangal",
        "khammam",
        "nalgonda",
        "mahbubnagar",
        "rangareddy",
        "medak",
        "nizamabad",
        "adilabad",
        "karimnagar",
        "hyderabad",
        "secunderabad",
    ]
    .into_iter()
    .collect()
});

/// Whether a bare location name is in the known-ambiguous set.
pub fn is_ambiguous_location(name: &str) -> bool {
    AMBIGUOUS_LOCATIONS.contains(name.trim().to_lowercase().as_str())
}

/// Whether a parent-region name satisfies a caller-supplied state hint,
/// either by direct substring or through the synonym table.
pub fn parent_matches_hint(parent_region: &str, hint: &str) -> bool {
    let parent = parent_region.to_lowercase();
    let hint = hint.trim().to_lowercase();
    if parent.contains(&hint) {
        return true;
    }
    STATE_SYNONYMS
        .iter()
        .any(|(full, variations)| variations.contains(&hint.as_str()) && parent.contains(full))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_set_is_case_insensitive() {
        assert!(is_ambiguous_location("Aurangabad"));
        assert!(is_ambiguous_location("  HYDERABAD "));
        assert!(!is_ambiguous_location("Mumbai"));
    }

    #[test]
    fn test_hint_matches_by_substring_and_abbreviation() {
        assert!(parent_matches_hint("Maharashtra", "maharashtra"));
        assert!(parent_matches_hint("Maharashtra", "MH"));
        assert!(parent_matches_hint("State of Bihar", "bihar"));
        assert!(!parent_matches_hint("Maharashtra", "bihar"));
    }
}
