//! Postal address normalization
//!
//! Parses the free-text property address recorded on a case into canonical
//! components so registry searches and match filtering can compare fields
//! instead of strings. Normalization is total: malformed input produces a
//! `NormalizedAddress` with absent fields, never an error. The caller
//! decides whether a missing house number or street name is fatal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A postal address broken into canonical components
///
/// `street_name` never contains a recognized street-type suffix nor a
/// recognized directional token as its first word; both are factored into
/// their own fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAddress {
    /// Leading digit run of the street segment
    pub house_number: Option<String>,
    /// Canonical directional (N, S, E, W, NE, NW, SE, SW)
    pub direction_prefix: Option<String>,
    /// Uppercased street name, suffix-stripped
    pub street_name: Option<String>,
    pub city: Option<String>,
    /// Two-letter state code
    pub state: Option<String>,
    /// 5-digit or 9-digit (dashed) ZIP
    pub zip: Option<String>,
    /// Original input text, retained for review evidence
    pub raw: String,
}

impl NormalizedAddress {
    /// True when the fields required for any registry lookup are present
    pub fn is_searchable(&self) -> bool {
        self.house_number.is_some() && self.street_name.is_some()
    }
}

/// Closed directional-token table, as-written form to canonical form.
///
/// Single letters and the unambiguous compounds only. Full words North,
/// East, and West are included; "South" is deliberately absent because it
/// appears as the first word of real street names ("South Ridge Court"),
/// and misreading it loses the street.
static DIRECTIONALS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("N", "N"),
        ("N.", "N"),
        ("NORTH", "N"),
        ("S", "S"),
        ("S.", "S"),
        ("E", "E"),
        ("E.", "E"),
        ("EAST", "E"),
        ("W", "W"),
        ("W.", "W"),
        ("WEST", "W"),
        ("NE", "NE"),
        ("N.E.", "NE"),
        ("NW", "NW"),
        ("N.W.", "NW"),
        ("SE", "SE"),
        ("S.E.", "SE"),
        ("SW", "SW"),
        ("S.W.", "SW"),
    ])
});

/// Street-type suffixes, longest first so that e.g. "Lane" is matched before
/// any shorter overlapping token. Stored without the optional trailing
/// period; both forms are tried.
static STREET_SUFFIXES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut suffixes = vec![
        "BOULEVARD", "PARKWAY", "TERRACE", "HIGHWAY", "CIRCLE", "STREET", "AVENUE", "COURT",
        "DRIVE", "PLACE", "TRAIL", "LANE", "ROAD", "LOOP", "BLVD", "PKWY", "RUN", "WAY", "HWY",
        "AVE", "CIR", "TER", "TRL", "ST", "RD", "DR", "LN", "CT", "PL",
    ];
    suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));
    suffixes
});

/// Known local municipality names, longest first, used by the missing-comma
/// repair to recover a city that was concatenated into the street segment.
static MUNICIPALITIES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut names = vec![
        "Apex",
        "Angier",
        "Benson",
        "Cary",
        "Clayton",
        "Durham",
        "Fuquay-Varina",
        "Garner",
        "Holly Springs",
        "Knightdale",
        "Lillington",
        "Morrisville",
        "Raleigh",
        "Rolesville",
        "Selma",
        "Smithfield",
        "Wake Forest",
        "Wendell",
        "Zebulon",
    ];
    names.sort_by_key(|s| std::cmp::Reverse(s.len()));
    names
});

/// City name (uppercase) to registry municipality code, used as a search
/// hint by portals that index parcels by jurisdiction.
static MUNICIPALITY_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("APEX", "APE"),
        ("ANGIER", "ANG"),
        ("BENSON", "BEN"),
        ("CARY", "CAR"),
        ("CLAYTON", "CLA"),
        ("DURHAM", "DUR"),
        ("FUQUAY-VARINA", "FUQ"),
        ("GARNER", "GAR"),
        ("HOLLY SPRINGS", "HOL"),
        ("KNIGHTDALE", "KNI"),
        ("LILLINGTON", "LIL"),
        ("MORRISVILLE", "MOR"),
        ("RALEIGH", "RAL"),
        ("ROLESVILLE", "ROL"),
        ("SELMA", "SEL"),
        ("SMITHFIELD", "SMI"),
        ("WAKE FOREST", "WAK"),
        ("WENDELL", "WEN"),
        ("ZEBULON", "ZEB"),
    ])
});

/// `<2 letters><whitespace><5 digits optionally dash-4>`
static STATE_ZIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]{2})\s+(\d{5}(?:-\d{4})?)$").expect("valid regex"));

/// Look up the registry municipality code for a normalized city name
pub fn municipality_code(city: &str) -> Option<&'static str> {
    MUNICIPALITY_CODES.get(city.to_uppercase().as_str()).copied()
}

/// Parse a free-text postal address into canonical components
///
/// Segments are positional: `street, city, state zip`. Missing segments
/// leave the corresponding fields absent.
pub fn normalize(raw: &str) -> NormalizedAddress {
    let segments: Vec<&str> = raw.split(',').map(str::trim).collect();
    let street_seg = segments.first().copied().unwrap_or("");
    let city_seg = segments.get(1).copied().filter(|s| !s.is_empty());
    let state_zip_seg = segments.get(2).copied().filter(|s| !s.is_empty());

    let mut addr = NormalizedAddress {
        raw: raw.to_string(),
        ..Default::default()
    };

    // Leading digit run is the house number
    let digits: String = street_seg.chars().take_while(|c| c.is_ascii_digit()).collect();
    let mut street_candidate = street_seg[digits.len()..].trim().to_string();
    if !digits.is_empty() {
        addr.house_number = Some(digits);
    }

    // Directional prefix from the closed table only
    if let Some(first) = street_candidate.split_whitespace().next() {
        if let Some(canonical) = DIRECTIONALS.get(first.to_uppercase().as_str()) {
            addr.direction_prefix = Some((*canonical).to_string());
            street_candidate = street_candidate[first.len()..].trim_start().to_string();
        }
    }

    let street_name = strip_street_suffix(&street_candidate.to_uppercase());
    if !street_name.is_empty() {
        addr.street_name = Some(street_name);
    }

    addr.city = city_seg.map(str::to_string);

    if let Some(seg) = state_zip_seg {
        if let Some(caps) = STATE_ZIP_RE.captures(seg) {
            addr.state = Some(caps[1].to_uppercase());
            addr.zip = Some(caps[2].to_string());
        } else if seg.len() == 2 && seg.chars().all(|c| c.is_ascii_alphabetic()) {
            addr.state = Some(seg.to_uppercase());
        }
    }

    repair_missing_city_comma(&mut addr);

    addr
}

/// Strip one trailing street-type suffix, longest first, with or without a
/// trailing period. Input and output are uppercase. Idempotent: a name with
/// no suffix passes through unchanged.
fn strip_street_suffix(street: &str) -> String {
    let street = street.trim();
    for suffix in STREET_SUFFIXES.iter() {
        let plain = format!(" {suffix}");
        let dotted = format!(" {suffix}.");
        for form in [dotted, plain] {
            if street.ends_with(&form) {
                return street[..street.len() - form.len()].trim_end().to_string();
            }
        }
    }
    street.to_string()
}

/// Missing-comma repair
///
/// A `city` of exactly two alphabetic characters is a strong signal that the
/// true city name was concatenated into the street segment because its
/// separating comma was missing ("1200 Ten Ten Road Apex, NC"). When a known
/// municipality is a trailing match of the street name, strip it, re-run
/// suffix stripping on the newly exposed tail, promote the municipality to
/// `city`, and demote the two-letter token to `state`.
fn repair_missing_city_comma(addr: &mut NormalizedAddress) {
    let two_letter_city = match &addr.city {
        Some(city) if city.len() == 2 && city.chars().all(|c| c.is_ascii_alphabetic()) => {
            city.clone()
        }
        _ => return,
    };
    let Some(street) = addr.street_name.clone() else {
        return;
    };

    for muni in MUNICIPALITIES.iter() {
        let upper = muni.to_uppercase();
        let trailing = format!(" {upper}");
        if let Some(stripped) = street.strip_suffix(&trailing) {
            let repaired = strip_street_suffix(stripped.trim_end());
            addr.street_name = (!repaired.is_empty()).then_some(repaired);
            addr.city = Some((*muni).to_string());
            addr.state = Some(two_letter_city.to_uppercase());
            tracing::debug!(
                city = *muni,
                "Recovered municipality from street segment (missing comma)"
            );
            return;
        }
    }
}
