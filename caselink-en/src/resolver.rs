//! Candidate match disambiguation
//!
//! Reduces a registry's raw search results to exactly one record, or
//! declares the set irreducible. Pure data in, pure data out: no network,
//! no storage, and never a best-effort pick. A query that matches two
//! records is a question for a human, not a coin flip.

use crate::address::NormalizedAddress;
use serde::{Deserialize, Serialize};

/// One raw result row from a registry search, prior to disambiguation
///
/// Fields other than `external_id` are whatever the source supplies; absent
/// fields are simply not filtered on. Enough is retained for independent
/// re-verification of a match during review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Registry-specific record identifier (account number, PIN, REID)
    pub external_id: String,
    pub house_number: Option<String>,
    /// Directional prefix as the source reports it; empty string and absent
    /// are equivalent
    pub direction: Option<String>,
    pub street_name: Option<String>,
    /// Municipality/jurisdiction code as the source reports it
    pub municipality: Option<String>,
    /// Direct link to the record, when the source provides one
    pub source_url: Option<String>,
}

/// Registry-specific hints supplied alongside the query
#[derive(Debug, Clone, Default)]
pub struct MatchHints {
    /// Jurisdiction code derived from the query's city, for registries that
    /// index parcels by municipality
    pub municipality_code: Option<String>,
}

/// Why a candidate set could not be reduced to one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmbiguityReason {
    ZeroMatches,
    MultipleMatches,
}

/// Outcome of disambiguation over one candidate set
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult<'a> {
    /// Exactly one candidate agreed with the query on every supplied field
    Unique(&'a Candidate),
    /// Zero or more than one candidate agreed; the matching subset is
    /// retained as review evidence
    Ambiguous {
        reason: AmbiguityReason,
        matched: Vec<&'a Candidate>,
    },
}

impl MatchResult<'_> {
    /// Number of candidates that satisfied every criterion
    pub fn match_count(&self) -> usize {
        match self {
            MatchResult::Unique(_) => 1,
            MatchResult::Ambiguous { matched, .. } => matched.len(),
        }
    }
}

/// Filter `candidates` to those agreeing with the query on every field the
/// source supplies, conjunctively:
///
/// - house number: exact
/// - directional prefix: exact, treating absent and empty as equivalent
/// - street name: exact, case-insensitive
/// - municipality code: equality, only when both the hint and the candidate
///   field are present
///
/// An empty input set is a legitimate `ZeroMatches` outcome, not an error:
/// absence of search results is an answer.
pub fn resolve<'a>(
    candidates: &'a [Candidate],
    query: &NormalizedAddress,
    hints: &MatchHints,
) -> MatchResult<'a> {
    let matched: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| candidate_matches(c, query, hints))
        .collect();

    match matched.as_slice() {
        [single] => MatchResult::Unique(single),
        [] => MatchResult::Ambiguous {
            reason: AmbiguityReason::ZeroMatches,
            matched,
        },
        _ => MatchResult::Ambiguous {
            reason: AmbiguityReason::MultipleMatches,
            matched,
        },
    }
}

fn candidate_matches(candidate: &Candidate, query: &NormalizedAddress, hints: &MatchHints) -> bool {
    if let Some(house) = &candidate.house_number {
        if query.house_number.as_deref() != Some(house.as_str()) {
            return false;
        }
    }

    // Absent prefix and empty-string prefix are the same thing
    let candidate_dir = candidate.direction.as_deref().unwrap_or("");
    let query_dir = query.direction_prefix.as_deref().unwrap_or("");
    if !candidate_dir.eq_ignore_ascii_case(query_dir) {
        return false;
    }

    if let Some(street) = &candidate.street_name {
        match &query.street_name {
            Some(q) if q.eq_ignore_ascii_case(street) => {}
            _ => return false,
        }
    }

    if let (Some(hint), Some(muni)) = (&hints.municipality_code, &candidate.municipality) {
        if !hint.eq_ignore_ascii_case(muni) {
            return false;
        }
    }

    true
}
