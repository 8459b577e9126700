//! Reference reconciliation engine.
//!
//! Builds a cross-reference mapping between two record collections keyed by
//! imprecise natural-language fields. Matching is exact whitespace-normalized
//! title equality with a single venue-level tiebreak; any ambiguity that
//! survives the tiebreak is surfaced to a human rather than guessed.
//!
//! Data-quality outcomes (missing, ambiguous, orphaned records, field
//! mismatches) are never errors. They are the output of reconciliation,
//! aggregated in the [`Report`] so the operator sees the complete picture in
//! one run.
//!
//! # Example
//!
//! ```
//! use bibsync::{Kind, Record, reconcile, Outcome};
//!
//! let sheet = vec![
//!     Record::new("csv1", Kind::Article, "Spinal cord imaging", "NeuroImage"),
//!     Record::new("csv2", Kind::Article, "Unpublished work", "Nowhere"),
//! ];
//! let ccv = vec![Record::new("J1", Kind::Article, "Spinal cord imaging", "NeuroImage")];
//!
//! let (mapping, report) = reconcile(&sheet, &ccv, &[Kind::Article]);
//! assert_eq!(mapping.outcome("csv1"), Some(&Outcome::Matched("J1".to_string())));
//! assert_eq!(mapping.outcome("csv2"), Some(&Outcome::Missing));
//! let summary = report.summary(Kind::Article).unwrap();
//! assert_eq!((summary.matched, summary.missing), (1, 1));
//! ```

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::utils::normalize_ws;
use crate::{Kind, Record};

/// Classification of one source record against the target collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Exactly one target counterpart was found; holds its id.
    Matched(String),
    /// No target candidate shares the title.
    Missing,
    /// Two or more candidates survived the venue tiebreak.
    Ambiguous,
}

/// Cross-reference mapping from source record ids to their reconciliation
/// outcome. Transient: built once per run and consumed immediately by the
/// sync writer or the reference-block rewriter, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: HashMap<String, Outcome>,
}

impl Mapping {
    /// Outcome recorded for a source id.
    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&Outcome> {
        self.entries.get(id)
    }

    /// The matched target id for a source id, if the record matched.
    #[must_use]
    pub fn new_id(&self, id: &str) -> Option<&str> {
        match self.entries.get(id) {
            Some(Outcome::Matched(new_id)) => Some(new_id),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Outcome)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, id: &str, outcome: Outcome) {
        self.entries.insert(id.to_string(), outcome);
    }
}

/// Per-kind reconciliation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub matched: usize,
    pub missing: usize,
    pub ambiguous: usize,
    pub orphaned: usize,
}

/// A non-identity field that differs between a matched pair. Recorded as a
/// warning; does not affect classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMismatch {
    pub source_id: String,
    pub target_id: String,
    pub field: &'static str,
    pub source_value: String,
    pub target_value: String,
}

/// A target-side record with no source counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Orphan {
    pub id: String,
    pub kind: Kind,
    pub title: String,
}

/// Audit report of one reconciliation run. Display-only; it does not feed
/// back into the mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    kinds: Vec<(Kind, KindSummary)>,
    pub orphans: Vec<Orphan>,
    pub mismatches: Vec<FieldMismatch>,
}

impl Report {
    /// Counts for one reconciled kind, if it was requested.
    #[must_use]
    pub fn summary(&self, kind: Kind) -> Option<&KindSummary> {
        self.kinds
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, s)| s)
    }

    /// Per-kind summaries in request order.
    pub fn summaries(&self) -> impl Iterator<Item = (Kind, &KindSummary)> {
        self.kinds.iter().map(|(k, s)| (*k, s))
    }
}

/// Fields compared between matched pairs for mismatch warnings.
const MISMATCH_FIELDS: [&str; 2] = ["Authors", "Journal/Conference"];

/// Builds the cross-reference mapping from `source` to `target` for the
/// requested kinds, classifying every source record as matched, missing, or
/// ambiguous, and every unconsumed target record as orphaned.
///
/// Matching is per kind, in source collection order: candidates are the
/// not-yet-consumed target records with identical whitespace-normalized
/// title. A single candidate matches and is consumed, so no target record is
/// ever claimed twice. Multiple candidates go through a venue tiebreak;
/// unless exactly one survives, the record is ambiguous and nothing is
/// consumed. No other heuristic is consulted.
///
/// Source records are never mutated; running twice on the same inputs
/// produces an identical mapping and report.
#[must_use]
pub fn reconcile(source: &[Record], target: &[Record], kinds: &[Kind]) -> (Mapping, Report) {
    let mut mapping = Mapping::default();
    let mut report = Report::default();

    let mut seen = Vec::new();
    for &kind in kinds {
        if seen.contains(&kind) {
            continue;
        }
        seen.push(kind);
        reconcile_kind(source, target, kind, &mut mapping, &mut report);
    }

    (mapping, report)
}

fn reconcile_kind(
    source: &[Record],
    target: &[Record],
    kind: Kind,
    mapping: &mut Mapping,
    report: &mut Report,
) {
    info!("publication type: '{}'", kind.sheet_name());
    let mut summary = KindSummary::default();

    // target records of this kind not yet consumed by a match
    let mut pool: Vec<&Record> = target.iter().filter(|r| r.kind == kind).collect();

    for record in source.iter().filter(|r| r.kind == kind) {
        let title = normalize_ws(&record.title);
        let candidates: Vec<usize> = pool
            .iter()
            .enumerate()
            .filter(|(_, t)| normalize_ws(&t.title) == title)
            .map(|(i, _)| i)
            .collect();

        let chosen = match candidates.len() {
            0 => None,
            1 => Some(candidates[0]),
            _ => {
                // same title used by more than one publication: a venue
                // tiebreak must leave exactly one candidate
                let venue = normalize_ws(&record.venue);
                let by_venue: Vec<usize> = candidates
                    .iter()
                    .copied()
                    .filter(|&i| normalize_ws(&pool[i].venue) == venue)
                    .collect();
                if by_venue.len() == 1 {
                    Some(by_venue[0])
                } else {
                    None
                }
            }
        };

        match chosen {
            Some(index) => {
                let matched = pool.remove(index);
                info!("{} -> {}: {}", record.id, matched.id, record.title);
                check_mismatches(record, matched, report);
                mapping.insert(&record.id, Outcome::Matched(matched.id.clone()));
                summary.matched += 1;
            }
            None if candidates.is_empty() => {
                warn!("{} -> missing: {}", record.id, record.title);
                mapping.insert(&record.id, Outcome::Missing);
                summary.missing += 1;
            }
            None => {
                warn!("{} -> ambiguous: {}", record.id, record.title);
                mapping.insert(&record.id, Outcome::Ambiguous);
                summary.ambiguous += 1;
            }
        }
    }

    for unmatched in pool {
        warn!("orphaned in target: {} {}", unmatched.id, unmatched.title);
        report.orphans.push(Orphan {
            id: unmatched.id.clone(),
            kind,
            title: unmatched.title.clone(),
        });
        summary.orphaned += 1;
    }

    info!(
        "results for '{}': found: {} | missing: {} | duplicate: {} | orphaned: {}",
        kind.sheet_name(),
        summary.matched,
        summary.missing,
        summary.ambiguous,
        summary.orphaned
    );
    report.kinds.push((kind, summary));
}

fn check_mismatches(source: &Record, target: &Record, report: &mut Report) {
    for field in MISMATCH_FIELDS {
        let (source_value, target_value) = match field {
            "Authors" => (source.authors_joined(), target.authors_joined()),
            _ => (source.venue.clone(), target.venue.clone()),
        };
        if source_value != target_value {
            warn!(
                "  mismatched {} on {}: {:?} vs {:?}",
                field, source.id, source_value, target_value
            );
            report.mismatches.push(FieldMismatch {
                source_id: source.id.clone(),
                target_id: target.id.clone(),
                field,
                source_value,
                target_value,
            });
        }
    }
}
