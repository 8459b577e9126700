//! Sync writer: applies verified field updates into the CCV XML tree.
//!
//! Walks every publication entry in the target tree, re-derives its
//! `(kind, title)` identity in place, and looks up the matching source
//! record with the same rule the reconciliation engine uses: exact
//! whitespace-normalized title match, venue tiebreak on duplicates. A unique
//! match overwrites the entry's `Authors` and venue fields; no entry is ever
//! created or deleted. Field mutation goes through structured
//! `field[@label]/value` lookups, never iteration-order state.
//!
//! # Example
//!
//! ```
//! use bibsync::{CcvDocument, Kind, Record, sync};
//!
//! let input = r#"<generic-cv xmlns:generic-cv="http://www.cihr-irsc.gc.ca/generic-cv/1.0.0">
//! <section label="Contributions"><section label="Publications">
//! <section label="Journal Articles">
//!   <field label="Authors"><value>Gros C</value></field>
//!   <field label="Article Title"><value>Automatic segmentation</value></field>
//!   <field label="Journal"><value>Neuroimage</value></field>
//! </section>
//! </section></section></generic-cv>"#;
//!
//! let mut doc = CcvDocument::parse(input).unwrap();
//! let mut source = Record::new("csv1", Kind::Article, "Automatic segmentation", "NeuroImage");
//! source.authors = vec!["Gros C".to_string(), "Cohen-Adad J".to_string()];
//!
//! let report = sync(&[source], &mut doc).unwrap();
//! assert_eq!(report.updated.len(), 2);
//! assert_eq!(doc.records().unwrap()[0].venue, "NeuroImage");
//! ```

use tracing::info;

use crate::ccv::CcvDocument;
use crate::ccv::dom::Element;
use crate::reconcile::Mapping;
use crate::utils::normalize_ws;
use crate::{Error, Kind, Record, Result};

/// One applied field update, old value to new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    /// Title of the entry the field belongs to.
    pub title: String,
    /// CCV field label.
    pub field: String,
    pub old: String,
    pub new: String,
}

/// What one sync pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Field values that were overwritten.
    pub updated: Vec<FieldChange>,
    /// Titles of entries with no source counterpart, left untouched.
    pub skipped: Vec<String>,
}

/// Copies `Authors` and venue values from `source` records into the matching
/// entries of the CCV tree, in place.
///
/// Entries with no source counterpart are skipped (reported, not an error).
/// Entries whose title matches several source records that the venue
/// tiebreak cannot reduce to one are collected and, after the full pass,
/// reported as a fatal [`Error::Disambiguation`]: silently picking a
/// candidate would corrupt CV data, so the operator must resolve those
/// records before the write proceeds for them. Updates applied to other
/// entries remain in the tree either way; the caller decides whether to
/// serialize.
///
/// Applying the same source twice yields the same tree as applying it once.
pub fn sync(source: &[Record], doc: &mut CcvDocument) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    let mut unresolved: Vec<String> = Vec::new();

    let publications = doc.publications_mut()?;
    for entry in publications.child_elements_mut() {
        let Some(kind) = entry.label().and_then(Kind::from_ccv_label) else {
            continue; // unhandled publication types
        };
        let (Some(title_field), Some(venue_field)) =
            (kind.ccv_title_field(), kind.ccv_venue_field())
        else {
            continue;
        };
        let Some(title) = entry.field_value(title_field).map(String::from) else {
            continue;
        };

        let normalized = normalize_ws(&title);
        let candidates: Vec<&Record> = source
            .iter()
            .filter(|r| r.kind == kind && normalize_ws(&r.title) == normalized)
            .collect();

        let record = match candidates.len() {
            0 => {
                info!("no source record for {:?}; skipping", title);
                report.skipped.push(title);
                continue;
            }
            1 => candidates[0],
            _ => {
                let venue = entry
                    .field_value(venue_field)
                    .map(normalize_ws)
                    .unwrap_or_default();
                let by_venue: Vec<&Record> = candidates
                    .iter()
                    .copied()
                    .filter(|r| normalize_ws(&r.venue) == venue)
                    .collect();
                if by_venue.len() == 1 {
                    by_venue[0]
                } else {
                    unresolved.push(title);
                    continue;
                }
            }
        };

        info!("updating {:?}", title);
        overwrite_field(entry, "Authors", &record.authors_joined(), &title, &mut report);
        overwrite_field(entry, venue_field, &record.venue, &title, &mut report);
    }

    if unresolved.is_empty() {
        Ok(report)
    } else {
        Err(Error::Disambiguation(unresolved))
    }
}

fn overwrite_field(
    entry: &mut Element,
    field: &str,
    new: &str,
    title: &str,
    report: &mut SyncReport,
) {
    let Some(old) = entry.field_value(field).map(String::from) else {
        return; // sync only overwrites fields that exist
    };
    if old == new {
        return;
    }
    info!("{}: {} => {}", field, old, new);
    entry.set_field_value(field, new);
    report.updated.push(FieldChange {
        title: title.to_string(),
        field: field.to_string(),
        old,
        new: new.to_string(),
    });
}

/// Convenience: runs [`sync`] with the records a reconciliation mapping was
/// built from, keeping only records the mapping classified as matched.
/// Useful when the operator wants to push updates for verified pairs only.
pub fn sync_matched(
    source: &[Record],
    mapping: &Mapping,
    doc: &mut CcvDocument,
) -> Result<SyncReport> {
    let matched: Vec<Record> = source
        .iter()
        .filter(|r| mapping.new_id(&r.id).is_some())
        .cloned()
        .collect();
    sync(&matched, doc)
}
