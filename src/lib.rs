//! A library for reconciling, synchronizing, and rendering bibliographic records.
//!
//! `bibsync` reconciles publication records drawn from a spreadsheet-shaped
//! source of truth against the records stored in a CCV (Canadian Common CV)
//! XML export, and renders the reconciled set into downstream publication
//! formats.
//!
//! # Key Features
//!
//! - **Two adapters, one record model**: parse records from
//!   - a multi-sheet CSV workbook (one sheet per publication kind)
//!   - a CCV XML export (`Contributions/Publications` sections)
//!
//! - **Reference reconciliation**: build a cross-reference mapping between
//!   the two collections by exact whitespace-normalized title matching with a
//!   venue tiebreak, classifying every record as matched, missing, or
//!   ambiguous, and reporting orphans and field mismatches.
//!
//! - **In-place synchronization**: apply verified field updates from the
//!   spreadsheet side into the XML tree without disturbing unrelated
//!   structure.
//!
//! - **Citation rewriting and rendering**: rewrite inline reference blocks
//!   (`[J1, J5]`) through a reconciled mapping, and render records as
//!   citation lines, website markup, or a BibTeX database.
//!
//! # Basic Usage
//!
//! ```rust
//! use bibsync::{Kind, Record, reconcile};
//!
//! let sheet = vec![Record::new("csv1", Kind::Article, "Spinal cord imaging", "NeuroImage")];
//! let ccv = vec![Record::new("J1", Kind::Article, "Spinal cord imaging", "NeuroImage")];
//!
//! let (mapping, report) = reconcile(&sheet, &ccv, &[Kind::Article]);
//! assert_eq!(mapping.new_id("csv1"), Some("J1"));
//! assert_eq!(report.summary(Kind::Article).unwrap().matched, 1);
//! ```
//!
//! # Reference Block Rewriting
//!
//! ```rust
//! use bibsync::{Kind, Record, reconcile, refblocks};
//!
//! let old = vec![Record::new("J1", Kind::Article, "Spinal cord imaging", "NeuroImage")];
//! let new = vec![Record::new("J9", Kind::Article, "Spinal cord imaging", "NeuroImage")];
//! let (mapping, _) = reconcile(&old, &new, &[Kind::Article]);
//!
//! let rewritten = refblocks::rewrite("see [J1] for details", &mapping, false);
//! assert_eq!(rewritten, "see [J9] for details");
//! ```
//!
//! # Error Handling
//!
//! The library uses a custom [`Result`] type that wraps [`Error`] for
//! consistent error handling across all operations. Data-quality issues
//! (missing, ambiguous, orphaned records, field mismatches) are never errors:
//! they are the *output* of reconciliation, collected in the
//! [`Report`](reconcile::Report).

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bibtex;
pub mod ccv;
pub mod labels;
pub mod reconcile;
pub mod refblocks;
pub mod render;
pub mod roster;
pub mod sheet;
pub mod sync;
mod utils;

// Reexports
pub use ccv::CcvDocument;
pub use labels::LabelSet;
pub use reconcile::{Mapping, Outcome, Report, reconcile};
pub use roster::Roster;
pub use sheet::{SheetConfig, SheetParser, Workbook};
pub use sync::{SyncReport, sync};

/// A specialized Result type for record operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur while loading, reconciling, or
/// synchronizing record collections.
///
/// Data-quality outcomes (missing, ambiguous, orphaned records) are not
/// errors; they are reported by [`reconcile`] in its
/// [`Report`](reconcile::Report).
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: requested {requested:?}, available {available:?}")]
    InvalidArgument {
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("could not disambiguate: {}", .0.join(", "))]
    Disambiguation(Vec<String>),

    #[error("invalid labels:\n{0}")]
    Validation(String),
}

// Add From implementations for common error types
impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

/// Publication kind, in the canonical vocabulary shared by both sources.
///
/// Each source speaks its own vocabulary: workbook sheets are named
/// `"article"`, `"proceedings"`, `"talk"`, `"bookchapter"`, while the CCV
/// export labels its sections `"Journal Articles"` and
/// `"Conference Publications"`. The mappings are bidirectional; a source
/// label with no canonical entry is dropped by the adapters, never defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Article,
    Proceedings,
    Talk,
    BookChapter,
}

impl Kind {
    /// All canonical kinds, in id-prefix order.
    pub const ALL: [Kind; 4] = [
        Kind::Article,
        Kind::Proceedings,
        Kind::Talk,
        Kind::BookChapter,
    ];

    /// The kinds that exist in the CCV vocabulary.
    pub const CCV: [Kind; 2] = [Kind::Article, Kind::Proceedings];

    /// One-letter prefix used when synthesizing record ids (`J12`, `C8`).
    #[must_use]
    pub fn prefix(&self) -> char {
        match self {
            Kind::Article => 'J',
            Kind::Proceedings => 'C',
            Kind::Talk => 'T',
            Kind::BookChapter => 'B',
        }
    }

    /// Workbook sheet name for this kind.
    #[must_use]
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Kind::Article => "article",
            Kind::Proceedings => "proceedings",
            Kind::Talk => "talk",
            Kind::BookChapter => "bookchapter",
        }
    }

    /// Translates a workbook sheet name into the canonical vocabulary.
    #[must_use]
    pub fn from_sheet_name(name: &str) -> Option<Kind> {
        Kind::ALL.iter().copied().find(|k| k.sheet_name() == name)
    }

    /// CCV section label for this kind, if the CCV vocabulary has one.
    #[must_use]
    pub fn ccv_label(&self) -> Option<&'static str> {
        match self {
            Kind::Article => Some("Journal Articles"),
            Kind::Proceedings => Some("Conference Publications"),
            _ => None,
        }
    }

    /// Translates a CCV section label into the canonical vocabulary.
    #[must_use]
    pub fn from_ccv_label(label: &str) -> Option<Kind> {
        Kind::CCV
            .iter()
            .copied()
            .find(|k| k.ccv_label() == Some(label))
    }

    /// CCV field label holding the title for entries of this kind.
    #[must_use]
    pub fn ccv_title_field(&self) -> Option<&'static str> {
        match self {
            Kind::Article => Some("Article Title"),
            Kind::Proceedings => Some("Publication Title"),
            _ => None,
        }
    }

    /// CCV field label holding the venue (journal or conference name) for
    /// entries of this kind.
    #[must_use]
    pub fn ccv_venue_field(&self) -> Option<&'static str> {
        match self {
            Kind::Article => Some("Journal"),
            Kind::Proceedings => Some("Conference Name"),
            _ => None,
        }
    }

    /// Translates user-facing kind names into canonical kinds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] enumerating both the unknown names
    /// and the valid vocabulary if any name has no canonical entry.
    pub fn parse_kinds(names: &[&str]) -> Result<Vec<Kind>> {
        let unknown: Vec<String> = names
            .iter()
            .filter(|n| Kind::from_sheet_name(n).is_none())
            .map(|n| n.to_string())
            .collect();
        if !unknown.is_empty() {
            return Err(Error::InvalidArgument {
                requested: unknown,
                available: Kind::ALL
                    .iter()
                    .map(|k| k.sheet_name().to_string())
                    .collect(),
            });
        }
        Ok(names
            .iter()
            .filter_map(|n| Kind::from_sheet_name(n))
            .collect())
    }
}

impl Default for Kind {
    fn default() -> Self {
        Kind::Article
    }
}

/// A single publication record, uniform across sources.
///
/// `id` is unique within one source's collection, never across sources:
/// cross-source identity is derived by [`reconcile`], not assumed. Equality
/// for matching purposes is computed explicitly by the reconciliation engine
/// over `(kind, title, venue)`; the derived `PartialEq` compares all fields
/// and is not used for matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Source-local identifier, e.g. `J12` or `C8`.
    pub id: String,
    /// Publication kind in the canonical vocabulary.
    pub kind: Kind,
    /// Ordered author display names. Order is meaningful and preserved.
    pub authors: Vec<String>,
    /// Title of the work; primary matching key.
    pub title: String,
    /// Journal or conference name, depending on kind; matching tiebreak.
    pub venue: String,
    /// Publication year. Absent for CCV-side records, which do not carry a
    /// year at this level.
    pub year: Option<i32>,
    /// Journal impact factor.
    pub impact: Option<String>,
    /// Link to the publication.
    pub url: Option<String>,
    /// Category labels, validated against an authorized list.
    pub labels: Vec<String>,
    /// Prize or award attached to the publication.
    pub prize: Option<String>,
    /// Volume and page range, `Volume:Pages` form.
    pub pages: Option<String>,
}

impl Record {
    /// Creates a record with the fields that participate in matching.
    #[must_use]
    pub fn new(id: &str, kind: Kind, title: &str, venue: &str) -> Self {
        Record {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            venue: venue.to_string(),
            ..Default::default()
        }
    }

    /// Authors in serialized display form, comma-joined.
    #[must_use]
    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::NotFound("section[@label='Publications']".to_string());
        assert_eq!(
            error.to_string(),
            "not found: section[@label='Publications']"
        );
    }

    #[test]
    fn test_kind_vocabulary_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_sheet_name(kind.sheet_name()), Some(kind));
        }
        for kind in Kind::CCV {
            assert_eq!(Kind::from_ccv_label(kind.ccv_label().unwrap()), Some(kind));
        }
        assert_eq!(Kind::from_ccv_label("Patents"), None);
        assert_eq!(Kind::Talk.ccv_label(), None);
    }

    #[test]
    fn test_parse_kinds_rejects_unknown() {
        let err = Kind::parse_kinds(&["article", "poster"]).unwrap_err();
        match err {
            Error::InvalidArgument {
                requested,
                available,
            } => {
                assert_eq!(requested, vec!["poster"]);
                assert!(available.contains(&"article".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_authors_joined() {
        let mut record = Record::new("J1", Kind::Article, "Title", "Venue");
        record.authors = vec!["Smith J".to_string(), "Doe J".to_string()];
        assert_eq!(record.authors_joined(), "Smith J, Doe J");
    }
}
