//! BibTeX export of spreadsheet records.
//!
//! Workbook records can be emitted as a BibTeX database for import into CCV
//! or a reference manager. Articles become `@article` entries keyed by
//! `journal`, proceedings become `@proceedings` entries keyed by
//! `organization`; kinds with no BibTeX counterpart are skipped with a
//! warning. A numeric selection grammar (`"1,3,5:9"`) picks out the records
//! to convert by their spreadsheet id.
//!
//! # Example
//!
//! ```
//! use bibsync::{Kind, Record, bibtex};
//!
//! let mut record = Record::new("12", Kind::Article, "Spinal cord imaging", "NeuroImage");
//! record.authors = vec!["Gros C".to_string()];
//! record.year = Some(2023);
//!
//! let records = vec![record];
//! let ids = bibtex::parse_id_selection("10:14").unwrap();
//! let selected = bibtex::select_by_numeric_id(&records, &ids);
//! assert!(bibtex::database(selected).starts_with("@article{12,"));
//! ```

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use tracing::{info, warn};

use crate::{Error, Kind, Record, Result};

/// A `first:last` block in the id selection grammar.
static ID_RANGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+):(\d+)$").unwrap());

fn entry_type(kind: Kind) -> Option<(&'static str, &'static str)> {
    match kind {
        Kind::Article => Some(("article", "journal")),
        Kind::Proceedings => Some(("proceedings", "organization")),
        _ => None,
    }
}

/// Renders one record as a BibTeX entry keyed by its id, or `None` when the
/// record's kind has no BibTeX entry type.
#[must_use]
pub fn entry(record: &Record) -> Option<String> {
    let (kind_name, venue_field) = entry_type(record.kind)?;
    let year = record.year.map(|y| y.to_string()).unwrap_or_default();
    Some(format!(
        "@{}{{{},\n  author = {{{}}},\n  title = {{{}}},\n  year = {{{}}},\n  {} = {{{}}}\n}}\n",
        kind_name,
        record.id,
        record.authors_joined(),
        record.title,
        year,
        venue_field,
        record.venue,
    ))
}

/// Renders a whole collection as a BibTeX database, in collection order.
/// Records whose kind has no BibTeX entry type are skipped.
pub fn database<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter_map(|record| match entry(record) {
            Some(rendered) => {
                info!("{}: {}", record.id, record.title);
                Some(rendered)
            }
            None => {
                warn!(
                    "no BibTeX entry type for '{}'; skipping {}",
                    record.kind.sheet_name(),
                    record.id
                );
                None
            }
        })
        .join("\n")
}

/// Parses a numeric id selection: comma-separated numbers and `first:last`
/// ranges, duplicates dropped, first occurrence order kept.
/// `"1:3,4"` and `"1,1:4"` both select `[1, 2, 3, 4]`; the empty string
/// selects nothing.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] listing every element that fits
/// neither form.
pub fn parse_id_selection(spec: &str) -> Result<Vec<u32>> {
    let mut ids: Vec<u32> = Vec::new();
    let mut invalid: Vec<String> = Vec::new();

    for element in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        if let Ok(id) = element.parse::<u32>() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        } else if let Some((first, last)) = parse_range(element) {
            for id in first..=last {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        } else {
            invalid.push(element.to_string());
        }
    }

    if invalid.is_empty() {
        Ok(ids)
    } else {
        Err(Error::InvalidArgument {
            requested: invalid,
            available: vec!["<n>".to_string(), "<n>:<m>".to_string()],
        })
    }
}

fn parse_range(element: &str) -> Option<(u32, u32)> {
    let caps = ID_RANGE.captures(element)?;
    Some((
        caps.get(1)?.as_str().parse().ok()?,
        caps.get(2)?.as_str().parse().ok()?,
    ))
}

/// Records whose id is one of the selected numbers. Non-numeric ids never
/// match.
#[must_use]
pub fn select_by_numeric_id<'a>(records: &'a [Record], ids: &[u32]) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| r.id.parse::<u32>().is_ok_and(|n| ids.contains(&n)))
        .collect()
}
