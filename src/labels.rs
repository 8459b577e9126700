//! Authorized-label validation.
//!
//! Spreadsheet records may carry category labels used to group publications
//! on the website. Labels are validated against a newline-delimited
//! authorized list; any record with an unauthorized label fails the run
//! before any output is produced.

use std::collections::BTreeSet;
use std::path::Path;

use itertools::Itertools;
use tracing::info;

use crate::{Error, Record, Result};

/// The set of authorized category labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    names: BTreeSet<String>,
}

impl LabelSet {
    /// Reads a newline-delimited label list from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the path does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let body = std::fs::read_to_string(path)?;
        Ok(Self::from_names(body.lines()))
    }

    /// Builds the set from label names; blank lines are dropped.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        LabelSet {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.names.contains(label.trim())
    }

    /// Authorized labels in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Checks every record's labels against the authorized set.
///
/// # Errors
///
/// Returns [`Error::Validation`] listing each offending record id with its
/// invalid labels. Records without labels pass.
pub fn validate(records: &[Record], allowed: &LabelSet) -> Result<()> {
    info!("checking labels...");
    let offending: Vec<String> = records
        .iter()
        .filter_map(|record| {
            let invalid: Vec<&str> = record
                .labels
                .iter()
                .map(String::as_str)
                .filter(|l| !allowed.contains(l))
                .collect();
            if invalid.is_empty() {
                None
            } else {
                Some(format!("{}: {}", record.id, invalid.iter().join(", ")))
            }
        })
        .collect();

    if offending.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(offending.join("\n")))
    }
}
