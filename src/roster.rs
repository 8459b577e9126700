//! Student roster configuration.
//!
//! The roster is an explicit, externally loaded set of student display
//! names. Formatting and rewrite calls receive it by reference; there is no
//! process-wide mutable list, so nothing leaks between invocations.

use std::collections::BTreeSet;
use std::path::Path;

use itertools::Itertools;

use crate::{Error, Result};

/// An immutable set of student author display names.
///
/// # Examples
///
/// ```
/// use bibsync::Roster;
///
/// let roster = Roster::from_names(["Gros C", "Duval T"]);
/// assert_eq!(roster.mark("Gros C, Cohen-Adad J"), "Gros C*, Cohen-Adad J");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    names: BTreeSet<String>,
}

impl Roster {
    /// Reads a newline-delimited name list from disk.
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

    /// Builds a roster from names; blank lines are dropped.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Roster {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Marks every roster member in a comma-joined author list with a
    /// trailing asterisk. Pre-existing asterisks are stripped first, so
    /// marking is idempotent. Name spacing is normalized to `", "`.
    #[must_use]
    pub fn mark(&self, authors: &str) -> String {
        authors
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|author| {
                let bare = author.replace('*', "");
                if self.contains(&bare) {
                    format!("{bare}*")
                } else {
                    bare
                }
            })
            .join(", ")
    }
}
