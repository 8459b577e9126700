//! Reference-block rewriting.
//!
//! Free text may cite publications through bracketed id lists such as
//! `"see [J1, J5] and [C9]"`. Given a mapping produced by reconciling the
//! old collection against the new one, each id in a block is replaced with
//! its reconciled counterpart; ids the mapping could not resolve become a
//! literal `?`, marking them for manual resolution. Everything outside the
//! blocks is preserved verbatim.
//!
//! # Example
//!
//! ```
//! use bibsync::{Kind, Record, reconcile, refblocks};
//!
//! let old = vec![Record::new("J1", Kind::Article, "Alpha", "Nature")];
//! let new = vec![Record::new("J9", Kind::Article, "Alpha", "Nature")];
//! let (mapping, _) = reconcile(&old, &new, &[Kind::Article]);
//!
//! assert_eq!(
//!     refblocks::rewrite("results were [J1, J2] strong", &mapping, false),
//!     "results were [J9, ?] strong"
//! );
//! ```

use std::sync::LazyLock;

use itertools::Itertools;
use regex::{Captures, Regex};
use tracing::{info, warn};

use crate::reconcile::Mapping;

/// A bracketed comma-separated list of ids in the `{prefix}{integer}`
/// convention (J=article, C=proceedings, T=talk, B=book chapter). Bracketed
/// text that is not an id list is not a reference block.
static REF_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([JCTB]\d+(?:, [JCTB]\d+)*)\]").unwrap());

/// Placeholder for an id the mapping could not resolve.
const UNRESOLVED: &str = "?";

/// Extracts the inner content of every reference block, in order.
///
/// ```
/// use bibsync::refblocks::find_blocks;
///
/// let blocks = find_blocks("Blablabla [J1, J5] pouf pouf [C45] yay!");
/// assert_eq!(blocks, vec!["J1, J5", "C45"]);
/// ```
#[must_use]
pub fn find_blocks(text: &str) -> Vec<&str> {
    REF_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Rewrites every reference block through the mapping, leaving all other
/// text untouched. With `sort`, the rewritten ids of each block are ordered
/// lexicographically.
///
/// This is a pure string transform: no I/O, no mutation of the inputs.
#[must_use]
pub fn rewrite(text: &str, mapping: &Mapping, sort: bool) -> String {
    REF_BLOCK
        .replace_all(text, |caps: &Captures| {
            let mut new_ids: Vec<&str> = caps[1]
                .split(", ")
                .map(|old_id| {
                    let new_id = mapping.new_id(old_id).unwrap_or(UNRESOLVED);
                    if new_id == UNRESOLVED {
                        warn!("{} -> {}", old_id, new_id);
                    } else {
                        info!("{} -> {}", old_id, new_id);
                    }
                    new_id
                })
                .collect();
            if sort {
                new_ids.sort_unstable();
            }
            format!("[{}]", new_ids.iter().join(", "))
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;
    use crate::{Kind, Record};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn mapping() -> Mapping {
        // J1 -> J9; J2 has no counterpart
        let old = vec![
            Record::new("J1", Kind::Article, "Alpha", "Nature"),
            Record::new("J2", Kind::Article, "Beta", "Science"),
            Record::new("C1", Kind::Proceedings, "Gamma", "ISMRM"),
        ];
        let new = vec![
            Record::new("J9", Kind::Article, "Alpha", "Nature"),
            Record::new("C3", Kind::Proceedings, "Gamma", "ISMRM"),
        ];
        let (mapping, _) = reconcile(&old, &new, &[Kind::Article, Kind::Proceedings]);
        mapping
    }

    #[test]
    fn test_rewrite_replaces_and_marks_unresolved() {
        let result = rewrite("results were [J1, J2] strong", &mapping(), false);
        assert_eq!(result, "results were [J9, ?] strong");
    }

    #[test]
    fn test_rewrite_multiple_blocks() {
        let result = rewrite("Blablabla [J1, J2] pouf pouf [C1] yay!", &mapping(), false);
        assert_eq!(result, "Blablabla [J9, ?] pouf pouf [C3] yay!");
    }

    #[test]
    fn test_text_outside_blocks_is_verbatim() {
        let text = "prefix [J1] middle [C1] suffix";
        let result = rewrite(text, &mapping(), false);
        assert!(result.starts_with("prefix "));
        assert!(result.contains(" middle "));
        assert!(result.ends_with(" suffix"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(rewrite("", &mapping(), false), "");
        assert!(find_blocks("").is_empty());
    }

    #[test]
    fn test_no_blocks_is_identity() {
        let text = "no references here, [not an id list] either";
        assert_eq!(rewrite(text, &mapping(), false), text);
        assert!(find_blocks(text).is_empty());
    }

    #[test]
    fn test_sorted_rewrite() {
        // order is preserved by default, sorted on request
        assert_eq!(rewrite("[J1, C1]", &mapping(), false), "[J9, C3]");
        assert_eq!(rewrite("[J1, C1]", &mapping(), true), "[C3, J9]");
    }

    #[rstest]
    #[case("Blablabla [J1, J5] pouf pouf [C45] yay!", vec!["J1, J5", "C45"])]
    #[case("[T3]", vec!["T3"])]
    #[case("[B12, T3]", vec!["B12, T3"])]
    #[case("none", vec![])]
    fn test_find_blocks(#[case] text: &str, #[case] expected: Vec<&str>) {
        assert_eq!(find_blocks(text), expected);
    }
}
