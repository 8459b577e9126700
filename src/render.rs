//! Rendering of reconciled records into downstream publication formats.
//!
//! Two consumers are served: one-line citation text (markdown emphasis, one
//! of three styles) and the website's publication markup. Descriptive fields
//! that may be absent (impact factor, pages, prize, URL) are driven by a
//! fixed-order table of `(predicate, render)` rules, applied only when the
//! field is present and non-empty.

use itertools::Itertools;

use crate::Record;
use crate::labels::LabelSet;
use crate::roster::Roster;

/// Citation style for text rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// `Authors. (Year). Title. Venue` with trailing descriptive fields.
    Apa,
    /// `[ID] Authors. Title. Venue, Year` with the id up front.
    Custom,
    /// Title-first, no authors; for invited talks.
    Talk,
}

/// One conditional descriptive field.
struct FieldRule {
    applies: fn(&Record) -> bool,
    render: fn(&Record) -> String,
}

const IMPACT: FieldRule = FieldRule {
    applies: |r| r.impact.as_deref().is_some_and(|v| !v.is_empty()),
    render: |r| format!(" (IF: {})", r.impact.as_deref().unwrap_or_default()),
};

const PAGES: FieldRule = FieldRule {
    applies: |r| r.pages.as_deref().is_some_and(|v| !v.is_empty()),
    render: |r| format!(", {}", r.pages.as_deref().unwrap_or_default()),
};

const PRIZE: FieldRule = FieldRule {
    applies: |r| r.prize.as_deref().is_some_and(|v| !v.is_empty()),
    render: |r| format!(". *{}*", r.prize.as_deref().unwrap_or_default()),
};

const URL: FieldRule = FieldRule {
    applies: |r| r.url.as_deref().is_some_and(|v| !v.is_empty()),
    render: |r| format!(". {}", r.url.as_deref().unwrap_or_default()),
};

fn apply_rules(rules: &[FieldRule], record: &Record) -> String {
    rules
        .iter()
        .filter(|rule| (rule.applies)(record))
        .map(|rule| (rule.render)(record))
        .collect()
}

/// Renders one record as a citation line. Roster members in the author list
/// are marked with a trailing asterisk.
#[must_use]
pub fn format_citation(record: &Record, style: Style, roster: &Roster) -> String {
    let authors = roster.mark(&record.authors_joined());
    let year = record.year.map(|y| y.to_string()).unwrap_or_default();

    match style {
        Style::Apa => format!(
            "{}. ({}). {}. *{}*{}",
            authors,
            year,
            record.title,
            record.venue,
            apply_rules(&[IMPACT, PAGES, PRIZE, URL], record),
        ),
        Style::Custom => {
            let authors = if authors.is_empty() {
                String::new()
            } else {
                format!("{authors}. ")
            };
            format!(
                "**[{}]** {}*{}*. **{}**{}, {}{}",
                record.id,
                authors,
                record.title,
                record.venue,
                apply_rules(&[IMPACT, PAGES], record),
                year,
                apply_rules(&[PRIZE], record),
            )
        }
        Style::Talk => format!(
            "{}. *{}*{}, {}.{}",
            record.title,
            record.venue,
            apply_rules(&[IMPACT, PAGES], record),
            year,
            apply_rules(&[PRIZE, URL], record),
        ),
    }
}

/// Renders one record as the website's publication markup.
#[must_use]
pub fn website_entry(record: &Record) -> String {
    let labels = record.labels.iter().join(", ");
    let data_labels = record.labels.iter().join(" ");
    let label_span = if labels.is_empty() {
        String::new()
    } else {
        format!("<span class=\"publication-label\"> (Labels: {labels})</span>")
    };
    let year = record.year.map(|y| y.to_string()).unwrap_or_default();

    format!(
        "<div class=\"publication\" data-labels=\"{}\">\n\
         \x20   <h3>{}</h3>\n\
         \x20   <p><em>{}</em></p>\n\
         \x20   <p><strong>{}</strong> ({}) <a href=\"{}\">Link to paper</a>{}</p>\n\
         </div>",
        data_labels,
        record.title,
        record.authors_joined(),
        record.venue,
        year,
        record.url.as_deref().unwrap_or_default(),
        label_span,
    )
}

/// Renders the full website listing: entries grouped by year, most recent
/// first, each group under a `## {year}` heading in its own container.
/// Records without a year are left out.
#[must_use]
pub fn website_listing(records: &[Record]) -> String {
    let years: Vec<i32> = records
        .iter()
        .filter_map(|r| r.year)
        .unique()
        .sorted_unstable_by_key(|y| std::cmp::Reverse(*y))
        .collect();

    let mut out = Vec::new();
    for year in years {
        out.push(format!("\n## {year}"));
        out.push("<div class=\"publications-container\">".to_string());
        for record in records.iter().filter(|r| r.year == Some(year)) {
            out.push(website_entry(record));
        }
        out.push("</div>".to_string());
    }
    out.join("\n")
}

/// Renders the authorized label list as the website's filter buttons.
#[must_use]
pub fn label_buttons(labels: &LabelSet) -> String {
    let mut out = String::from("<!-- label_definitions.md -->\n\n");
    for label in labels.iter() {
        out.push_str(&format!(
            "<button class=\"label\" data-label=\"{label}\">{label}</button>\n"
        ));
    }
    out
}
