//! Spreadsheet adapter.
//!
//! The source of truth is a multi-sheet workbook, one sheet per publication
//! kind, materialized locally as CSV (fetching and caching the workbook from
//! its network endpoint is the caller's concern). Each requested sheet is
//! read into [`Record`]s, tagged with its sheet name translated through the
//! canonical vocabulary, and concatenated into one collection.
//!
//! # Example
//!
//! ```
//! use bibsync::{Kind, SheetParser, Workbook};
//!
//! let workbook = Workbook::from_sheets([(
//!     "article",
//!     "ID,Title,Year,Authors,Journal/Conference\n\
//!      csv1,Spinal cord imaging,2023,\"Gros C, Cohen-Adad J\",NeuroImage",
//! )]);
//!
//! let records = SheetParser::new()
//!     .parse(&workbook, &[Kind::Article])
//!     .unwrap();
//! assert_eq!(records[0].title, "Spinal cord imaging");
//! assert_eq!(records[0].year, Some(2023));
//! ```

use std::path::Path;

use csv::ReaderBuilder;
use tracing::{info, warn};

use crate::utils::{non_empty, split_authors};
use crate::{Error, Kind, Record, Result};

/// A local materialization of the multi-sheet workbook: ordered named
/// sheets, each a CSV table.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<(String, String)>,
}

impl Workbook {
    /// Builds a workbook from in-memory sheets.
    #[must_use]
    pub fn from_sheets<'a>(sheets: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Workbook {
            sheets: sheets
                .into_iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
        }
    }

    /// Reads every `<name>.csv` file in a directory as a sheet named by its
    /// stem, in lexicographic order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the directory does not exist.
    pub fn open_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let mut sheets = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file = entry.path();
            if file.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            sheets.push((stem.to_string(), std::fs::read_to_string(&file)?));
        }
        sheets.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Workbook { sheets })
    }

    /// Names of the available sheets, in workbook order.
    #[must_use]
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn sheet(&self, name: &str) -> Option<&str> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, body)| body.as_str())
    }
}

/// Row filters applied while reading a workbook.
///
/// # Examples
///
/// ```
/// use bibsync::SheetConfig;
///
/// let config = SheetConfig {
///     min_year: Some(2015),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SheetConfig {
    /// Columns that must be non-empty for a row to be kept, on top of the
    /// hard-required matching columns. A listed column absent from a sheet
    /// is ignored for that sheet.
    pub required_columns: Vec<String>,
    /// Keep only rows from this year onward.
    pub min_year: Option<i32>,
    /// Keep only rows where this column contains `x`. The column must exist
    /// in every requested sheet.
    pub filter_column: Option<String>,
    /// Order the result by descending year instead of workbook order.
    pub reverse: bool,
}

impl Default for SheetConfig {
    fn default() -> Self {
        SheetConfig {
            required_columns: vec!["Title".to_string(), "Authors".to_string()],
            min_year: None,
            filter_column: None,
            reverse: false,
        }
    }
}

/// Parser for workbook sheets.
///
/// # Examples
///
/// ```
/// use bibsync::{Kind, SheetConfig, SheetParser, Workbook};
///
/// let workbook = Workbook::from_sheets([(
///     "article",
///     "ID,Title,Year,Authors,Journal/Conference\n\
///      csv1,Old paper,2009,Smith J,Nature\n\
///      csv2,New paper,2021,Doe J,Science",
/// )]);
///
/// let parser = SheetParser::new().with_config(SheetConfig {
///     min_year: Some(2015),
///     ..Default::default()
/// });
/// let records = parser.parse(&workbook, &[Kind::Article]).unwrap();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].title, "New paper");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SheetParser {
    config: SheetConfig,
}

impl SheetParser {
    /// Creates a parser with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser with a custom configuration.
    #[must_use]
    pub fn with_config(mut self, config: SheetConfig) -> Self {
        self.config = config;
        self
    }

    /// Reads the requested kinds out of the workbook.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when a requested kind has no sheet
    /// in the workbook, or when [`SheetConfig::filter_column`] names a
    /// column a requested sheet does not have. Both messages enumerate the
    /// available set.
    pub fn parse(&self, workbook: &Workbook, kinds: &[Kind]) -> Result<Vec<Record>> {
        let mut requested = Vec::new();
        let mut missing = Vec::new();
        for &kind in kinds {
            match workbook.sheet(kind.sheet_name()) {
                Some(body) => requested.push((kind, body)),
                None => missing.push(kind.sheet_name().to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(Error::InvalidArgument {
                requested: missing,
                available: workbook
                    .sheet_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            });
        }

        let mut records = Vec::new();
        for (kind, body) in requested {
            let before = records.len();
            self.parse_sheet(body, kind, &mut records)?;
            info!(
                "total '{}' entries: {}",
                kind.sheet_name(),
                records.len() - before
            );
        }

        if self.config.reverse {
            records.sort_by_key(|r: &Record| std::cmp::Reverse(r.year));
        }
        Ok(records)
    }

    fn parse_sheet(&self, body: &str, kind: Kind, records: &mut Vec<Record>) -> Result<()> {
        let mut reader = ReaderBuilder::new().from_reader(body.as_bytes());
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::Csv(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let column = |name: &str| headers.iter().position(|h| h == name);

        if let Some(filter) = &self.config.filter_column {
            if column(filter).is_none() {
                return Err(Error::InvalidArgument {
                    requested: vec![filter.clone()],
                    available: headers.clone(),
                });
            }
        }

        let mut sequence = 0usize;
        for row in reader.records() {
            let row = row.map_err(|e| Error::Csv(e.to_string()))?;
            let cell = |name: &str| {
                column(name)
                    .and_then(|i| row.get(i))
                    .and_then(non_empty)
            };

            // rows missing a matching key are unusable downstream
            let (Some(title), Some(year_cell), Some(venue)) =
                (cell("Title"), cell("Year"), cell("Journal/Conference"))
            else {
                continue;
            };
            if self
                .config
                .required_columns
                .iter()
                .any(|c| column(c).is_some() && cell(c).is_none())
            {
                continue;
            }
            if let Some(filter) = &self.config.filter_column {
                if cell(filter).as_deref() != Some("x") {
                    continue;
                }
            }

            let Some(year) = parse_year(&year_cell) else {
                warn!("dropping row with unparsable year: {}", title);
                continue;
            };
            if self.config.min_year.is_some_and(|min| year < min) {
                continue;
            }

            sequence += 1;
            let id = cell("ID").unwrap_or_else(|| format!("{}{}", kind.prefix(), sequence));

            let mut record = Record::new(&id, kind, &title, &venue);
            record.year = Some(year);
            record.authors = split_authors(&cell("Authors").unwrap_or_default());
            record.impact = cell("Impact");
            record.url = cell("URL");
            record.labels = cell("Labels")
                .map(|l| split_authors(&l))
                .unwrap_or_default();
            record.prize = cell("Prize");
            record.pages = cell("Volume:Pages");
            records.push(record);
        }
        Ok(())
    }
}

/// Years come out of spreadsheet exports as integers or floats; both parse.
fn parse_year(cell: &str) -> Option<i32> {
    cell.parse::<i32>()
        .ok()
        .or_else(|| cell.parse::<f64>().ok().map(|f| f as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ARTICLES: &str = "\
ID,Title,Year,Authors,Journal/Conference,Impact,URL,Labels,Prize,Volume:Pages
csv1,Spinal cord imaging,2023,\"Gros C, Cohen-Adad J\",NeuroImage,5.4,https://doi.org/10.1/x,\"MRI, Deep Learning\",,270:112-118
csv2,Axon morphometry,2019,Duval T,NeuroImage,,,,Best paper,
csv3,,2020,Nobody N,Nowhere,,,,,
csv4,No venue,2020,Nobody N,,,,,,";

    const TALKS: &str = "\
ID,Title,Year,Journal/Conference
t1,Invited talk,2022,MIT";

    fn workbook() -> Workbook {
        Workbook::from_sheets([("article", ARTICLES), ("talk", TALKS)])
    }

    #[test]
    fn test_parse_basic_sheet() {
        let records = SheetParser::new()
            .parse(&workbook(), &[Kind::Article])
            .unwrap();

        // csv3 (no title) and csv4 (no venue) are dropped
        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.id, "csv1");
        assert_eq!(first.kind, Kind::Article);
        assert_eq!(first.authors, vec!["Gros C", "Cohen-Adad J"]);
        assert_eq!(first.year, Some(2023));
        assert_eq!(first.impact.as_deref(), Some("5.4"));
        assert_eq!(first.labels, vec!["MRI", "Deep Learning"]);
        assert_eq!(first.pages.as_deref(), Some("270:112-118"));
        assert_eq!(first.prize, None);
        assert_eq!(records[1].prize.as_deref(), Some("Best paper"));
    }

    #[test]
    fn test_kind_comes_from_the_sheet() {
        // the talk sheet has no Authors column; a required column a sheet
        // does not have is ignored for that sheet
        let records = SheetParser::new()
            .parse(&workbook(), &[Kind::Article, Kind::Talk])
            .unwrap();
        assert_eq!(records.last().unwrap().kind, Kind::Talk);
        assert_eq!(records.last().unwrap().id, "t1");
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_unknown_sheet_is_invalid_argument() {
        let err = SheetParser::new()
            .parse(&workbook(), &[Kind::Proceedings])
            .unwrap_err();
        match err {
            Error::InvalidArgument {
                requested,
                available,
            } => {
                assert_eq!(requested, vec!["proceedings"]);
                assert_eq!(available, vec!["article", "talk"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_min_year_filter() {
        let parser = SheetParser::new().with_config(SheetConfig {
            min_year: Some(2020),
            ..Default::default()
        });
        let records = parser.parse(&workbook(), &[Kind::Article]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "csv1");
    }

    #[test]
    fn test_filter_column() {
        let sheet = "\
ID,Title,Year,Authors,Journal/Conference,IVADO
a,Kept,2020,X Y,V,x
b,Dropped,2020,X Y,V,";
        let workbook = Workbook::from_sheets([("article", sheet)]);
        let parser = SheetParser::new().with_config(SheetConfig {
            filter_column: Some("IVADO".to_string()),
            ..Default::default()
        });
        let records = parser.parse(&workbook, &[Kind::Article]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Kept");

        let parser = SheetParser::new().with_config(SheetConfig {
            filter_column: Some("NoSuchColumn".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            parser.parse(&workbook, &[Kind::Article]),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_reverse_orders_by_descending_year() {
        let parser = SheetParser::new().with_config(SheetConfig {
            reverse: true,
            ..Default::default()
        });
        let records = parser.parse(&workbook(), &[Kind::Article]).unwrap();
        assert_eq!(records[0].year, Some(2023));
        assert_eq!(records[1].year, Some(2019));
    }

    #[test]
    fn test_synthesized_id_when_column_empty() {
        let sheet = "\
Title,Year,Authors,Journal/Conference
First,2020,X Y,V
Second,2021,X Y,V";
        let workbook = Workbook::from_sheets([("proceedings", sheet)]);
        let records = SheetParser::new()
            .parse(&workbook, &[Kind::Proceedings])
            .unwrap();
        assert_eq!(records[0].id, "C1");
        assert_eq!(records[1].id, "C2");
    }

    #[test]
    fn test_float_year_from_spreadsheet_export() {
        assert_eq!(parse_year("2023"), Some(2023));
        assert_eq!(parse_year("2023.0"), Some(2023));
        assert_eq!(parse_year("n/a"), None);
    }

    #[test]
    fn test_open_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(Workbook::open_dir(&missing), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_open_dir_reads_csv_sheets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("article.csv"), ARTICLES).unwrap();
        std::fs::write(dir.path().join("talk.csv"), TALKS).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let workbook = Workbook::open_dir(dir.path()).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["article", "talk"]);
    }
}
