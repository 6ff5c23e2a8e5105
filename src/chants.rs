//! Chant sources.
//!
//! A chant list is a CSV with a header row naming `inhale` and `exhale`
//! columns and, optionally, a `repeat` column:
//!
//! ```text
//! inhale,exhale,repeat
//! Om namo,shivaya,3
//! So,ham,
//! ```
//!
//! Each row expands into `repeat` identical [`ChantPair`]s (blank means 1).
//! Row order and repeat order are preserved, which is what makes the final
//! track reproducible.

use std::fs::File;
use std::io::Read;
use std::path::Path;

const INHALE: &str = "inhale";
const EXHALE: &str = "exhale";
const REPEAT: &str = "repeat";

/// Upper bound on the expanded chant count. Each chant costs two synthesis
/// calls, so anything near this is a typo rather than a session.
pub const MAX_CHANTS: usize = 100_000;

#[derive(thiserror::Error, Debug)]
pub enum ChantError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV has no header row.")]
    NoHeader,
    #[error("CSV missing required columns: {0:?}")]
    MissingColumns(Vec<String>),
    #[error("Row {row}: inhale/exhale cannot be empty.")]
    EmptyPhrase { row: usize },
    #[error("Row {row}: repeat must be an integer (got '{value}').")]
    RepeatNotInteger { row: usize, value: String },
    #[error("Row {row}: repeat must be >= 1 (got {value}).")]
    RepeatTooSmall { row: usize, value: i64 },
    #[error("Row {row}: repeat must be <= {max} (got {value}).", max = MAX_CHANTS)]
    RepeatTooLarge { row: usize, value: String },
    #[error("Chant list expands past {} chants.", MAX_CHANTS)]
    TooManyChants,
    #[error("No chants found in CSV.")]
    Empty,
}

/// One inhale phrase and one exhale phrase spoken within a breath cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChantPair {
    inhale: String,
    exhale: String,
}

impl ChantPair {
    /// Returns `None` if either phrase is blank.
    pub fn new(inhale: impl Into<String>, exhale: impl Into<String>) -> Option<Self> {
        let inhale = inhale.into().trim().to_string();
        let exhale = exhale.into().trim().to_string();
        if inhale.is_empty() || exhale.is_empty() {
            return None;
        }
        Some(Self { inhale, exhale })
    }

    pub fn inhale(&self) -> &str {
        &self.inhale
    }

    pub fn exhale(&self) -> &str {
        &self.exhale
    }
}

/// A source row before repeat expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChantRow {
    pub pair: ChantPair,
    pub repeat: usize,
}

impl ChantRow {
    pub fn new(pair: ChantPair, repeat: usize) -> Self {
        Self { pair, repeat }
    }
}

/// Expand rows into the ordered chant sequence.
///
/// Used for both CSV input and preloaded literal lists.
pub fn expand_rows(rows: impl IntoIterator<Item = ChantRow>) -> Result<Vec<ChantPair>, ChantError> {
    let mut chants = Vec::new();
    let mut total: usize = 0;
    for row in rows {
        total = total
            .checked_add(row.repeat)
            .filter(|&n| n <= MAX_CHANTS)
            .ok_or(ChantError::TooManyChants)?;
        chants.extend(std::iter::repeat(row.pair).take(row.repeat));
    }
    if chants.is_empty() {
        return Err(ChantError::Empty);
    }
    Ok(chants)
}

/// Load and expand a chant CSV from disk.
pub fn load_chants(path: &Path) -> Result<Vec<ChantPair>, ChantError> {
    let file = File::open(path)?;
    let chants = read_chants(file)?;
    log::info!("Loaded {} chants from {}", chants.len(), path.display());
    Ok(chants)
}

/// Parse and expand a chant CSV from any reader.
pub fn read_chants<R: Read>(reader: R) -> Result<Vec<ChantPair>, ChantError> {
    expand_rows(read_rows(reader)?)
}

/// Parse a chant CSV into unexpanded rows, validating every cell.
///
/// Row numbers in errors count the header as row 1.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<ChantRow>, ChantError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ChantError::NoHeader);
    }

    let column = |name: &str| headers.iter().position(|h| h == name);
    let missing: Vec<String> = [INHALE, EXHALE]
        .into_iter()
        .filter(|name| column(*name).is_none())
        .map(str::to_string)
        .collect();
    let (Some(inhale_col), Some(exhale_col)) = (column(INHALE), column(EXHALE)) else {
        return Err(ChantError::MissingColumns(missing));
    };
    let repeat_col = column(REPEAT);

    let mut rows = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let record = record?;
        let row = index + 2;
        let cell = |col: usize| record.get(col).unwrap_or("").trim();

        let pair = ChantPair::new(cell(inhale_col), cell(exhale_col))
            .ok_or(ChantError::EmptyPhrase { row })?;
        let repeat = match repeat_col.map(cell) {
            None | Some("") => 1,
            Some(raw) => parse_repeat(raw, row)?,
        };
        rows.push(ChantRow::new(pair, repeat));
    }
    Ok(rows)
}

fn parse_repeat(raw: &str, row: usize) -> Result<usize, ChantError> {
    let value: i64 = raw.parse().map_err(|_| ChantError::RepeatNotInteger {
        row,
        value: raw.to_string(),
    })?;
    if value < 1 {
        return Err(ChantError::RepeatTooSmall { row, value });
    }
    usize::try_from(value)
        .ok()
        .filter(|&n| n <= MAX_CHANTS)
        .ok_or_else(|| ChantError::RepeatTooLarge {
            row,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(csv: &str) -> Result<Vec<ChantPair>, ChantError> {
        read_chants(csv.as_bytes())
    }

    fn texts(chants: &[ChantPair]) -> Vec<(&str, &str)> {
        chants.iter().map(|c| (c.inhale(), c.exhale())).collect()
    }

    #[test]
    fn expands_repeats_in_row_order() {
        let chants = load("inhale,exhale,repeat\na,b,2\nc,d,\ne,f,3\n").unwrap();
        assert_eq!(chants.len(), 2 + 1 + 3);
        assert_eq!(
            texts(&chants),
            vec![
                ("a", "b"),
                ("a", "b"),
                ("c", "d"),
                ("e", "f"),
                ("e", "f"),
                ("e", "f"),
            ]
        );
    }

    #[test]
    fn repeat_column_is_optional() {
        let chants = load("exhale,inhale\nout,in\n").unwrap();
        assert_eq!(texts(&chants), vec![("in", "out")]);
    }

    #[test]
    fn tolerates_bom_and_padded_headers() {
        let chants = load("\u{feff} inhale , exhale \n  so , ham  \n").unwrap();
        assert_eq!(texts(&chants), vec![("so", "ham")]);
    }

    #[test]
    fn missing_exhale_column_is_named() {
        match load("inhale,repeat\na,1\n") {
            Err(ChantError::MissingColumns(cols)) => assert_eq!(cols, vec!["exhale"]),
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn empty_inhale_reports_its_row() {
        let err = load("inhale,exhale\na,b\n ,d\n").unwrap_err();
        assert!(matches!(err, ChantError::EmptyPhrase { row: 3 }));
        assert_eq!(err.to_string(), "Row 3: inhale/exhale cannot be empty.");
    }

    #[test]
    fn short_row_counts_as_empty_cell() {
        let err = load("inhale,exhale\na\n").unwrap_err();
        assert!(matches!(err, ChantError::EmptyPhrase { row: 2 }));
    }

    #[test]
    fn rejects_non_positive_repeat() {
        for bad in ["0", "-1"] {
            let err = load(&format!("inhale,exhale,repeat\na,b,{bad}\n")).unwrap_err();
            assert!(matches!(err, ChantError::RepeatTooSmall { row: 2, .. }), "{bad}");
        }
    }

    #[test]
    fn rejects_non_integer_repeat() {
        let err = load("inhale,exhale,repeat\na,b,abc\n").unwrap_err();
        match err {
            ChantError::RepeatNotInteger { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("expected RepeatNotInteger, got {other:?}"),
        }
    }

    #[test]
    fn huge_repeat_is_a_format_error() {
        let err = load("inhale,exhale,repeat\na,b,1000000000000000\n").unwrap_err();
        match err {
            ChantError::RepeatTooLarge { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "1000000000000000");
            }
            other => panic!("expected RepeatTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn repeat_overflowing_i64_is_not_an_integer() {
        let err = load("inhale,exhale,repeat\na,b,99999999999999999999\n").unwrap_err();
        assert!(matches!(err, ChantError::RepeatNotInteger { row: 2, .. }));
    }

    #[test]
    fn total_expansion_is_capped() {
        let csv = format!("inhale,exhale,repeat\na,b,{MAX_CHANTS}\nc,d,1\n");
        assert!(matches!(load(&csv), Err(ChantError::TooManyChants)));

        let pair = ChantPair::new("a", "b").unwrap();
        let rows = [ChantRow::new(pair.clone(), usize::MAX), ChantRow::new(pair, 1)];
        assert!(matches!(expand_rows(rows), Err(ChantError::TooManyChants)));
    }

    #[test]
    fn header_only_source_is_empty() {
        assert!(matches!(load("inhale,exhale\n"), Err(ChantError::Empty)));
    }

    #[test]
    fn literal_rows_expand_like_csv_rows() {
        let pair = ChantPair::new("Om", "namah").unwrap();
        let chants = expand_rows([ChantRow::new(pair.clone(), 108)]).unwrap();
        assert_eq!(chants.len(), 108);
        assert!(chants.iter().all(|c| *c == pair));
    }

    #[test]
    fn blank_phrases_are_not_pairs() {
        assert!(ChantPair::new("  ", "x").is_none());
        assert!(ChantPair::new("x", "").is_none());
    }
}
