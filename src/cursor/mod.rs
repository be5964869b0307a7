//! Result Set Cursor
//!
//! A script execution yields an ordered sequence of result sets. The
//! [`ResultSetCursor`] trait is the forward-only view the interpreter drains;
//! [`BufferedCursor`] implements it over result sets an engine has already
//! fetched.
//!
//! # Scanning
//! Values keep their database type until a consumer scans them:
//! - text: NULL fails, numbers render in decimal, non-UTF-8 blobs are Base64 encoded
//! - integer: integers and integral reals in `i32` range, or text that parses exactly
//! - nullable text: NULL is absent, anything else scans as text

use base64::Engine;
use thiserror::Error;

/// A single column value as returned by the database
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// Why a value could not be converted to the requested type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ScanError(String);

impl ScanError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl SqlValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Scan as text; NULL is an error
    pub fn to_text(&self) -> Result<String, ScanError> {
        match self {
            Self::Null => Err(ScanError::new("converting NULL to string is unsupported")),
            Self::Integer(i) => Ok(i.to_string()),
            Self::Real(f) => Ok(f.to_string()),
            Self::Text(s) => Ok(s.clone()),
            Self::Blob(bytes) => Ok(match std::str::from_utf8(bytes) {
                Ok(s) => s.to_string(),
                Err(_) => base64::engine::general_purpose::STANDARD.encode(bytes),
            }),
        }
    }

    /// Scan as text, keeping NULL distinct from the empty string
    pub fn to_nullable_text(&self) -> Result<Option<String>, ScanError> {
        if self.is_null() {
            Ok(None)
        } else {
            self.to_text().map(Some)
        }
    }

    /// Scan as a 32-bit integer
    pub fn to_integer(&self) -> Result<i32, ScanError> {
        match self {
            Self::Null => Err(ScanError::new("converting NULL to int is unsupported")),
            Self::Integer(i) => i32::try_from(*i)
                .map_err(|_| ScanError::new(format!("value {i} out of range for int"))),
            Self::Real(f) => {
                if f.fract() == 0.0 && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX) {
                    Ok(*f as i32)
                } else {
                    Err(ScanError::new(format!("converting {f} to int: invalid syntax")))
                }
            }
            Self::Text(s) => parse_integer(s),
            Self::Blob(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => parse_integer(s),
                Err(_) => Err(ScanError::new("converting binary value to int is unsupported")),
            },
        }
    }
}

fn parse_integer(s: &str) -> Result<i32, ScanError> {
    s.parse::<i32>()
        .map_err(|e| ScanError::new(format!("converting {s:?} to int: {e}")))
}

/// Check that a row has exactly the number of values a scan expects
pub fn expect_arity(values: &[SqlValue], expected: usize) -> Result<(), ScanError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(ScanError::new(format!(
            "expected {expected} destination arguments in scan, not {}",
            values.len()
        )))
    }
}

/// One result set: a column schema and its rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Builder-style row append
    #[must_use]
    pub fn with_row(mut self, row: Vec<SqlValue>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn push_row(&mut self, row: Vec<SqlValue>) {
        self.rows.push(row);
    }
}

/// Forward-only iteration over a sequence of result sets
///
/// The cursor starts positioned on the first result set, before its first row.
pub trait ResultSetCursor {
    /// Column names of the current result set; empty when there is none
    fn columns(&self) -> &[String];

    /// Advance to the next row of the current result set
    fn next_row(&mut self) -> bool;

    /// Values of the current row
    fn scan_row(&self) -> Result<&[SqlValue], ScanError>;

    /// Advance to the next result set
    fn next_result_set(&mut self) -> bool;
}

/// Cursor over fully fetched result sets
#[derive(Debug, Clone, Default)]
pub struct BufferedCursor {
    sets: Vec<ResultSet>,
    set_index: usize,
    row_index: Option<usize>,
}

impl BufferedCursor {
    #[must_use]
    pub fn new(sets: Vec<ResultSet>) -> Self {
        Self { sets, set_index: 0, row_index: None }
    }

    /// Number of result sets the execution produced
    #[must_use]
    pub fn result_set_count(&self) -> usize {
        self.sets.len()
    }

    /// Total rows across all result sets
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.sets.iter().map(|set| set.rows.len()).sum()
    }

    fn current(&self) -> Option<&ResultSet> {
        self.sets.get(self.set_index)
    }
}

impl ResultSetCursor for BufferedCursor {
    fn columns(&self) -> &[String] {
        self.current().map(|set| set.columns.as_slice()).unwrap_or(&[])
    }

    fn next_row(&mut self) -> bool {
        let Some(row_count) = self.current().map(|set| set.rows.len()) else {
            return false;
        };
        let next = self.row_index.map_or(0, |i| i + 1);
        if next < row_count {
            self.row_index = Some(next);
            true
        } else {
            self.row_index = Some(row_count);
            false
        }
    }

    fn scan_row(&self) -> Result<&[SqlValue], ScanError> {
        let set = self.current().ok_or_else(|| ScanError::new("no current result set"))?;
        self.row_index
            .and_then(|i| set.rows.get(i))
            .map(Vec::as_slice)
            .ok_or_else(|| ScanError::new("scan called without a current row"))
    }

    fn next_result_set(&mut self) -> bool {
        if self.set_index < self.sets.len() {
            self.set_index += 1;
        }
        self.row_index = None;
        self.set_index < self.sets.len()
    }
}
