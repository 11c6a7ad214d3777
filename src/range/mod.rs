// Copyright 2025 Webmobix Solutions AG
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUTHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Translation between the Sheets API's `"Sheet!A1:C10"` address notation
//! and zero-based half-open row/column bounds, plus the tabular payloads
//! ([`Table`] going out, [`DataRange`] coming back) that ride on them.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use google_sheets4::api::GridRange;

/// Date renderings accepted by the column coercion pass.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Converts a zero-based column index to a column letter (0=A, 25=Z, 26=AA, ...).
pub fn column_index_to_letters(index: usize) -> String {
    let mut result = String::new();
    let mut n = index;

    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }

    result
}

/// Converts a column letter to its zero-based index (A=0, Z=25, AA=26, ...).
pub fn column_letters_to_index(letters: &str) -> Result<usize> {
    if letters.is_empty() {
        return Err(Error::Data("column reference is empty".to_string()));
    }

    let mut index = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_uppercase() {
            return Err(Error::Data(format!("invalid column letters '{letters}'")));
        }
        index = index * 26 + (ch as usize - 'A' as usize + 1);
    }

    Ok(index - 1)
}

/// Parses a single cell reference like `"C10"` into zero-based
/// `(row, column)` indices.
pub fn parse_cell(cell: &str) -> Result<(usize, usize)> {
    let digits_at = cell
        .find(|ch: char| ch.is_ascii_digit())
        .ok_or_else(|| Error::Data(format!("cell reference '{cell}' has no row number")))?;

    let (letters, digits) = cell.split_at(digits_at);
    let row: usize = digits
        .parse()
        .map_err(|_| Error::Data(format!("invalid row number in cell reference '{cell}'")))?;
    if row == 0 {
        return Err(Error::Data(format!(
            "row numbers start at 1 in cell reference '{cell}'"
        )));
    }

    Ok((row - 1, column_letters_to_index(letters)?))
}

/// Renders zero-based `(row, column)` indices back into a cell reference.
pub fn render_cell(row: usize, column: usize) -> String {
    format!("{}{}", column_index_to_letters(column), row + 1)
}

pub(crate) struct ParsedAddress {
    pub sheet_title: Option<String>,
    pub start: (usize, usize),
}

/// Parses an address like `"Sheet1!A1:C10"` down to its sheet title and
/// start cell. A start cell without a row number (a full-column reference
/// such as `"A:C"`) is treated as row 1.
pub(crate) fn parse_address(address: &str) -> Result<ParsedAddress> {
    let (sheet_title, cells) = match address.split_once('!') {
        Some((sheet, rest)) => (Some(sheet.trim_matches('\'').to_string()), rest),
        None => (None, address),
    };

    let mut start_cell = cells.split(':').next().unwrap_or_default().to_string();
    if start_cell.is_empty() {
        return Err(Error::Data(format!("address '{address}' has no start cell")));
    }
    if !start_cell.ends_with(|ch: char| ch.is_ascii_digit()) {
        start_cell.push('1');
    }

    Ok(ParsedAddress {
        sheet_title,
        start: parse_cell(&start_cell)?,
    })
}

/// A tabular value set headed for a worksheet: named columns plus rows of
/// JSON cell values. The header row is prepended on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<serde_json::Value>>,
}

impl Table {
    /// Builds a table, rejecting empty column sets and ragged rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::Data("a table needs at least one column".to_string()));
        }
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::Data(format!(
                    "row {} has {} cells, expected {}",
                    index,
                    row.len(),
                    columns.len()
                )));
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<serde_json::Value>] {
        &self.rows
    }

    /// Flattens the table into the API's row-major grid: header first,
    /// then the body rows.
    pub(crate) fn to_grid(&self) -> Vec<Vec<serde_json::Value>> {
        let header = self
            .columns
            .iter()
            .map(|column| serde_json::Value::String(column.clone()))
            .collect();

        std::iter::once(header)
            .chain(self.rows.iter().cloned())
            .collect()
    }
}

/// One coerced cell of a [`DataRange`].
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Date(NaiveDate),
    Text(String),
    Empty,
}

fn raw_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(num) => num.to_string(),
        serde_json::Value::Bool(flag) => flag.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Strips currency and grouping punctuation and turns a parenthesized
/// negative into a leading minus, ahead of the numeric parse attempt.
fn clean_numeric(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        match ch {
            '$' | ',' | ')' => {}
            '(' => cleaned.push('-'),
            _ => cleaned.push(ch),
        }
    }
    cleaned
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// Column-wise coercion: a column becomes numeric when every non-empty
/// cell parses after cleaning (empties become 0), else a date column when
/// every non-empty cell parses as a date, else it stays text untouched.
pub(crate) fn coerce_columns(
    column_count: usize,
    raw_rows: &[Vec<serde_json::Value>],
) -> Vec<Vec<CellValue>> {
    let texts: Vec<Vec<String>> = raw_rows
        .iter()
        .map(|row| {
            (0..column_count)
                .map(|col| row.get(col).map(raw_to_string).unwrap_or_default())
                .map(|cell| cell.trim().to_string())
                .collect()
        })
        .collect();

    let mut rows = vec![Vec::with_capacity(column_count); texts.len()];

    for col in 0..column_count {
        let numeric = texts.iter().all(|row| {
            let cleaned = clean_numeric(&row[col]);
            cleaned.is_empty() || cleaned.parse::<f64>().is_ok()
        });

        if numeric {
            for (row, out) in texts.iter().zip(rows.iter_mut()) {
                let cleaned = clean_numeric(&row[col]);
                let value = cleaned.parse::<f64>().unwrap_or(0.0);
                out.push(CellValue::Number(value));
            }
            continue;
        }

        let dated = texts
            .iter()
            .all(|row| row[col].is_empty() || parse_date(&row[col]).is_some());

        for (row, out) in texts.iter().zip(rows.iter_mut()) {
            let cell = &row[col];
            if cell.is_empty() {
                out.push(CellValue::Empty);
            } else if dated {
                match parse_date(cell) {
                    Some(date) => out.push(CellValue::Date(date)),
                    None => out.push(CellValue::Empty),
                }
            } else {
                out.push(CellValue::Text(cell.clone()));
            }
        }
    }

    rows
}

/// A rectangular, half-open region of one worksheet plus its coerced
/// tabular payload. Returned by every read/write and handed back in as
/// the source of pivot table and slicer builders.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRange {
    spreadsheet_id: Option<String>,
    sheet_id: i32,
    sheet_title: Option<String>,
    start: (usize, usize),
    end: (usize, usize),
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl DataRange {
    /// Builds a range from an address plus a raw grid whose first row is
    /// the header. Upholds `end = start + shape` with the header counted
    /// in the shape.
    pub(crate) fn from_grid(
        spreadsheet_id: Option<String>,
        sheet_id: i32,
        address: &str,
        grid: &[Vec<serde_json::Value>],
    ) -> Result<Self> {
        let parsed = parse_address(address)?;

        let (header, body) = grid
            .split_first()
            .ok_or_else(|| Error::Data("range has no values".to_string()))?;
        if header.is_empty() {
            return Err(Error::Data("range has an empty header row".to_string()));
        }

        let columns: Vec<String> = header
            .iter()
            .map(|cell| raw_to_string(cell).trim().to_string())
            .collect();
        let rows = coerce_columns(columns.len(), body);

        let start = parsed.start;
        let end = (start.0 + grid.len(), start.1 + columns.len());

        Ok(Self {
            spreadsheet_id,
            sheet_id,
            sheet_title: parsed.sheet_title,
            start,
            end,
            columns,
            rows,
        })
    }

    pub fn spreadsheet_id(&self) -> Option<&str> {
        self.spreadsheet_id.as_deref()
    }

    pub fn sheet_id(&self) -> i32 {
        self.sheet_id
    }

    pub fn sheet_title(&self) -> Option<&str> {
        self.sheet_title.as_deref()
    }

    /// Zero-based `(row, column)` of the top-left cell, header included.
    pub fn start(&self) -> (usize, usize) {
        self.start
    }

    /// Half-open `(row, column)` bound just past the bottom-right cell.
    pub fn end(&self) -> (usize, usize) {
        self.end
    }

    /// `(rows, columns)` of the region, header row counted.
    pub fn shape(&self) -> (usize, usize) {
        (1 + self.rows.len(), self.columns.len())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Returns the zero-based offset of a named field within this range.
    /// Duplicate names resolve to the first occurrence.
    pub fn get_loc(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| Error::NotFound(format!("field '{name}'")))
    }

    /// The API-shaped grid range covering this region.
    pub fn grid_range(&self) -> GridRange {
        GridRange {
            sheet_id: Some(self.sheet_id),
            start_row_index: Some(self.start.0 as i32),
            end_row_index: Some(self.end.0 as i32),
            start_column_index: Some(self.start.1 as i32),
            end_column_index: Some(self.end.1 as i32),
            ..Default::default()
        }
    }
}
