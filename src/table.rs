use crate::columns::{ColumnRule, HeaderMap, column_letter};
use serde::Serialize;

/// Status values that mark a handover row as finished (compared lowercased)
pub const COMPLETED_STATUSES: [&str; 3] = ["done", "completed", "yes"];

/// Maximum number of rows returned by the pending list
pub const PENDING_LIMIT: usize = 50;

/// A tab inside an external spreadsheet
///
/// `header_row` is the 1-based sheet row holding the column names. Data rows
/// start on the row below it.
#[derive(Debug, Clone)]
pub struct SheetTarget {
    /// Opaque spreadsheet ID
    pub spreadsheet_id: String,

    /// Tab name
    pub tab: String,

    /// 1-based row of the header
    pub header_row: u32,

    /// Last column fetched, as letters (e.g. "Z")
    pub last_column: String,

    /// Last sheet row fetched
    pub row_limit: u32,

    /// Header names tried in order when picking a display title for a row
    pub title_columns: Vec<String>,
}

impl SheetTarget {
    fn quoted_tab(&self) -> String {
        format!("'{}'", self.tab.replace('\'', "''"))
    }

    /// Range covering the header and every data row up to the row limit
    pub fn data_range(&self) -> String {
        format!(
            "{}!A{}:{}{}",
            self.quoted_tab(),
            self.header_row,
            self.last_column,
            self.row_limit
        )
    }

    /// Range covering the header row only
    pub fn header_range(&self) -> String {
        format!(
            "{}!A{}:{}{}",
            self.quoted_tab(),
            self.header_row,
            self.last_column,
            self.header_row
        )
    }

    /// A1 reference of a single cell in this tab
    pub fn cell_range(&self, column: usize, row: u32) -> String {
        format!("{}!{}{}", self.quoted_tab(), column_letter(column), row)
    }

    /// Physical sheet row of the data row at `offset`
    pub fn physical_row(&self, offset: usize) -> u32 {
        self.header_row + 1 + offset as u32
    }
}

/// A data row with its physical 1-based row index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub index: u32,
    pub cells: Vec<String>,
}

impl Row {
    pub fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Header and data rows read from one tab
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: HeaderMap,
    pub rows: Vec<Row>,
}

impl Table {
    /// Split raw values into header and padded data rows
    ///
    /// The first raw row is the header. Every following row is right-padded
    /// with empty strings to header width and given its physical row index.
    pub fn from_values(target: &SheetTarget, values: Vec<Vec<String>>) -> Self {
        let mut iter = values.into_iter();
        let headers = match iter.next() {
            Some(header) => HeaderMap::new(header),
            None => return Table::default(),
        };
        let width = headers.len();

        let rows = iter
            .enumerate()
            .map(|(offset, mut cells)| {
                if cells.len() < width {
                    cells.resize(width, String::new());
                }
                Row {
                    index: target.physical_row(offset),
                    cells,
                }
            })
            .collect();

        Table { headers, rows }
    }

    /// Rows with any cell containing `term`, ignoring case, in sheet order
    pub fn search(&self, term: &str) -> Vec<Match> {
        if term.is_empty() {
            return Vec::new();
        }
        let needle = term.to_lowercase();
        self.rows
            .iter()
            .filter(|row| {
                row.cells
                    .iter()
                    .any(|cell| cell.to_lowercase().contains(&needle))
            })
            .map(|row| Match::new(&self.headers, row.clone()))
            .collect()
    }

    /// Rows whose status column is not a completed value
    ///
    /// Returns an empty list when no header satisfies `rule`.
    pub fn pending(&self, rule: ColumnRule, limit: usize) -> Vec<Match> {
        let Some(column) = self.headers.find(rule) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter(|row| {
                let status = row.cell(column).to_lowercase();
                !COMPLETED_STATUSES.contains(&status.as_str())
            })
            .take(limit)
            .map(|row| Match::new(&self.headers, row.clone()))
            .collect()
    }
}

/// One header/value pair of a matched row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// A row selected by a search or the pending list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    /// Physical 1-based sheet row
    pub row_index: u32,

    /// Header/value pairs in header order
    pub fields: Vec<Field>,

    /// Cells of the padded row, including any past the header width
    pub cells: Vec<String>,
}

impl Match {
    fn new(headers: &HeaderMap, row: Row) -> Self {
        let fields = headers
            .names()
            .iter()
            .zip(row.cells.iter())
            .map(|(name, value)| Field {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        Match {
            row_index: row.index,
            fields,
            cells: row.cells,
        }
    }

    /// Value under the first header equal to `name`, ignoring case
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    /// First value found among `names`, or "N/A"
    pub fn title(&self, names: &[String]) -> String {
        names
            .iter()
            .find_map(|name| self.get(name))
            .unwrap_or("N/A")
            .to_string()
    }
}
