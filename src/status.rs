use crate::columns::{ColumnRule, HeaderMap, column_letter};
use crate::error::SheetError;
use crate::session::SessionContext;
use crate::sheets::SheetsClient;
use crate::table::SheetTarget;
use chrono::Local;
use log::{info, warn};

/// Timestamp format used in audit notes
pub const NOTE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A status flip on one row: which column, what value, which audit note
#[derive(Debug, Clone)]
pub struct StatusChange<'a> {
    /// Rule locating the status column by header name
    pub rule: ColumnRule,

    /// Human name of the column, used in the not-found error
    pub column_label: &'a str,

    /// Value written into the cell
    pub value: &'a str,

    /// Note attached to the cell
    pub note: String,
}

/// Result of a successful status write
#[derive(Debug, Clone, PartialEq)]
pub struct StatusWritten {
    /// A1 reference of the updated cell
    pub cell: String,

    /// Whether the audit note was attached
    pub note_attached: bool,
}

/// Current local time in the note format
pub fn audit_timestamp() -> String {
    Local::now().format(NOTE_TIMESTAMP_FORMAT).to_string()
}

/// Write a status value and its audit note into one row
///
/// The column is re-resolved from the header row on every call. The value
/// and the note are two separate remote writes: if the note fails after the
/// value succeeded, the value stays and the error is returned.
///
/// # Errors
/// * `SheetError::InvalidRow` if `row` is not below the header
/// * `SheetError::ColumnNotFound` if no header satisfies the rule
/// * any remote error from the header read, metadata read, or writes
pub async fn write_status(
    sheets: &SheetsClient,
    ctx: &SessionContext,
    target: &SheetTarget,
    row: u32,
    change: &StatusChange<'_>,
) -> Result<StatusWritten, SheetError> {
    if row <= target.header_row {
        return Err(SheetError::InvalidRow(row));
    }

    let header_values = sheets
        .get_values(ctx, &target.spreadsheet_id, &target.header_range())
        .await?;
    let headers = HeaderMap::new(header_values.into_iter().next().unwrap_or_default());
    let column = headers
        .find(change.rule)
        .ok_or_else(|| SheetError::ColumnNotFound(change.column_label.to_string()))?;

    let sheet_id = sheets
        .sheet_id(ctx, &target.spreadsheet_id, &target.tab)
        .await?;

    let cell = target.cell_range(column, row);
    sheets
        .update_value(ctx, &target.spreadsheet_id, &cell, change.value)
        .await?;
    info!(
        "{} set {}{} to {:?}",
        ctx.actor(),
        column_letter(column),
        row,
        change.value
    );

    let note_attached = match sheet_id {
        Some(sheet_id) => {
            sheets
                .set_note(ctx, &target.spreadsheet_id, sheet_id, row, column, &change.note)
                .await?;
            true
        }
        None => {
            warn!("tab {:?} not found in metadata, note skipped", target.tab);
            false
        }
    };

    Ok(StatusWritten {
        cell,
        note_attached,
    })
}
