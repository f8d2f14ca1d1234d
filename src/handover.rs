//! Inbound handover sheet: search, pending list, and marking rows handed over.

use crate::columns::ColumnRule;
use crate::error::SheetError;
use crate::session::SessionContext;
use crate::sheets::SheetsClient;
use crate::status::{StatusChange, StatusWritten, audit_timestamp, write_status};
use crate::table::{Match, PENDING_LIMIT, SheetTarget};

/// Locates the handover status column
pub const HANDOVER_COLUMN: ColumnRule = ColumnRule::Any(&["handedover", "handed"]);

/// Value written when a row is handed over
pub const HANDED_OVER: &str = "Done";

/// Audit note for a handover
pub fn handover_note(actor: &str, timestamp: &str) -> String {
    format!("Handed over by {} on {}", actor, timestamp)
}

/// Operations against the handover tab
pub struct HandoverView<'a> {
    sheets: &'a SheetsClient,
    target: &'a SheetTarget,
}

impl<'a> HandoverView<'a> {
    pub fn new(sheets: &'a SheetsClient, target: &'a SheetTarget) -> Self {
        HandoverView { sheets, target }
    }

    /// Rows containing `term` in any cell
    ///
    /// An empty term returns no rows without contacting the service.
    pub async fn search(&self, ctx: &SessionContext, term: &str) -> Result<Vec<Match>, SheetError> {
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let table = self.sheets.read_table(ctx, self.target).await?;
        Ok(table.search(term))
    }

    /// Up to 50 rows not yet handed over
    ///
    /// A tab without a handover status column yields an empty list.
    pub async fn pending(&self, ctx: &SessionContext) -> Result<Vec<Match>, SheetError> {
        let table = self.sheets.read_table(ctx, self.target).await?;
        Ok(table.pending(HANDOVER_COLUMN, PENDING_LIMIT))
    }

    /// Set the row's handover status to "Done" with an audit note
    pub async fn mark_handover(
        &self,
        ctx: &SessionContext,
        row: u32,
    ) -> Result<StatusWritten, SheetError> {
        let change = StatusChange {
            rule: HANDOVER_COLUMN,
            column_label: "Handedover Status",
            value: HANDED_OVER,
            note: handover_note(&ctx.actor(), &audit_timestamp()),
        };
        write_status(self.sheets, ctx, self.target, row, &change).await
    }
}
