use crate::columns::ColumnRule;
use crate::error::SheetError;
use crate::session::SessionContext;
use crate::sheets::SheetsClient;
use crate::status::{StatusChange, StatusWritten, audit_timestamp, write_status};
use crate::table::{Match, SheetTarget};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Locates the packing status column
pub const PACKING_COLUMN: ColumnRule = ColumnRule::All(&["packing", "status"]);

/// Packing status applied to a bundle during kitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackingStatus {
    Packed,
    Hold,
    Issue,
}

impl PackingStatus {
    pub const ALL: [PackingStatus; 3] = [
        PackingStatus::Packed,
        PackingStatus::Hold,
        PackingStatus::Issue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackingStatus::Packed => "Packed",
            PackingStatus::Hold => "Hold",
            PackingStatus::Issue => "Issue",
        }
    }
}

impl fmt::Display for PackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PackingStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown packing status {:?}", s))
    }
}

/// Audit note for a packing status change
pub fn packing_note(status: PackingStatus, actor: &str, timestamp: &str) -> String {
    format!("Marked '{}' by {} on {}", status, actor, timestamp)
}

/// Operations against the bundling tab
pub struct BundlingView<'a> {
    sheets: &'a SheetsClient,
    target: &'a SheetTarget,
}

impl<'a> BundlingView<'a> {
    pub fn new(sheets: &'a SheetsClient, target: &'a SheetTarget) -> Self {
        BundlingView { sheets, target }
    }

    /// Rows containing `term` in any cell
    pub async fn search(&self, ctx: &SessionContext, term: &str) -> Result<Vec<Match>, SheetError> {
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let table = self.sheets.read_table(ctx, self.target).await?;
        Ok(table.search(term))
    }

    /// Set the row's packing status with an audit note
    pub async fn mark_status(
        &self,
        ctx: &SessionContext,
        row: u32,
        status: PackingStatus,
    ) -> Result<StatusWritten, SheetError> {
        let change = StatusChange {
            rule: PACKING_COLUMN,
            column_label: "Packing Status",
            value: status.as_str(),
            note: packing_note(status, &ctx.actor(), &audit_timestamp()),
        };
        write_status(self.sheets, ctx, self.target, row, &change).await
    }
}
