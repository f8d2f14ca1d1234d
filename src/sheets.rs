use crate::error::SheetError;
use crate::session::SessionContext;
use crate::table::{SheetTarget, Table};
use log::debug;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Thin client for the spreadsheet REST API (v4)
///
/// Every call is made with the access token of the session passed in; the
/// client itself holds no credentials.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: Client,
    base: Url,
}

impl SheetsClient {
    /// Create a client rooted at `base` (e.g. `https://sheets.googleapis.com`)
    pub fn new(http: Client, base: &str) -> Result<Self, SheetError> {
        let base = Url::parse(base).map_err(|e| SheetError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(SheetError::InvalidUrl(base.to_string()));
        }
        Ok(SheetsClient { http, base })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SheetError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| SheetError::InvalidUrl(self.base.to_string()))?;
            path.pop_if_empty().push("v4").push("spreadsheets").extend(segments);
        }
        Ok(url)
    }

    /// Read a rectangular range as rows of display strings
    ///
    /// Trailing empty rows and cells are omitted by the service, so rows may be
    /// ragged. Non-string cells are rendered with their JSON text.
    pub async fn get_values(
        &self,
        ctx: &SessionContext,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetError> {
        let url = self.url(&[spreadsheet_id, "values", range])?;
        debug!("GET values {}", range);
        let resp = self
            .http
            .get(url)
            .bearer_auth(&ctx.credential.access_token)
            .send()
            .await?;
        let body: ValueRange = check(resp).await?.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    /// Read a tab's header and data rows
    pub async fn read_table(
        &self,
        ctx: &SessionContext,
        target: &SheetTarget,
    ) -> Result<Table, SheetError> {
        let values = self
            .get_values(ctx, &target.spreadsheet_id, &target.data_range())
            .await?;
        Ok(Table::from_values(target, values))
    }

    /// Write one value into a single-cell range, parsed as if typed by a user
    pub async fn update_value(
        &self,
        ctx: &SessionContext,
        spreadsheet_id: &str,
        range: &str,
        value: &str,
    ) -> Result<(), SheetError> {
        let url = self.url(&[spreadsheet_id, "values", range])?;
        debug!("PUT values {} = {:?}", range, value);
        let resp = self
            .http
            .put(url)
            .bearer_auth(&ctx.credential.access_token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "range": range, "values": [[value]] }))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Attach or replace the note of one cell
    ///
    /// `row` is the 1-based sheet row, `column` the zero-based column index.
    pub async fn set_note(
        &self,
        ctx: &SessionContext,
        spreadsheet_id: &str,
        sheet_id: i64,
        row: u32,
        column: usize,
        note: &str,
    ) -> Result<(), SheetError> {
        let action = format!("{}:batchUpdate", spreadsheet_id);
        let url = self.url(&[action.as_str()])?;
        let body = json!({
            "requests": [{
                "updateCells": {
                    "range": {
                        "sheetId": sheet_id,
                        "startRowIndex": row - 1,
                        "endRowIndex": row,
                        "startColumnIndex": column,
                        "endColumnIndex": column + 1,
                    },
                    "rows": [{ "values": [{ "note": note }] }],
                    "fields": "note",
                }
            }]
        });
        debug!("POST batchUpdate note at row {} column {}", row, column);
        let resp = self
            .http
            .post(url)
            .bearer_auth(&ctx.credential.access_token)
            .json(&body)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Numeric ID of the tab titled `tab`, if the spreadsheet has one
    pub async fn sheet_id(
        &self,
        ctx: &SessionContext,
        spreadsheet_id: &str,
        tab: &str,
    ) -> Result<Option<i64>, SheetError> {
        let url = self.url(&[spreadsheet_id])?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&ctx.credential.access_token)
            .query(&[("fields", "sheets.properties")])
            .send()
            .await?;
        let body: Spreadsheet = check(resp).await?.json().await?;

        Ok(body
            .sheets
            .into_iter()
            .find(|s| s.properties.title == tab)
            .map(|s| s.properties.sheet_id))
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

async fn check(resp: Response) -> Result<Response, SheetError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::FORBIDDEN {
        return Err(SheetError::PermissionDenied);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(SheetError::Remote {
        status: status.as_u16(),
        message,
    })
}
