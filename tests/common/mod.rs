#![allow(dead_code)]

//! In-process stand-in for the identity provider and the Sheets REST API.

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use warehouse::auth::{Credential, UserInfo};
use warehouse::columns::column_index;
use warehouse::config::Config;
use warehouse::session::SessionContext;

pub const HANDOVER_ID: &str = "handover-sheet";
pub const BUNDLING_ID: &str = "bundling-sheet";
pub const TOKEN: &str = "test-access-token";
pub const GOOD_CODE: &str = "good-code";
pub const ACTOR: &str = "Asha Verma";

#[derive(Debug, Clone, Default)]
pub struct MockTab {
    pub title: String,
    pub sheet_id: i64,
    /// grid[0] is sheet row 1
    pub grid: Vec<Vec<String>>,
    /// (1-based row, 0-based column) -> note
    pub notes: HashMap<(u32, usize), String>,
}

impl MockTab {
    pub fn new(title: &str, sheet_id: i64, rows: &[&[&str]]) -> Self {
        MockTab {
            title: title.to_string(),
            sheet_id,
            grid: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            notes: HashMap::new(),
        }
    }

    /// Value of a cell by 1-based row and 0-based column
    pub fn cell(&self, row: u32, column: usize) -> String {
        self.grid
            .get(row as usize - 1)
            .and_then(|r| r.get(column))
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockSpreadsheet {
    pub tabs: Vec<MockTab>,
    pub deny: bool,
    pub hide_metadata: bool,
    pub fail_notes: bool,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub spreadsheets: HashMap<String, MockSpreadsheet>,
    pub value_input_options: Vec<String>,
    pub refresh_count: usize,
}

pub type Shared = Arc<Mutex<MockState>>;

pub struct MockGoogle {
    pub base: String,
    pub state: Shared,
}

impl MockGoogle {
    pub fn tab(&self, spreadsheet: &str, title: &str) -> MockTab {
        let state = self.state.lock().unwrap();
        state.spreadsheets[spreadsheet]
            .tabs
            .iter()
            .find(|t| t.title == title)
            .cloned()
            .expect("tab exists")
    }

    pub fn update(&self, spreadsheet: &str, f: impl FnOnce(&mut MockSpreadsheet)) {
        let mut state = self.state.lock().unwrap();
        f(state.spreadsheets.get_mut(spreadsheet).expect("spreadsheet exists"));
    }

    /// Configuration pointing every remote endpoint at this mock
    pub fn config(&self) -> Config {
        let base = self.base.clone();
        Config::from_lookup(move |name| {
            let value = match name {
                "GOOGLE_CLIENT_ID" => "client-1".to_string(),
                "GOOGLE_CLIENT_SECRET" => "secret-1".to_string(),
                "REDIRECT_URI" => "http://localhost:3000/oauth/callback".to_string(),
                "GOOGLE_AUTH_URI" => format!("{}/auth", base),
                "GOOGLE_TOKEN_URI" => format!("{}/token", base),
                "GOOGLE_USERINFO_URI" => format!("{}/userinfo", base),
                "SHEETS_API_BASE" => base.clone(),
                "HANDOVER_SHEET_ID" => HANDOVER_ID.to_string(),
                "BUNDLING_SHEET_ID" => BUNDLING_ID.to_string(),
                _ => return None,
            };
            Some(value)
        })
        .expect("mock config is complete")
    }
}

/// Session context holding the token the mock accepts
pub fn context() -> SessionContext {
    SessionContext {
        credential: Credential {
            access_token: TOKEN.to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: None,
            token_uri: String::new(),
            client_id: "client-1".to_string(),
        },
        user: UserInfo {
            name: Some(ACTOR.to_string()),
            email: Some("asha@example.com".to_string()),
        },
    }
}

/// Handover tab: two title rows, header on row 3
pub fn handover_tab(rows: &[&[&str]]) -> MockTab {
    let title: &[&str] = &["Inbound Dump"];
    let blank: &[&str] = &[];
    let header: &[&str] = &["Order No", "Vendor", "Qty", "Handedover Status"];
    let mut all = vec![title, blank, header];
    all.extend_from_slice(rows);
    MockTab::new("Inbound Dump", 101, &all)
}

/// Bundling tab: header on row 1
pub fn bundling_tab(rows: &[&[&str]]) -> MockTab {
    let header: &[&str] = &["Fleek/Order ID", "Bundle ID", "Customer", "Packing Status"];
    let mut all = vec![header];
    all.extend_from_slice(rows);
    MockTab::new("Albash working-2", 202, &all)
}

/// Start a mock server holding the given tabs
pub async fn spawn(handover: MockTab, bundling: MockTab) -> MockGoogle {
    let mut state = MockState::default();
    state.spreadsheets.insert(
        HANDOVER_ID.to_string(),
        MockSpreadsheet {
            tabs: vec![handover],
            ..Default::default()
        },
    );
    state.spreadsheets.insert(
        BUNDLING_ID.to_string(),
        MockSpreadsheet {
            tabs: vec![bundling],
            ..Default::default()
        },
    );
    let shared: Shared = Arc::new(Mutex::new(state));

    let app = Router::new()
        .route("/token", post(token))
        .route("/userinfo", get(userinfo))
        .route("/v4/spreadsheets/:id", get(metadata).post(batch_update))
        .route(
            "/v4/spreadsheets/:id/values/:range",
            get(get_values).put(put_values),
        )
        .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockGoogle {
        base: format!("http://{}", addr),
        state: shared,
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN) || v == "Bearer refreshed-token")
        .unwrap_or(false)
}

fn google_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message } })),
    )
        .into_response()
}

/// Parsed A1 range: tab, 1-based rows, 0-based columns (inclusive)
struct A1 {
    tab: String,
    first_row: u32,
    last_row: u32,
    first_col: usize,
    last_col: usize,
}

fn split_ref(cell: &str) -> (usize, u32) {
    let split = cell.find(|c: char| c.is_ascii_digit()).unwrap();
    let (letters, digits) = cell.split_at(split);
    (column_index(letters).unwrap(), digits.parse().unwrap())
}

fn parse_a1(range: &str) -> A1 {
    let (tab, cells) = range.rsplit_once('!').unwrap();
    let tab = tab
        .trim_start_matches('\'')
        .trim_end_matches('\'')
        .replace("''", "'");
    let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
    let (first_col, first_row) = split_ref(start);
    let (last_col, last_row) = split_ref(end);
    A1 {
        tab,
        first_row,
        last_row,
        first_col,
        last_col,
    }
}

fn with_tab<F>(state: &Shared, id: &str, tab: &str, f: F) -> Response
where
    F: FnOnce(&mut MockSpreadsheet, usize) -> Response,
{
    let mut state = state.lock().unwrap();
    let Some(sheet) = state.spreadsheets.get_mut(id) else {
        return google_error(StatusCode::NOT_FOUND, "Requested entity was not found.");
    };
    if sheet.deny {
        return google_error(StatusCode::FORBIDDEN, "The caller does not have permission");
    }
    let Some(pos) = sheet.tabs.iter().position(|t| t.title == tab) else {
        return google_error(StatusCode::BAD_REQUEST, "Unable to parse range");
    };
    f(sheet, pos)
}

async fn get_values(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, range)): Path<(String, String)>,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    let a1 = parse_a1(&range);
    with_tab(&state, &id, &a1.tab, |sheet, pos| {
        let tab = &sheet.tabs[pos];
        let mut rows: Vec<Vec<String>> = Vec::new();
        for row in a1.first_row..=a1.last_row {
            let Some(source) = tab.grid.get(row as usize - 1) else {
                break;
            };
            let mut cells: Vec<String> = source
                .iter()
                .enumerate()
                .filter(|(c, _)| *c >= a1.first_col && *c <= a1.last_col)
                .map(|(_, v)| v.clone())
                .collect();
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            rows.push(cells);
        }
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }

        if rows.is_empty() {
            Json(json!({ "range": range, "majorDimension": "ROWS" })).into_response()
        } else {
            Json(json!({ "range": range, "majorDimension": "ROWS", "values": rows }))
                .into_response()
        }
    })
}

async fn put_values(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, range)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    if let Some(option) = query.get("valueInputOption") {
        state.lock().unwrap().value_input_options.push(option.clone());
    }
    let a1 = parse_a1(&range);
    let value = body["values"][0][0].as_str().unwrap_or_default().to_string();
    with_tab(&state, &id, &a1.tab, |sheet, pos| {
        let grid = &mut sheet.tabs[pos].grid;
        let row = a1.first_row as usize - 1;
        if grid.len() <= row {
            grid.resize(row + 1, Vec::new());
        }
        if grid[row].len() <= a1.first_col {
            grid[row].resize(a1.first_col + 1, String::new());
        }
        grid[row][a1.first_col] = value;
        Json(json!({ "updatedRange": range, "updatedCells": 1 })).into_response()
    })
}

async fn metadata(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    let state = state.lock().unwrap();
    let Some(sheet) = state.spreadsheets.get(&id) else {
        return google_error(StatusCode::NOT_FOUND, "Requested entity was not found.");
    };
    if sheet.deny {
        return google_error(StatusCode::FORBIDDEN, "The caller does not have permission");
    }
    let sheets: Vec<Value> = if sheet.hide_metadata {
        Vec::new()
    } else {
        sheet
            .tabs
            .iter()
            .map(|t| {
                json!({
                    "properties": { "sheetId": t.sheet_id, "title": t.title, "index": 0 }
                })
            })
            .collect()
    };
    Json(json!({ "spreadsheetId": id, "sheets": sheets })).into_response()
}

async fn batch_update(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(action): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    let Some(id) = action.strip_suffix(":batchUpdate") else {
        return google_error(StatusCode::NOT_FOUND, "Unknown method");
    };
    let mut state = state.lock().unwrap();
    let Some(sheet) = state.spreadsheets.get_mut(id) else {
        return google_error(StatusCode::NOT_FOUND, "Requested entity was not found.");
    };
    if sheet.fail_notes {
        return google_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error encountered.");
    }

    let update = &body["requests"][0]["updateCells"];
    let range = &update["range"];
    let sheet_id = range["sheetId"].as_i64().unwrap_or(-1);
    let row = range["startRowIndex"].as_u64().unwrap_or(0) as u32 + 1;
    let column = range["startColumnIndex"].as_u64().unwrap_or(0) as usize;
    let note = update["rows"][0]["values"][0]["note"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert_eq!(update["fields"], "note");

    let Some(tab) = sheet.tabs.iter_mut().find(|t| t.sheet_id == sheet_id) else {
        return google_error(StatusCode::BAD_REQUEST, "No grid with id");
    };
    tab.notes.insert((row, column), note);
    Json(json!({ "spreadsheetId": id, "replies": [{}] })).into_response()
}

async fn token(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Response {
    if form.get("client_id").map(String::as_str) != Some("client-1")
        || form.get("client_secret").map(String::as_str) != Some("secret-1")
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_client" })),
        )
            .into_response();
    }

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") if form.get("code").map(String::as_str) == Some(GOOD_CODE) => {
            Json(json!({
                "access_token": TOKEN,
                "expires_in": 3599,
                "refresh_token": "refresh-1",
                "scope": "openid",
                "token_type": "Bearer",
            }))
            .into_response()
        }
        Some("refresh_token")
            if form.get("refresh_token").map(String::as_str) == Some("refresh-1") =>
        {
            state.lock().unwrap().refresh_count += 1;
            Json(json!({
                "access_token": "refreshed-token",
                "expires_in": 3599,
                "token_type": "Bearer",
            }))
            .into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Bad Request" })),
        )
            .into_response(),
    }
}

async fn userinfo(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    Json(json!({
        "id": "1234",
        "email": "asha@example.com",
        "name": ACTOR,
        "verified_email": true,
    }))
    .into_response()
}
