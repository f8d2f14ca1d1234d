/*!
# Warehouse Desk

A browser-based front end for warehouse staff working two shared spreadsheets:
the inbound handover sheet and the bundling sheet.

## Overview

Clerks log in with their Google account, search either sheet for an order,
and flip status flags on the matching rows. Every change writes the new value
into the row's status cell and attaches a note recording who made it and when.
All durable state lives in the spreadsheets; the server keeps only in-memory
login sessions.

## Architecture

### Web Layer
- **Technologies**: axum, handlebars templates, cookie sessions
- **Views**:
  - Search & Handover - search the inbound sheet and mark rows handed over
  - Bundling - search the bundling sheet and mark rows Packed / Hold / Issue
  - Pending List - up to 50 inbound rows not yet handed over

### Remote Services
- Identity provider - OAuth2 authorization-code login and user info
- Sheets REST API (v4) - value reads and writes, cell notes, tab metadata

## Modules

- **config**: Environment configuration and sheet targets
- **error**: Error types for configuration, login, and sheet access
- **auth**: OAuth client, credentials, and user info
- **session**: Per-browser session store and login state
- **columns**: Column lettering and header keyword rules
- **table**: Row parsing, search matching, and the pending filter
- **sheets**: Spreadsheet REST client
- **status**: Status cell write with audit note
- **handover**: Handover sheet operations
- **bundling**: Bundling sheet operations
- **pages**: Page templates and view data
- **app**: Routing and middleware

## REST API Endpoints

- `/api/handover/search?q=` - Matching handover rows
- `/api/handover/mark` - Mark a handover row done
- `/api/pending` - Pending handover rows
- `/api/bundling/search?q=` - Matching bundling rows
- `/api/bundling/mark` - Set a bundling row's packing status
*/

pub mod auth;
pub mod bundling;
pub mod columns;
pub mod config;
pub mod error;
pub mod handover;
pub mod session;
pub mod sheets;
pub mod status;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod pages;

/// Re-export the types most callers need
pub use bundling::{BundlingView, PackingStatus};
pub use config::Config;
pub use error::{AuthError, ConfigError, SheetError};
pub use handover::HandoverView;
pub use session::{SessionContext, SessionStore};
pub use sheets::SheetsClient;
pub use table::{Match, SheetTarget};
