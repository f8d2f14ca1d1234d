#![cfg(feature = "web")]

use crate::auth::UserInfo;
use crate::bundling::PackingStatus;
use crate::session::Flash;
use crate::table::{Field, Match};
use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

/// Build the template registry from the pages embedded in the binary
pub fn templates() -> Result<Handlebars<'static>, TemplateError> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(false);
    hb.register_partial("layout", include_str!("./static/layout.hbs"))?;
    hb.register_partial("fields", include_str!("./static/fields.hbs"))?;
    hb.register_template_string("login", include_str!("./static/login.hbs"))?;
    hb.register_template_string("handover", include_str!("./static/handover.hbs"))?;
    hb.register_template_string("bundling", include_str!("./static/bundling.hbs"))?;
    hb.register_template_string("pending", include_str!("./static/pending.hbs"))?;
    Ok(hb)
}

/// Signed-in user shown in the sidebar
#[derive(Debug, Serialize)]
pub struct UserView {
    pub name: String,
    pub email: String,
}

impl From<&UserInfo> for UserView {
    fn from(user: &UserInfo) -> Self {
        UserView {
            name: user.display_name(),
            email: user.email().to_string(),
        }
    }
}

/// A matched row split into two columns of fields
#[derive(Debug, Serialize)]
pub struct MatchView {
    pub row_index: u32,
    pub title: String,
    pub left: Vec<Field>,
    pub right: Vec<Field>,
}

impl MatchView {
    pub fn new(m: &Match, title_columns: &[String]) -> Self {
        let mid = m.fields.len() / 2;
        MatchView {
            row_index: m.row_index,
            title: m.title(title_columns),
            left: m.fields[..mid].to_vec(),
            right: m.fields[mid..].to_vec(),
        }
    }
}

/// One line of the pending list
#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub row_index: u32,
    pub order_no: String,
    pub vendor: String,
}

impl From<&Match> for PendingItem {
    fn from(m: &Match) -> Self {
        PendingItem {
            row_index: m.row_index,
            order_no: m.get("Order No").unwrap_or("N/A").to_string(),
            vendor: m.get("Vendor").unwrap_or("N/A").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub flash: Option<Flash>,
}

/// Search-and-mark page shared by the handover and bundling views
#[derive(Debug, Serialize)]
pub struct SearchPage {
    pub active: &'static str,
    pub user: UserView,
    pub flash: Option<Flash>,
    pub query: String,
    pub searched: bool,
    pub count: usize,
    pub results: Vec<MatchView>,
    pub error: Option<String>,
    pub statuses: Vec<&'static str>,
}

impl SearchPage {
    pub fn new(active: &'static str, user: UserView, flash: Option<Flash>, query: String) -> Self {
        SearchPage {
            active,
            user,
            flash,
            query,
            searched: false,
            count: 0,
            results: Vec::new(),
            error: None,
            statuses: if active == "bundling" {
                PackingStatus::ALL.iter().map(|s| s.as_str()).collect()
            } else {
                Vec::new()
            },
        }
    }

    /// Record the outcome of a search
    pub fn with_results(mut self, matches: &[Match], title_columns: &[String]) -> Self {
        self.searched = true;
        self.count = matches.len();
        self.results = matches
            .iter()
            .map(|m| MatchView::new(m, title_columns))
            .collect();
        self
    }

    /// Record a failed search
    pub fn with_error(mut self, message: String) -> Self {
        self.searched = true;
        self.error = Some(message);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct PendingPage {
    pub active: &'static str,
    pub user: UserView,
    pub flash: Option<Flash>,
    pub count: usize,
    pub items: Vec<PendingItem>,
    pub error: Option<String>,
}

pub fn render<T: Serialize>(
    hb: &Handlebars<'static>,
    name: &str,
    data: &T,
) -> Result<String, RenderError> {
    hb.render(name, data)
}
