#![cfg(feature = "web")]

use axum::{
    Extension, Form, Json, Router,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use handlebars::{Handlebars, TemplateError};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::auth::{OAuthClient, generate_state};
use crate::bundling::{BundlingView, PackingStatus};
use crate::config::Config;
use crate::error::{AuthError, SheetError};
use crate::handover::HandoverView;
use crate::pages::{self, LoginPage, PendingItem, PendingPage, SearchPage, UserView};
use crate::session::{AuthState, Flash, SESSION_COOKIE, SessionContext, SessionStore};
use crate::sheets::SheetsClient;

/// Shared state of the web application
///
/// Holds the remote clients and the per-browser session store. Nothing in
/// here is a process-wide global; tests build their own instance.
pub struct AppState {
    pub config: Config,
    pub oauth: OAuthClient,
    pub sheets: SheetsClient,
    pub sessions: SessionStore,
    templates: Handlebars<'static>,
}

/// Errors that stop the server from starting
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sheet client error: {0}")]
    Sheets(#[from] SheetError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, StartupError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("warehouse-desk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let oauth = OAuthClient::new(http.clone(), config.oauth.clone());
        let sheets = SheetsClient::new(http, &config.sheets_api_base)?;
        Ok(AppState {
            config,
            oauth,
            sheets,
            sessions: SessionStore::new(),
            templates: pages::templates()?,
        })
    }
}

/// The logged-in session attached to a request by `require_auth`
#[derive(Clone)]
pub struct CurrentSession {
    pub id: String,
    pub context: SessionContext,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct MarkForm {
    row: u32,
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct BundlingMarkForm {
    row: u32,
    status: PackingStatus,
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct MarkRequest {
    row: u32,
}

#[derive(Deserialize)]
struct BundlingMarkRequest {
    row: u32,
    status: PackingStatus,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/handover", get(handover_page))
        .route("/handover/mark", post(handover_mark))
        .route("/bundling", get(bundling_page))
        .route("/bundling/mark", post(bundling_mark))
        .route("/pending", get(pending_page))
        .route("/pending/mark", post(pending_mark))
        .route("/api/me", get(api_me))
        .route("/api/handover/search", get(api_handover_search))
        .route("/api/handover/mark", post(api_handover_mark))
        .route("/api/pending", get(api_pending))
        .route("/api/bundling/search", get(api_bundling_search))
        .route("/api/bundling/mark", post(api_bundling_mark))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(index))
        .route("/login", get(start_login))
        .route("/oauth/callback", get(oauth_callback))
        .route("/logout", post(logout))
        .merge(protected)
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Start the web server and serve until shutdown
pub async fn run(config: Config) -> Result<(), StartupError> {
    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    let listener = TcpListener::bind(addr.as_str()).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

fn render_page<T: Serialize>(state: &AppState, name: &str, data: &T) -> Response {
    match pages::render(&state.templates, name, data) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("failed to render {}: {}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

fn search_location(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?q={}", path, urlencoding::encode(query))
    }
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Authentication middleware
///
/// Lets the request through with a `CurrentSession` extension when the cookie
/// names a logged-in session, refreshing an expired access token first.
/// Otherwise pages redirect to the login prompt and `/api` calls get 401.
async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(id) = session_id(&jar) {
        if let Some(context) = state.sessions.context(&id) {
            if let Some(context) = refresh_if_needed(&state, &id, context).await {
                request.extensions_mut().insert(CurrentSession { id, context });
                return next.run(request).await;
            }
        }
    }

    if request.uri().path().starts_with("/api/") {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "status": "error", "message": "Login required" })),
        )
            .into_response()
    } else {
        Redirect::to("/").into_response()
    }
}

async fn refresh_if_needed(
    state: &AppState,
    id: &str,
    context: SessionContext,
) -> Option<SessionContext> {
    if !context.credential.needs_refresh(Utc::now()) {
        return Some(context);
    }

    match state.oauth.refresh(&context.credential).await {
        Ok(credential) => {
            debug!("refreshed access token for {}", context.actor());
            let context = SessionContext {
                credential,
                user: context.user,
            };
            state
                .sessions
                .set_auth(id, AuthState::LoggedIn(context.clone()));
            Some(context)
        }
        Err(e) => {
            warn!("token refresh failed for {}: {}", context.actor(), e);
            state.sessions.set_auth(id, AuthState::LoggedOut);
            state
                .sessions
                .set_flash(id, Flash::error("Your login has expired. Please login again."));
            None
        }
    }
}

/// Login prompt, or the handover view for a logged-in session
///
/// Also accepts the provider's redirect when the registered redirect URI is
/// the site root.
async fn index(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    if params.code.is_some() || params.error.is_some() {
        return finish_login(&state, &jar, params).await;
    }

    let id = session_id(&jar);
    if let Some(id) = id.as_deref() {
        if state.sessions.context(id).is_some() {
            return Redirect::to("/handover").into_response();
        }
    }

    let flash = id.as_deref().and_then(|id| state.sessions.take_flash(id));
    render_page(&state, "login", &LoginPage { flash })
}

async fn start_login(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let purged = state.sessions.purge_expired();
    if purged > 0 {
        debug!("purged {} expired sessions", purged);
    }

    let existing = session_id(&jar).filter(|id| state.sessions.auth_state(id).is_some());
    let (jar, id) = match existing {
        Some(id) => (jar, id),
        None => {
            let id = state.sessions.create();
            (jar.add(session_cookie(id.clone())), id)
        }
    };

    let csrf_state = generate_state();
    match state.oauth.authorization_url(&csrf_state) {
        Ok(url) => {
            state
                .sessions
                .set_auth(&id, AuthState::Authenticating { csrf_state });
            (jar, Redirect::to(&url)).into_response()
        }
        Err(e) => {
            error!("cannot build authorization url: {}", e);
            state
                .sessions
                .set_flash(&id, Flash::error(format!("Authentication error: {}", e)));
            (jar, Redirect::to("/")).into_response()
        }
    }
}

async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    finish_login(&state, &jar, params).await
}

async fn finish_login(state: &AppState, jar: &CookieJar, params: CallbackParams) -> Response {
    let Some(id) = session_id(jar).filter(|id| state.sessions.auth_state(id).is_some()) else {
        return Redirect::to("/").into_response();
    };

    match complete_login(state, &id, params).await {
        Ok(context) => {
            let name = context.actor();
            info!("{} logged in", name);
            state.sessions.set_auth(&id, AuthState::LoggedIn(context));
            state
                .sessions
                .set_flash(&id, Flash::success(format!("Logged in as {}", name)));
            Redirect::to("/handover").into_response()
        }
        Err(e) => {
            warn!("login failed: {}", e);
            state.sessions.set_auth(&id, AuthState::LoggedOut);
            state
                .sessions
                .set_flash(&id, Flash::error(format!("Authentication error: {}", e)));
            Redirect::to("/").into_response()
        }
    }
}

async fn complete_login(
    state: &AppState,
    id: &str,
    params: CallbackParams,
) -> Result<SessionContext, AuthError> {
    if let Some(error) = params.error {
        return Err(AuthError::Denied(error));
    }

    let expected = match state.sessions.auth_state(id) {
        Some(AuthState::Authenticating { csrf_state }) => csrf_state,
        _ => return Err(AuthError::StateMismatch),
    };
    if params.state.as_deref() != Some(expected.as_str()) {
        return Err(AuthError::StateMismatch);
    }

    let code = params
        .code
        .ok_or_else(|| AuthError::Denied("missing authorization code".to_string()))?;
    let credential = state.oauth.exchange_code(&code).await?;
    let user = state.oauth.fetch_user_info(&credential).await?;

    Ok(SessionContext { credential, user })
}

async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(id) = session_id(&jar) {
        state.sessions.remove(&id);
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/"),
    )
}

async fn handover_page(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let flash = state.sessions.take_flash(&current.id);
    let user = UserView::from(&current.context.user);
    let mut page = SearchPage::new("handover", user, flash, query.q.clone());

    if !query.q.is_empty() {
        let target = &state.config.handover;
        let view = HandoverView::new(&state.sheets, target);
        page = match view.search(&current.context, &query.q).await {
            Ok(matches) => page.with_results(&matches, &target.title_columns),
            Err(e) => {
                warn!("handover search failed: {}", e);
                page.with_error(e.user_message())
            }
        };
    }

    render_page(&state, "handover", &page)
}

async fn handover_mark(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Form(form): Form<MarkForm>,
) -> Redirect {
    mark_handover_row(&state, &current, form.row).await;
    Redirect::to(&search_location("/handover", &form.q))
}

async fn mark_handover_row(state: &AppState, current: &CurrentSession, row: u32) {
    let view = HandoverView::new(&state.sheets, &state.config.handover);
    let flash = match view.mark_handover(&current.context, row).await {
        Ok(_) => Flash::success(format!(
            "Row {} marked as handed over by {}",
            row,
            current.context.actor()
        )),
        Err(e) => {
            error!("marking handover for row {} failed: {}", row, e);
            Flash::error(format!("Error marking handover: {}", e.user_message()))
        }
    };
    state.sessions.set_flash(&current.id, flash);
}

async fn bundling_page(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let flash = state.sessions.take_flash(&current.id);
    let user = UserView::from(&current.context.user);
    let mut page = SearchPage::new("bundling", user, flash, query.q.clone());

    if !query.q.is_empty() {
        let target = &state.config.bundling;
        let view = BundlingView::new(&state.sheets, target);
        page = match view.search(&current.context, &query.q).await {
            Ok(matches) => page.with_results(&matches, &target.title_columns),
            Err(e) => {
                warn!("bundling search failed: {}", e);
                page.with_error(e.user_message())
            }
        };
    }

    render_page(&state, "bundling", &page)
}

async fn bundling_mark(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Form(form): Form<BundlingMarkForm>,
) -> Redirect {
    let view = BundlingView::new(&state.sheets, &state.config.bundling);
    let flash = match view.mark_status(&current.context, form.row, form.status).await {
        Ok(_) => Flash::success(format!("Row {} marked as {}", form.row, form.status)),
        Err(e) => {
            error!("marking row {} as {} failed: {}", form.row, form.status, e);
            Flash::error(format!("Error marking bundling status: {}", e.user_message()))
        }
    };
    state.sessions.set_flash(&current.id, flash);
    Redirect::to(&search_location("/bundling", &form.q))
}

async fn pending_page(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
) -> Response {
    let flash = state.sessions.take_flash(&current.id);
    let view = HandoverView::new(&state.sheets, &state.config.handover);
    let (items, error) = match view.pending(&current.context).await {
        Ok(matches) => (matches.iter().map(PendingItem::from).collect::<Vec<_>>(), None),
        Err(e) => {
            warn!("loading pending list failed: {}", e);
            (Vec::new(), Some(format!("Error getting pending list: {}", e.user_message())))
        }
    };

    let page = PendingPage {
        active: "pending",
        user: UserView::from(&current.context.user),
        flash,
        count: items.len(),
        items,
        error,
    };
    render_page(&state, "pending", &page)
}

async fn pending_mark(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Form(form): Form<MarkForm>,
) -> Redirect {
    mark_handover_row(&state, &current, form.row).await;
    Redirect::to("/pending")
}

/// JSON error body for the `/api` routes
pub struct ApiError(SheetError);

impl From<SheetError> for ApiError {
    fn from(err: SheetError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SheetError::PermissionDenied => StatusCode::FORBIDDEN,
            SheetError::ColumnNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SheetError::InvalidRow(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        (
            status,
            Json(json!({ "status": "error", "message": self.0.user_message() })),
        )
            .into_response()
    }
}

async fn api_me(Extension(current): Extension<CurrentSession>) -> Json<UserView> {
    Json(UserView::from(&current.context.user))
}

async fn api_handover_search(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let view = HandoverView::new(&state.sheets, &state.config.handover);
    let matches = view.search(&current.context, &query.q).await?;
    Ok(Json(json!({ "count": matches.len(), "results": matches })))
}

async fn api_handover_mark(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Json(body): Json<MarkRequest>,
) -> Result<Json<Value>, ApiError> {
    let view = HandoverView::new(&state.sheets, &state.config.handover);
    let written = view.mark_handover(&current.context, body.row).await?;
    Ok(Json(json!({
        "status": "ok",
        "cell": written.cell,
        "note_attached": written.note_attached,
    })))
}

async fn api_pending(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<Value>, ApiError> {
    let view = HandoverView::new(&state.sheets, &state.config.handover);
    let matches = view.pending(&current.context).await?;
    Ok(Json(json!({ "count": matches.len(), "results": matches })))
}

async fn api_bundling_search(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let view = BundlingView::new(&state.sheets, &state.config.bundling);
    let matches = view.search(&current.context, &query.q).await?;
    Ok(Json(json!({ "count": matches.len(), "results": matches })))
}

async fn api_bundling_mark(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Json(body): Json<BundlingMarkRequest>,
) -> Result<Json<Value>, ApiError> {
    let view = BundlingView::new(&state.sheets, &state.config.bundling);
    let written = view.mark_status(&current.context, body.row, body.status).await?;
    Ok(Json(json!({
        "status": "ok",
        "cell": written.cell,
        "note_attached": written.note_attached,
    })))
}
