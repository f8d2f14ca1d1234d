use thiserror::Error;

/// Errors raised while loading the application configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("failed to read env file: {0}")]
    EnvFile(String),
}

/// Errors raised by the OAuth login flow
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("authorization was denied: {0}")]
    Denied(String),
    #[error("login state did not match, please retry")]
    StateMismatch,
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
    #[error("token refresh failed: {0}")]
    Refresh(String),
    #[error("user info lookup failed: {0}")]
    UserInfo(String),
    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

/// Errors raised while talking to the spreadsheet service
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("no permission to access this sheet")]
    PermissionDenied,
    #[error("{0} column not found")]
    ColumnNotFound(String),
    #[error("row {0} is not a data row")]
    InvalidRow(u32),
    #[error("sheet service returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

impl SheetError {
    /// Message shown to the clerk when an action fails.
    pub fn user_message(&self) -> String {
        match self {
            SheetError::PermissionDenied => {
                "You do not have access to this sheet. Ask the sheet owner for permission."
                    .to_string()
            }
            SheetError::ColumnNotFound(name) => format!("{} column not found", name),
            other => format!("Error: {}", other),
        }
    }
}
