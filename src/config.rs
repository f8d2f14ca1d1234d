use crate::error::ConfigError;
use crate::table::SheetTarget;
use std::path::Path;

// Defaults for the two warehouse sheets
const HANDOVER_SHEET_ID: &str = "1aUfprh_6DwhwVRVKk2PUj_OpeAtz0U_42i5ERTqJfB4";
const BUNDLING_SHEET_ID: &str = "1pePWTFWezLEsRQylyHiWhvYh6gpxoEx1DaXfjWXsKEs";
const HANDOVER_TAB: &str = "Inbound Dump";
const BUNDLING_TAB: &str = "Albash working-2";
const HANDOVER_HEADER_ROW: u32 = 3;
const BUNDLING_HEADER_ROW: u32 = 1;
const LAST_COLUMN: &str = "Z";
const ROW_LIMIT: u32 = 1000;

const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URI: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
const BIND_ADDR: &str = "127.0.0.1:3000";

/// OAuth client settings for the identity provider
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub userinfo_uri: String,
}

/// Application configuration
///
/// Read from the process environment (after loading an optional `.env` file).
/// Only the OAuth client settings are required; everything else has a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub oauth: OAuthConfig,
    pub sheets_api_base: String,
    pub handover: SheetTarget,
    pub bundling: SheetTarget,
    pub bind_addr: String,
}

impl Config {
    /// Load configuration from the environment, reading `env_file` first if given
    ///
    /// # Errors
    /// * `ConfigError::EnvFile` if an explicitly named env file cannot be read
    /// * `ConfigError::Missing` if a required variable is unset or blank
    /// * `ConfigError::Invalid` if a numeric setting does not parse
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile(e.to_string()))?;
            }
            None => {
                // a missing .env is normal in deployment
                let _ = dotenvy::dotenv();
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));
        let or_default =
            |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());
        let row = |name: &'static str, default: u32| -> Result<u32, ConfigError> {
            match get(name) {
                None => Ok(default),
                Some(value) => match value.trim().parse::<u32>() {
                    Ok(n) if n > 0 => Ok(n),
                    _ => Err(ConfigError::Invalid { name, value }),
                },
            }
        };

        let oauth = OAuthConfig {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            redirect_uri: required("REDIRECT_URI")?,
            auth_uri: or_default("GOOGLE_AUTH_URI", AUTH_URI),
            token_uri: or_default("GOOGLE_TOKEN_URI", TOKEN_URI),
            userinfo_uri: or_default("GOOGLE_USERINFO_URI", USERINFO_URI),
        };

        let handover = SheetTarget {
            spreadsheet_id: or_default("HANDOVER_SHEET_ID", HANDOVER_SHEET_ID),
            tab: or_default("HANDOVER_TAB", HANDOVER_TAB),
            header_row: row("HANDOVER_HEADER_ROW", HANDOVER_HEADER_ROW)?,
            last_column: LAST_COLUMN.to_string(),
            row_limit: ROW_LIMIT,
            title_columns: vec!["Order No".to_string()],
        };

        let bundling = SheetTarget {
            spreadsheet_id: or_default("BUNDLING_SHEET_ID", BUNDLING_SHEET_ID),
            tab: or_default("BUNDLING_TAB", BUNDLING_TAB),
            header_row: row("BUNDLING_HEADER_ROW", BUNDLING_HEADER_ROW)?,
            last_column: LAST_COLUMN.to_string(),
            row_limit: ROW_LIMIT,
            title_columns: vec!["Fleek/Order ID".to_string(), "Bundle ID".to_string()],
        };

        Ok(Config {
            oauth,
            sheets_api_base: or_default("SHEETS_API_BASE", SHEETS_API_BASE),
            handover,
            bundling,
            bind_addr: or_default("BIND_ADDR", BIND_ADDR),
        })
    }
}
