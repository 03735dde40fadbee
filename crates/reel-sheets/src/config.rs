//! Sheets client configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{SheetsError, SheetsResult};

pub const DEFAULT_WORKSHEET: &str = "Challenge30";
pub const DEFAULT_CREDENTIALS_PATH: &str = "creds/service_account.json";
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

/// Configuration for the Sheets-backed queue.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Spreadsheet ID from the sheet URL
    pub spreadsheet_id: String,
    /// Worksheet (tab) holding the queue
    pub worksheet: String,
    /// Service account JSON
    pub credentials_path: PathBuf,
    /// API base URL, overridable for tests
    pub api_base: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl SheetsConfig {
    /// Config with defaults for everything but the spreadsheet.
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: DEFAULT_WORKSHEET.to_string(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> SheetsResult<Self> {
        let spreadsheet_id = std::env::var("GOOGLE_SHEET_ID")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if spreadsheet_id.is_empty() {
            return Err(SheetsError::config(
                "GOOGLE_SHEET_ID must be set to read the queue",
            ));
        }

        let timeout_secs: u64 = std::env::var("SHEETS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let mut config = Self::new(spreadsheet_id);
        config.timeout = Duration::from_secs(timeout_secs);
        if let Ok(worksheet) = std::env::var("SHEET_WORKSHEET") {
            if !worksheet.trim().is_empty() {
                config.worksheet = worksheet;
            }
        }
        if let Ok(path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
            if !path.trim().is_empty() {
                config.credentials_path = PathBuf::from(path);
            }
        }
        if let Ok(base) = std::env::var("SHEETS_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }

        Ok(config)
    }

    pub fn with_worksheet(mut self, worksheet: impl Into<String>) -> Self {
        self.worksheet = worksheet.into();
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "GOOGLE_SHEET_ID",
        "SHEET_WORKSHEET",
        "GOOGLE_APPLICATION_CREDENTIALS",
        "SHEETS_API_BASE",
        "SHEETS_TIMEOUT_SECS",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_sheet_id() {
        clear();
        let err = SheetsConfig::from_env().unwrap_err();
        assert!(matches!(err, SheetsError::Config(_)));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear();
        std::env::set_var("GOOGLE_SHEET_ID", "sheet-123");
        let config = SheetsConfig::from_env().unwrap();
        clear();

        assert_eq!(config.spreadsheet_id, "sheet-123");
        assert_eq!(config.worksheet, "Challenge30");
        assert_eq!(config.credentials_path, PathBuf::from("creds/service_account.json"));
        assert_eq!(config.api_base, "https://sheets.googleapis.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear();
        std::env::set_var("GOOGLE_SHEET_ID", "sheet-123");
        std::env::set_var("SHEET_WORKSHEET", "Backlog");
        std::env::set_var("SHEETS_API_BASE", "http://127.0.0.1:9000/");
        std::env::set_var("SHEETS_TIMEOUT_SECS", "5");
        let config = SheetsConfig::from_env().unwrap();
        clear();

        assert_eq!(config.worksheet, "Backlog");
        assert_eq!(config.api_base, "http://127.0.0.1:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
