//! Google Sheets REST API client.
//!
//! Client with:
//! - Service account tokens refreshed ahead of expiry
//! - HTTP client tuning (timeouts, user agent)
//! - One re-authentication attempt on an expired token
//! - Observability (tracing spans, metrics)

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, Instrument};

use crate::a1::{cell_range, quote_sheet_name};
use crate::backend::{CellUpdate, QueueBackend};
use crate::config::SheetsConfig;
use crate::error::{SheetsError, SheetsResult};
use crate::metrics::record_request;
use crate::auth::{AccessTokenSource, ServiceAccountToken};

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest<'a> {
    value_input_option: &'static str,
    data: Vec<CellData<'a>>,
}

#[derive(Debug, Serialize)]
struct CellData<'a> {
    range: String,
    values: [[&'a str; 1]; 1],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    total_updated_cells: Option<u64>,
}

/// Cell text as the sheet displays it.
fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// Client
// =============================================================================

/// Sheets REST API client bound to one worksheet.
#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    config: SheetsConfig,
    auth: Arc<dyn AccessTokenSource>,
}

impl SheetsClient {
    /// Create a client authenticated with the configured service account.
    pub fn new(config: SheetsConfig) -> SheetsResult<Self> {
        let path = &config.credentials_path;
        if !path.is_file() {
            return Err(SheetsError::config(format!(
                "service account file not found: {}",
                path.display()
            )));
        }

        let auth = Arc::new(ServiceAccountToken::from_file(path)?);
        Self::with_token_source(config, auth)
    }

    /// Create a client with a custom token source.
    pub fn with_token_source(
        config: SheetsConfig,
        auth: Arc<dyn AccessTokenSource>,
    ) -> SheetsResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("reelqueue/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SheetsError::Network)?;

        Ok(Self { http, config, auth })
    }

    /// Create from environment variables.
    pub fn from_env() -> SheetsResult<Self> {
        Self::new(SheetsConfig::from_env()?)
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    fn spreadsheet_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}",
            self.config.api_base,
            urlencoding::encode(&self.config.spreadsheet_id)
        )
    }

    fn worksheet_values_url(&self) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(&quote_sheet_name(&self.config.worksheet))
        )
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Send a request with a bearer token, re-authenticating once on an expired token.
    async fn send_authorized<F>(&self, url: &str, build: F) -> SheetsResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.auth.token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(SheetsError::from_http_status(401, format!("{} failed: {}", url, body)));
        }

        debug!("Sheets token expired, refreshing");
        self.auth.invalidate().await?;
        let token = self.auth.token().await?;
        Ok(build(&token).send().await?)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Read every row of the worksheet.
    pub async fn get_values(&self) -> SheetsResult<Vec<Vec<String>>> {
        let url = self.worksheet_values_url();

        self.execute_request("get_values", async {
            let response = self
                .send_authorized(&url, |token| {
                    self.http
                        .get(&url)
                        .query(&[("majorDimension", "ROWS")])
                        .bearer_auth(token)
                })
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(Self::handle_error_response(status, &url, response).await);
            }

            let range: ValueRange = response.json().await.map_err(|e| {
                SheetsError::InvalidResponse(format!("values response: {}", e))
            })?;

            Ok(range
                .values
                .iter()
                .map(|row| row.iter().map(cell_text).collect())
                .collect())
        })
        .await
    }

    /// Write single cells in one `values:batchUpdate` call.
    pub async fn batch_update(&self, updates: &[CellUpdate]) -> SheetsResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let url = format!("{}/values:batchUpdate", self.spreadsheet_url());
        let body = BatchUpdateRequest {
            value_input_option: "RAW",
            data: updates
                .iter()
                .map(|u| CellData {
                    range: cell_range(&self.config.worksheet, u.column, u.row),
                    values: [[u.value.as_str()]],
                })
                .collect(),
        };

        self.execute_request("batch_update", async {
            let response = self
                .send_authorized(&url, |token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(Self::handle_error_response(status, &url, response).await);
            }

            let result: BatchUpdateResponse = response.json().await.map_err(|e| {
                SheetsError::InvalidResponse(format!("batchUpdate response: {}", e))
            })?;
            debug!(cells = ?result.total_updated_cells, "Sheet cells updated");
            Ok(())
        })
        .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn execute_request<T, F>(&self, operation: &str, fut: F) -> SheetsResult<T>
    where
        F: std::future::Future<Output = SheetsResult<T>>,
    {
        let span = info_span!(
            "sheets_request",
            operation = %operation,
            worksheet = %self.config.worksheet
        );

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> SheetsError {
        let body = response.text().await.unwrap_or_default();
        SheetsError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

#[async_trait]
impl QueueBackend for SheetsClient {
    async fn read_rows(&self) -> SheetsResult<Vec<Vec<String>>> {
        self.get_values().await
    }

    async fn write_cells(&self, updates: &[CellUpdate]) -> SheetsResult<()> {
        self.batch_update(updates).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    fn client(server: &MockServer) -> SheetsClient {
        let config = SheetsConfig::new("sheet-1").with_api_base(server.uri());
        SheetsClient::with_token_source(config, Arc::new(StaticToken("test-token".into()))).unwrap()
    }

    #[tokio::test]
    async fn test_get_values_reads_quoted_worksheet() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/%27Challenge30%27"))
            .and(query_param("majorDimension", "ROWS"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "Challenge30!A1:Z1000",
                "majorDimension": "ROWS",
                "values": [
                    ["id", "image_prompt", "video_status"],
                    ["001", "a red fox", "pending"],
                    [2, null, true]
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let rows = client(&server).get_values().await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["001", "a red fox", "pending"]);
        assert_eq!(rows[2], vec!["2", "", "true"]);
    }

    #[tokio::test]
    async fn test_get_values_empty_sheet() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "Challenge30!A1:Z1000",
                "majorDimension": "ROWS"
            })))
            .mount(&server)
            .await;

        assert!(client(&server).get_values().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_values_maps_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Requested entity was not found."))
            .mount(&server)
            .await;

        let err = client(&server).get_values().await.unwrap_err();
        assert!(matches!(err, SheetsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_batch_update_sends_raw_cells() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-1/values:batchUpdate"))
            .and(body_json(json!({
                "valueInputOption": "RAW",
                "data": [
                    {"range": "'Challenge30'!C2", "values": [["done"]]},
                    {"range": "'Challenge30'!AA2", "values": [["output/videos/001.mp4"]]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "spreadsheetId": "sheet-1",
                "totalUpdatedCells": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .batch_update(&[
                CellUpdate::new(2, 3, "done"),
                CellUpdate::new(2, 27, "output/videos/001.mp4"),
            ])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_batch_update_without_cells_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        client(&server).batch_update(&[]).await.unwrap();
    }

    /// Fails the first call with an expired-token 401, then succeeds.
    struct ExpireOnce(AtomicUsize);

    impl Respond for ExpireOnce {
        fn respond(&self, _: &Request) -> ResponseTemplate {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(401).set_body_json(json!({
                    "error": {"code": 401, "status": "UNAUTHENTICATED"}
                }))
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"values": [["id"]]}))
            }
        }
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ExpireOnce(AtomicUsize::new(0)))
            .expect(2)
            .mount(&server)
            .await;

        let rows = client(&server).get_values().await.unwrap();
        assert_eq!(rows, vec![vec!["id".to_string()]]);
    }

    #[tokio::test]
    async fn test_unauthorized_without_expiry_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).get_values().await.unwrap_err();
        assert!(matches!(err, SheetsError::AuthError(_)));
    }

    #[test]
    fn test_new_requires_credentials_file() {
        let mut config = SheetsConfig::new("sheet-1");
        config.credentials_path = "/nonexistent/service_account.json".into();
        assert!(matches!(SheetsClient::new(config), Err(SheetsError::Config(_))));
    }
}
