//! World Bank Indicators API client.
//!
//! Fetches every page of a multi-indicator query and flattens the JSON
//! records into a [`RawSheet`] whose headers are the API field names.

use super::table::{Cell, RawSheet, RawTable};
use crate::config::WdiConfig;
use crate::constants::WDI_API_SOURCE_ID;
use crate::error::{NexusError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Column headers of the flattened API sheet
pub const WDI_API_COLUMNS: &[&str] = &[
    "countryiso3code",
    "country.value",
    "indicator.id",
    "indicator.value",
    "date",
    "value",
    "obs_status",
];

#[derive(Debug, Clone, Deserialize)]
pub struct IdValue {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub value: String,
}

/// One observation as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct WdiRecord {
    pub indicator: IdValue,
    pub country: IdValue,
    #[serde(default)]
    pub countryiso3code: String,
    pub date: String,
    pub value: Option<f64>,
    #[serde(default)]
    pub obs_status: Option<String>,
}

/// Paging header of an API response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u64,
    pub pages: u64,
    pub total: u64,
}

/// The API is inconsistent about numbers vs numeric strings in paging fields
fn json_u64(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Parse one response body into its paging header and records
pub fn parse_page(source_name: &str, body: &str) -> Result<(PageInfo, Vec<WdiRecord>)> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| NexusError::api(source_name, format!("invalid JSON response: {}", e)))?;

    let parts = json
        .as_array()
        .ok_or_else(|| NexusError::api(source_name, "response is not a JSON array"))?;
    let header = parts
        .first()
        .ok_or_else(|| NexusError::api(source_name, "empty response"))?;

    if let Some(message) = header.get("message") {
        return Err(NexusError::api(
            source_name,
            format!("API returned an error: {}", message),
        ));
    }

    let info = PageInfo {
        page: json_u64(header, "page").unwrap_or(1),
        pages: json_u64(header, "pages").unwrap_or(1),
        total: json_u64(header, "total").unwrap_or(0),
    };

    let records = match parts.get(1) {
        None | Some(Value::Null) => Vec::new(),
        Some(data) => serde_json::from_value(data.clone())
            .map_err(|e| NexusError::api(source_name, format!("unexpected record shape: {}", e)))?,
    };

    Ok((info, records))
}

fn record_row(record: WdiRecord) -> Vec<Cell> {
    vec![
        Cell::text(record.countryiso3code),
        Cell::text(record.country.value),
        Cell::text(record.indicator.id),
        Cell::text(record.indicator.value),
        Cell::text(record.date),
        record.value.map(Cell::Number).unwrap_or_default(),
        Cell::text(record.obs_status.unwrap_or_default()),
    ]
}

/// Client for the Indicators API
#[derive(Debug, Clone)]
pub struct WdiClient {
    http: Client,
    config: WdiConfig,
}

impl WdiClient {
    pub fn new(config: &WdiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("fiscal_nexus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NexusError::configuration(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// URL of one result page for all `codes` across all countries
    pub fn page_url(&self, codes: &[String], page: u64) -> String {
        format!(
            "{}/country/all/indicator/{}?format=json&source={}&per_page={}&page={}",
            self.config.base_url.trim_end_matches('/'),
            codes.join(";"),
            WDI_API_SOURCE_ID,
            self.config.per_page,
            page
        )
    }

    /// Fetch all pages for `codes` into one sheet
    pub async fn fetch(&self, source_name: &str, codes: &[String]) -> Result<RawSheet> {
        if codes.is_empty() {
            return Err(NexusError::configuration(format!(
                "source '{}' has no indicator codes",
                source_name
            )));
        }

        let mut rows = vec![WDI_API_COLUMNS.iter().map(|c| Cell::text(*c)).collect()];
        let mut page = 1;

        loop {
            let (info, records) = self.fetch_page_with_retry(source_name, codes, page).await?;
            debug!(
                "Fetched page {}/{} ({} records, {} total)",
                info.page,
                info.pages,
                records.len(),
                info.total
            );
            rows.extend(records.into_iter().map(record_row));

            if info.page >= info.pages {
                break;
            }
            page = info.page + 1;
        }

        info!(
            "Fetched {} WDI records for {} indicators",
            rows.len() - 1,
            codes.len()
        );
        Ok(RawSheet::new("api", RawTable::new(rows)))
    }

    async fn fetch_page_with_retry(
        &self,
        source_name: &str,
        codes: &[String],
        page: u64,
    ) -> Result<(PageInfo, Vec<WdiRecord>)> {
        let mut attempt = 0;
        loop {
            match self.fetch_page(source_name, codes, page).await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        "WDI page {} failed ({}), retry {}/{}",
                        page, e, attempt, self.config.max_retries
                    );
                    tokio::time::sleep(self.config.retry_backoff()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_page(
        &self,
        source_name: &str,
        codes: &[String],
        page: u64,
    ) -> Result<(PageInfo, Vec<WdiRecord>)> {
        let url = self.page_url(codes, page);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| NexusError::api(source_name, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NexusError::api(source_name, format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| NexusError::api(source_name, format!("reading body failed: {}", e)))?;

        parse_page(source_name, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const PAGE_ONE: &str = r#"[{"page":1,"pages":2,"per_page":"2","total":3,"sourceid":"2"},[
        {"indicator":{"id":"NY.GDP.MKTP.CD","value":"GDP (current US$)"},"country":{"id":"KE","value":"Kenya"},"countryiso3code":"KEN","date":"2020","value":100.5,"unit":"","obs_status":"","decimal":0},
        {"indicator":{"id":"NY.GDP.MKTP.CD","value":"GDP (current US$)"},"country":{"id":"KE","value":"Kenya"},"countryiso3code":"KEN","date":"2019","value":null,"unit":"","obs_status":"","decimal":0}
    ]]"#;

    const PAGE_TWO: &str = r#"[{"page":2,"pages":2,"per_page":"2","total":3},[
        {"indicator":{"id":"CC.EST","value":"Control of Corruption: Estimate"},"country":{"id":"CL","value":"Chile"},"countryiso3code":"CHL","date":"2020","value":1.1,"unit":"","obs_status":"","decimal":1}
    ]]"#;

    /// Serve canned pages over plain HTTP, choosing the body by `page=` query
    async fn serve_pages(listener: TcpListener, requests: usize) {
        for _ in 0..requests {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = vec![0u8; 4096];
            let n = socket.read(&mut buffer).await.unwrap();
            let request = String::from_utf8_lossy(&buffer[..n]).to_string();

            let body = if request.contains("page=2") { PAGE_TWO } else { PAGE_ONE };
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
    }

    #[test]
    fn test_parse_page_accepts_string_paging_fields() {
        let (info, records) = parse_page("wb_wdi", PAGE_ONE).unwrap();
        assert_eq!(info, PageInfo { page: 1, pages: 2, total: 3 });
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].countryiso3code, "KEN");
        assert_eq!(records[0].value, Some(100.5));
        assert_eq!(records[1].value, None);
    }

    #[test]
    fn test_parse_page_surfaces_api_error_message() {
        let body = r#"[{"message":[{"id":"120","key":"Invalid value","value":"The provided parameter value is not valid"}]}]"#;
        let err = parse_page("wb_wdi", body).unwrap_err();
        assert!(err.to_string().contains("Invalid value"));
    }

    #[test]
    fn test_parse_page_without_records() {
        let body = r#"[{"page":1,"pages":0,"per_page":50,"total":0},null]"#;
        let (_, records) = parse_page("wb_wdi", body).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_page_rejects_garbage() {
        assert!(matches!(
            parse_page("wb_wdi", "<html>busy</html>"),
            Err(NexusError::Api { .. })
        ));
    }

    #[test]
    fn test_page_url() {
        let config = WdiConfig {
            base_url: "https://api.example.org/v2/".to_string(),
            per_page: 500,
            ..Default::default()
        };
        let client = WdiClient::new(&config).unwrap();
        let url = client.page_url(&["CC.EST".to_string(), "NY.GDP.MKTP.CD".to_string()], 3);
        assert_eq!(
            url,
            "https://api.example.org/v2/country/all/indicator/CC.EST;NY.GDP.MKTP.CD?format=json&source=2&per_page=500&page=3"
        );
    }

    #[tokio::test]
    async fn test_fetch_follows_pagination() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_pages(listener, 2));

        let config = WdiConfig {
            base_url: format!("http://{}", addr),
            ..Default::default()
        };
        let client = WdiClient::new(&config).unwrap();
        let sheet = client
            .fetch("wb_wdi", &["NY.GDP.MKTP.CD".to_string(), "CC.EST".to_string()])
            .await
            .unwrap();
        server.await.unwrap();

        assert_eq!(sheet.table.header(0), WDI_API_COLUMNS.to_vec());
        assert_eq!(sheet.table.height(), 4);
        assert_eq!(sheet.table.cell(3, 0), &Cell::Text("CHL".to_string()));
        assert_eq!(sheet.table.cell(2, 5), &Cell::Empty);
    }

    #[tokio::test]
    async fn test_unreachable_api_is_fatal_without_retries() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = WdiConfig {
            base_url: format!("http://{}", addr),
            timeout_secs: 5,
            ..Default::default()
        };
        let client = WdiClient::new(&config).unwrap();
        let result = client.fetch("wb_wdi", &["CC.EST".to_string()]).await;
        assert!(matches!(result, Err(NexusError::Api { .. })));
    }
}
