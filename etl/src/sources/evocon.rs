use std::time::Duration;

use async_trait::async_trait;
use common::config::EvoconConfig;
use common::{Error, Result};
use rquest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::Extract;
use crate::catalog::Resource;
use crate::secrets::EvoconCredentials;
use crate::utils::retry::retry_with_backoff;

/// Client for the Evocon reports API.
///
/// The report endpoints are not paginated; a single authenticated GET returns
/// the complete result set for the requested window.
pub struct EvoconClient {
    client: Client,
    base_url: Url,
    credentials: EvoconCredentials,
    max_retries: u32,
    retry_base_delay_ms: u64,
}

impl EvoconClient {
    pub fn new(config: &EvoconConfig, credentials: EvoconCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: parse_base_url(&config.base_url)?,
            credentials,
            max_retries: config.max_retries,
            retry_base_delay_ms: config.retry_base_delay_ms,
        })
    }

    async fn fetch_once(&self, resource: &Resource) -> Result<Vec<Value>> {
        let url = self.base_url.join(resource.path)?;
        debug!(url = %url, resource = resource.name, "Requesting Evocon report");

        let response = self
            .client
            .get(url)
            .basic_auth(&self.credentials.api_key, Some(&self.credentials.secret))
            .query(&resource.params)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(Error::Forbidden),
            StatusCode::TOO_MANY_REQUESTS => return Err(Error::RateLimit),
            status => {
                return Err(Error::Api {
                    status: status.as_u16(),
                    resource: resource.name.to_string(),
                });
            }
        }

        let body: Value = response.json().await?;
        Ok(into_records(body))
    }
}

#[async_trait]
impl Extract for EvoconClient {
    fn name(&self) -> &str {
        "evocon"
    }

    async fn fetch(&self, resource: &Resource) -> Result<Vec<Value>> {
        retry_with_backoff(self.max_retries, self.retry_base_delay_ms, || {
            self.fetch_once(resource)
        })
        .await
    }
}

// Url::join silently drops the last path segment when the base lacks a
// trailing slash, so normalize before parsing.
fn parse_base_url(raw: &str) -> Result<Url> {
    if raw.ends_with('/') {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("{raw}/"))?)
    }
}

/// Report bodies are JSON arrays of rows. A bare object is treated as a
/// single row and a null body as an empty report.
fn into_records(body: Value) -> Vec<Value> {
    match body {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arrays_pass_through_as_rows() {
        let rows = into_records(json!([{"station_id": 1}, {"station_id": 2}]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["station_id"], 1);
    }

    #[test]
    fn a_bare_object_becomes_a_single_row() {
        let rows = into_records(json!({"station_id": 1, "oee": 82.5}));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["oee"], 82.5);
    }

    #[test]
    fn null_bodies_are_empty_reports() {
        assert!(into_records(Value::Null).is_empty());
    }

    #[test]
    fn base_url_always_keeps_its_trailing_slash() {
        let with = parse_base_url("https://api.evocon.com/api/reports/").unwrap();
        let without = parse_base_url("https://api.evocon.com/api/reports").unwrap();

        assert_eq!(with, without);
        assert_eq!(
            with.join("oee_json").unwrap().as_str(),
            "https://api.evocon.com/api/reports/oee_json"
        );
    }
}
