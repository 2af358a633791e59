use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::config::SnowflakeConfig;
use common::{Error, Result};
use rquest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::{record_key, Destination, TableLoadInfo, WriteDisposition};

/// Warehouse writer over the Snowflake SQL API (`/api/v2/statements`).
///
/// Every table lands in the same shape: the raw record in a VARIANT column
/// plus a load timestamp. Downstream models flatten from there, so schema
/// drift in the Evocon payloads never breaks the load.
pub struct SnowflakeDestination {
    client: Client,
    statements_url: String,
    config: SnowflakeConfig,
    dataset: String,
}

#[derive(Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    database: &'a str,
    schema: &'a str,
    warehouse: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    data: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    statement_handle: Option<String>,
}

impl SnowflakeDestination {
    pub fn new(config: &SnowflakeConfig, dataset: &str) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(Error::MissingCredentials("snowflake.token".to_string()));
        }

        // Leave headroom over the server-side statement timeout so slow DML
        // fails with Snowflake's error instead of a client timeout.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.statement_timeout_secs + 10))
            .build()?;

        Ok(Self {
            client,
            statements_url: format!(
                "https://{}.snowflakecomputing.com/api/v2/statements",
                config.account
            ),
            config: config.clone(),
            dataset: dataset.to_string(),
        })
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}.{}", self.config.database, self.dataset, table)
    }

    async fn execute(&self, statement: &str) -> Result<StatementResponse> {
        let request_id = Uuid::new_v4();
        let request = StatementRequest {
            statement,
            timeout: self.config.statement_timeout_secs,
            database: &self.config.database,
            schema: &self.dataset,
            warehouse: &self.config.warehouse,
            role: self.config.role.as_deref(),
        };

        debug!(request_id = %request_id, "Submitting Snowflake statement");

        let response = self
            .client
            .post(format!("{}?requestId={}", self.statements_url, request_id))
            .bearer_auth(&self.config.token)
            .header("X-Snowflake-Authorization-Token-Type", "OAUTH")
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let parsed: StatementResponse = response.json().await?;

        if !status.is_success() {
            return Err(Error::Warehouse(format!(
                "statement rejected with status {}: {} (code {})",
                status.as_u16(),
                parsed.message.as_deref().unwrap_or("no message"),
                parsed.code.as_deref().unwrap_or("unknown"),
            )));
        }

        if let Some(handle) = &parsed.statement_handle {
            debug!(statement_handle = %handle, "Snowflake statement accepted");
        }

        Ok(parsed)
    }
}

#[async_trait]
impl Destination for SnowflakeDestination {
    fn name(&self) -> &str {
        "snowflake"
    }

    async fn load(
        &self,
        table: &str,
        records: &[Value],
        disposition: WriteDisposition,
        primary_key: Option<&[&str]>,
    ) -> Result<TableLoadInfo> {
        let started = Instant::now();
        let qualified = self.qualified(table);

        self.execute(&create_table_sql(&qualified)).await?;

        let rows_loaded = if records.is_empty() {
            // An empty window still truncates on replace; merge and append
            // have nothing to do.
            if disposition == WriteDisposition::Replace {
                self.execute(&truncate_sql(&qualified)).await?;
            }
            0
        } else {
            match (disposition, primary_key) {
                (WriteDisposition::Merge, Some(key)) => {
                    let response = self.execute(&merge_sql(&qualified, records, key)?).await?;
                    affected_rows(&response).unwrap_or(records.len() as u64)
                }
                (WriteDisposition::Replace, _) => {
                    self.execute(&truncate_sql(&qualified)).await?;
                    let response = self.execute(&insert_sql(&qualified, records)?).await?;
                    affected_rows(&response).unwrap_or(records.len() as u64)
                }
                // Append, and merge for keyless tables.
                _ => {
                    let response = self.execute(&insert_sql(&qualified, records)?).await?;
                    affected_rows(&response).unwrap_or(records.len() as u64)
                }
            }
        };

        info!(
            table = %qualified,
            disposition = %disposition,
            rows = rows_loaded,
            "Snowflake load committed"
        );

        Ok(TableLoadInfo {
            table: table.to_string(),
            disposition,
            rows_extracted: records.len(),
            rows_loaded,
            elapsed: started.elapsed(),
        })
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (data VARIANT, loaded_at TIMESTAMP_LTZ DEFAULT CURRENT_TIMESTAMP())"
    )
}

fn truncate_sql(table: &str) -> String {
    format!("TRUNCATE TABLE IF EXISTS {table}")
}

fn insert_sql(table: &str, records: &[Value]) -> Result<String> {
    let staged: Vec<&Value> = records.iter().collect();
    let values = render_values(&staged)?;
    Ok(format!(
        "INSERT INTO {table} (data) SELECT PARSE_JSON(column1) FROM VALUES {values}"
    ))
}

fn merge_sql(table: &str, records: &[Value], key: &[&str]) -> Result<String> {
    let staged = dedup_last_by_key(records, key);
    let values = render_values(&staged)?;
    let on = key
        .iter()
        .map(|field| format!("tgt.data:{field} = src.data:{field}"))
        .collect::<Vec<_>>()
        .join(" AND ");

    Ok(format!(
        "MERGE INTO {table} AS tgt \
         USING (SELECT PARSE_JSON(column1) AS data FROM VALUES {values}) AS src \
         ON {on} \
         WHEN MATCHED THEN UPDATE SET tgt.data = src.data, tgt.loaded_at = CURRENT_TIMESTAMP() \
         WHEN NOT MATCHED THEN INSERT (data) VALUES (src.data)"
    ))
}

fn render_values(records: &[&Value]) -> Result<String> {
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let json = serde_json::to_string(record)?;
        rows.push(format!("('{}')", escape_sql_literal(&json)));
    }
    Ok(rows.join(", "))
}

// Snowflake string literals treat backslash as an escape character, so it
// must be doubled along with the quote delimiter. Backslashes first.
fn escape_sql_literal(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "''")
}

/// Keep one staged row per key with the last occurrence winning, so MERGE
/// never sees the same key twice in a single batch.
fn dedup_last_by_key<'a>(records: &'a [Value], key: &[&str]) -> Vec<&'a Value> {
    let mut positions: HashMap<Vec<String>, usize> = HashMap::new();
    let mut staged: Vec<&Value> = Vec::with_capacity(records.len());

    for record in records {
        let k = record_key(record, key);
        match positions.get(&k) {
            Some(&at) => staged[at] = record,
            None => {
                positions.insert(k, staged.len());
                staged.push(record);
            }
        }
    }

    staged
}

/// DML responses carry counts like "number of rows inserted" in the first
/// data row, as strings. Sum whatever numeric cells come back.
fn affected_rows(response: &StatementResponse) -> Option<u64> {
    let first = response.data.as_ref()?.first()?;
    let mut total = 0u64;
    let mut seen = false;

    for cell in first {
        let count = match cell {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };
        if let Some(count) = count {
            total += count;
            seen = true;
        }
    }

    seen.then_some(total)
}
