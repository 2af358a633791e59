pub mod memory;
pub mod snowflake;

pub use memory::MemoryDestination;
pub use snowflake::SnowflakeDestination;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use common::Result;
use serde_json::Value;

/// How freshly extracted rows reconcile with what the warehouse already holds
/// for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDisposition {
    /// Upsert by primary key.
    Merge,
    /// Drop existing rows, then insert.
    Replace,
    /// Insert without looking at existing rows.
    Append,
}

impl WriteDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteDisposition::Merge => "merge",
            WriteDisposition::Replace => "replace",
            WriteDisposition::Append => "append",
        }
    }
}

impl fmt::Display for WriteDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-table outcome reported back to the runner.
#[derive(Debug, Clone)]
pub struct TableLoadInfo {
    pub table: String,
    pub disposition: WriteDisposition,
    pub rows_extracted: usize,
    pub rows_loaded: u64,
    pub elapsed: Duration,
}

/// A warehouse backend that commits one table's worth of records at a time.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Short name for logs and the run summary.
    fn name(&self) -> &str;

    async fn load(
        &self,
        table: &str,
        records: &[Value],
        disposition: WriteDisposition,
        primary_key: Option<&[&str]>,
    ) -> Result<TableLoadInfo>;
}

/// Composite merge key for one record: its key fields rendered as JSON.
/// Missing fields become null so malformed rows still key deterministically.
pub(crate) fn record_key(record: &Value, key: &[&str]) -> Vec<String> {
    key.iter()
        .map(|field| {
            record
                .get(*field)
                .cloned()
                .unwrap_or(Value::Null)
                .to_string()
        })
        .collect()
}
