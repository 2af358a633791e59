use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use common::Result;
use serde_json::Value;
use tracing::debug;

use super::{record_key, Destination, TableLoadInfo, WriteDisposition};

/// In-process destination with real disposition semantics. Local dry runs and
/// tests use it in place of the warehouse.
pub struct MemoryDestination {
    dataset: String,
    tables: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryDestination {
    pub fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot of a table's rows in load order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl Destination for MemoryDestination {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(
        &self,
        table: &str,
        records: &[Value],
        disposition: WriteDisposition,
        primary_key: Option<&[&str]>,
    ) -> Result<TableLoadInfo> {
        let started = Instant::now();
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();

        let rows_loaded = match disposition {
            WriteDisposition::Replace => {
                rows.clear();
                rows.extend_from_slice(records);
                records.len()
            }
            WriteDisposition::Append => {
                rows.extend_from_slice(records);
                records.len()
            }
            WriteDisposition::Merge => match primary_key {
                Some(key) => upsert(rows, records, key),
                // Merging without a key degrades to append, the same fallback
                // the warehouse writer applies.
                None => {
                    rows.extend_from_slice(records);
                    records.len()
                }
            },
        };

        debug!(
            dataset = %self.dataset,
            table,
            total_rows = rows.len(),
            "Memory load committed"
        );

        Ok(TableLoadInfo {
            table: table.to_string(),
            disposition,
            rows_extracted: records.len(),
            rows_loaded: rows_loaded as u64,
            elapsed: started.elapsed(),
        })
    }
}

fn upsert(rows: &mut Vec<Value>, records: &[Value], key: &[&str]) -> usize {
    for record in records {
        let incoming = record_key(record, key);
        match rows.iter_mut().find(|row| record_key(row, key) == incoming) {
            Some(existing) => *existing = record.clone(),
            None => rows.push(record.clone()),
        }
    }
    records.len()
}
