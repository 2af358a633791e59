use std::time::{Duration, Instant};

use common::Result;
use tracing::info;

use crate::catalog::Resource;
use crate::dates::DateRange;
use crate::destinations::{Destination, TableLoadInfo, WriteDisposition};
use crate::sources::Extract;

/// Runs one extract-then-load pass over the catalogue, one resource at a
/// time, in catalogue order. A failure on any resource aborts the run.
pub struct PipelineRunner {
    pipeline_name: String,
    dataset: String,
}

impl PipelineRunner {
    pub fn new(pipeline_name: &str, dataset: &str) -> Self {
        Self {
            pipeline_name: pipeline_name.to_string(),
            dataset: dataset.to_string(),
        }
    }

    pub async fn run<E, D>(
        &self,
        source: &E,
        destination: &D,
        resources: &[Resource],
        full_refresh: bool,
        range: &DateRange,
    ) -> Result<LoadInfo>
    where
        E: Extract + ?Sized,
        D: Destination + ?Sized,
    {
        let started = Instant::now();

        info!(
            pipeline = %self.pipeline_name,
            source = source.name(),
            destination = destination.name(),
            dataset = %self.dataset,
            start = %range.start_str(),
            end = %range.end_str(),
            resources = resources.len(),
            "Starting pipeline run"
        );

        let mut tables = Vec::with_capacity(resources.len());
        for resource in resources {
            let disposition = resolve_disposition(resource, full_refresh);
            let records = source.fetch(resource).await?;
            info!(
                resource = resource.name,
                rows = records.len(),
                disposition = %disposition,
                "Extracted resource"
            );

            let table = destination
                .load(resource.name, &records, disposition, resource.primary_key)
                .await?;
            tables.push(table);
        }

        Ok(LoadInfo {
            pipeline_name: self.pipeline_name.clone(),
            destination: destination.name().to_string(),
            dataset: self.dataset.clone(),
            range: range.clone(),
            tables,
            elapsed: started.elapsed(),
        })
    }
}

/// `--full-refresh` overrides everything to replace; otherwise keyed
/// resources merge and keyless ones append.
pub fn resolve_disposition(resource: &Resource, full_refresh: bool) -> WriteDisposition {
    if full_refresh {
        WriteDisposition::Replace
    } else if resource.primary_key.is_some() {
        WriteDisposition::Merge
    } else {
        WriteDisposition::Append
    }
}

/// Run-level summary printed at the end of every invocation.
#[derive(Debug, Clone)]
pub struct LoadInfo {
    pub pipeline_name: String,
    pub destination: String,
    pub dataset: String,
    pub range: DateRange,
    pub tables: Vec<TableLoadInfo>,
    pub elapsed: Duration,
}

impl LoadInfo {
    pub fn total_rows_extracted(&self) -> usize {
        self.tables.iter().map(|t| t.rows_extracted).sum()
    }

    pub fn total_rows_loaded(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_loaded).sum()
    }

    pub fn print_summary(&self) {
        println!();
        println!("========== Load Summary ==========");
        println!("Pipeline:    {}", self.pipeline_name);
        println!("Destination: {}", self.destination);
        println!("Dataset:     {}", self.dataset);
        println!(
            "Window:      {} to {}",
            self.range.start_str(),
            self.range.end_str()
        );
        println!("----------------------------------");
        for table in &self.tables {
            println!(
                "  {:<12} {:<8} {:>7} rows in {:.2}s",
                table.table,
                table.disposition,
                table.rows_loaded,
                table.elapsed.as_secs_f64()
            );
        }
        println!("----------------------------------");
        println!(
            "{} tables, {} rows loaded in {:.2}s",
            self.tables.len(),
            self.total_rows_loaded(),
            self.elapsed.as_secs_f64()
        );
        println!("==================================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::evocon_resources;
    use crate::destinations::MemoryDestination;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn window() -> DateRange {
        DateRange {
            start: NaiveDate::from_ymd_opt(2026, 8, 20).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 8, 22).unwrap(),
        }
    }

    struct FixtureSource {
        fixtures: HashMap<&'static str, Vec<Value>>,
        calls: AtomicUsize,
    }

    impl FixtureSource {
        fn new() -> Self {
            let mut fixtures = HashMap::new();
            fixtures.insert(
                "oee",
                vec![
                    json!({"station_id": 1, "shift_id": 10, "oee": 81.0}),
                    json!({"station_id": 1, "shift_id": 11, "oee": 77.4}),
                ],
            );
            fixtures.insert(
                "checklists",
                vec![json!({"station_id": 1, "check": "startup", "ok": true})],
            );
            Self {
                fixtures,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Extract for FixtureSource {
        fn name(&self) -> &str {
            "fixture"
        }

        async fn fetch(&self, resource: &Resource) -> Result<Vec<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.fixtures.get(resource.name).cloned().unwrap_or_default())
        }
    }

    struct RecordingDestination {
        loads: Mutex<Vec<(String, WriteDisposition)>>,
    }

    impl RecordingDestination {
        fn new() -> Self {
            Self {
                loads: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Destination for RecordingDestination {
        fn name(&self) -> &str {
            "recording"
        }

        async fn load(
            &self,
            table: &str,
            records: &[Value],
            disposition: WriteDisposition,
            _primary_key: Option<&[&str]>,
        ) -> Result<TableLoadInfo> {
            self.loads
                .lock()
                .unwrap()
                .push((table.to_string(), disposition));
            Ok(TableLoadInfo {
                table: table.to_string(),
                disposition,
                rows_extracted: records.len(),
                rows_loaded: records.len() as u64,
                elapsed: Duration::ZERO,
            })
        }
    }

    #[test]
    fn keyed_resources_merge_and_keyless_append() {
        let range = window();
        for resource in evocon_resources(&range) {
            let expected = if resource.primary_key.is_some() {
                WriteDisposition::Merge
            } else {
                WriteDisposition::Append
            };
            assert_eq!(resolve_disposition(&resource, false), expected);
        }
    }

    #[test]
    fn full_refresh_forces_replace_everywhere() {
        let range = window();
        for resource in evocon_resources(&range) {
            assert_eq!(
                resolve_disposition(&resource, true),
                WriteDisposition::Replace
            );
        }
    }

    #[tokio::test]
    async fn tables_load_in_catalogue_order() {
        let range = window();
        let resources = evocon_resources(&range);
        let source = FixtureSource::new();
        let destination = RecordingDestination::new();
        let runner = PipelineRunner::new("evocon_pipeline", "evocon");

        runner
            .run(&source, &destination, &resources, false, &range)
            .await
            .unwrap();

        let loads = destination.loads.lock().unwrap();
        let order: Vec<&str> = loads.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(
            order,
            vec!["oee", "downtime", "losses", "scrap", "checklists", "quantity"]
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), resources.len());
    }

    #[tokio::test]
    async fn summary_totals_add_up() {
        let range = window();
        let resources = evocon_resources(&range);
        let source = FixtureSource::new();
        let destination = MemoryDestination::new("evocon");
        let runner = PipelineRunner::new("evocon_pipeline", "evocon");

        let info = runner
            .run(&source, &destination, &resources, false, &range)
            .await
            .unwrap();

        assert_eq!(info.tables.len(), resources.len());
        assert_eq!(info.total_rows_extracted(), 3);
        assert_eq!(info.total_rows_loaded(), 3);
        assert_eq!(destination.row_count("oee"), 2);
        assert_eq!(destination.row_count("checklists"), 1);
        assert_eq!(destination.row_count("downtime"), 0);
    }

    #[tokio::test]
    async fn a_failing_resource_aborts_the_run() {
        struct FailingSource;

        #[async_trait]
        impl Extract for FailingSource {
            fn name(&self) -> &str {
                "failing"
            }

            async fn fetch(&self, resource: &Resource) -> Result<Vec<Value>> {
                if resource.name == "losses" {
                    return Err(common::Error::Api {
                        status: 500,
                        resource: resource.name.to_string(),
                    });
                }
                Ok(vec![json!({"station_id": 1})])
            }
        }

        let range = window();
        let resources = evocon_resources(&range);
        let destination = RecordingDestination::new();
        let runner = PipelineRunner::new("evocon_pipeline", "evocon");

        let result = runner
            .run(&FailingSource, &destination, &resources, false, &range)
            .await;

        assert!(result.is_err());
        // oee and downtime committed before the failure, nothing after.
        assert_eq!(destination.loads.lock().unwrap().len(), 2);
    }
}
