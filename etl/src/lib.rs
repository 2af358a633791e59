pub mod catalog;
pub mod dates;
pub mod destinations;
pub mod logging;
pub mod pipeline;
pub mod secrets;
pub mod sources;
pub mod utils;

pub use common::{Error, Result};

use common::config::{DestinationKind, Environment, Settings};

use crate::dates::DateRange;
use crate::destinations::{Destination, MemoryDestination, SnowflakeDestination};
use crate::pipeline::PipelineRunner;
use crate::sources::EvoconClient;

pub const PIPELINE_NAME: &str = "evocon_pipeline";

/// Per-invocation overrides collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub full_refresh: bool,
    pub environment: Option<Environment>,
}

/// Run the complete Evocon extract-and-load pipeline.
///
/// Credentials are resolved before any network client exists, so a
/// misconfigured deployment dies without sending a single request.
pub async fn run_etl_pipeline(config_path: &str, options: RunOptions) -> Result<()> {
    let mut settings = Settings::new(config_path)?;
    if let Some(environment) = options.environment {
        settings.environment = environment;
    }

    let credentials = secrets::resolve_credentials(&settings)?;

    let range = DateRange::resolve(
        options.start_date.as_deref(),
        options.end_date.as_deref(),
        settings.evocon.overlap_days,
    )?;

    let resources = catalog::evocon_resources(&range);
    let source = EvoconClient::new(&settings.evocon, credentials)?;
    let destination = build_destination(&settings)?;

    let runner = PipelineRunner::new(PIPELINE_NAME, settings.dataset_name());
    let info = runner
        .run(
            &source,
            destination.as_ref(),
            &resources,
            options.full_refresh,
            &range,
        )
        .await?;

    info.print_summary();

    Ok(())
}

fn build_destination(settings: &Settings) -> Result<Box<dyn Destination>> {
    match settings.destination {
        DestinationKind::Snowflake => {
            let snowflake = settings.snowflake.as_ref().ok_or_else(|| {
                Error::InvalidInput(
                    "destination 'snowflake' requires a [snowflake] settings block".to_string(),
                )
            })?;
            Ok(Box::new(SnowflakeDestination::new(
                snowflake,
                settings.dataset_name(),
            )?))
        }
        DestinationKind::Memory => Ok(Box::new(MemoryDestination::new(settings.dataset_name()))),
    }
}
