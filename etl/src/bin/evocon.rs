use std::process;

use etl::{run_etl_pipeline, RunOptions};

// Cron entrypoint: no flags, defaults only. The scheduled job runs the
// two-day overlap window against whatever the config file says.
#[tokio::main]
async fn main() {
    etl::logging::init();

    // Get config path from command line args or use default
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/evocon.toml".to_string());

    println!("Starting Evocon pipeline with config: {}", config_path);

    if let Err(e) = run_etl_pipeline(&config_path, RunOptions::default()).await {
        eprintln!("Evocon pipeline error: {}", e);
        process::exit(1);
    }
}
