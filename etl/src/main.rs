use clap::{Arg, ArgAction, Command};
use std::process;

use etl::RunOptions;

#[tokio::main]
async fn main() {
    etl::logging::init();

    let matches = Command::new("Evocon Pipeline Manager")
        .version("1.0")
        .about("Manages the Evocon extract-and-load pipeline")
        .subcommand(
            Command::new("run")
                .about("Run the Evocon extract-and-load pipeline")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Sets a custom config file"),
                )
                .arg(
                    Arg::new("start-date")
                        .long("start-date")
                        .value_name("YYYY-MM-DD")
                        .help("Start of the extraction window"),
                )
                .arg(
                    Arg::new("end-date")
                        .long("end-date")
                        .value_name("YYYY-MM-DD")
                        .help("End of the extraction window"),
                )
                .arg(
                    Arg::new("full-refresh")
                        .long("full-refresh")
                        .action(ArgAction::SetTrue)
                        .help("Replace warehouse tables instead of merging"),
                )
                .arg(
                    Arg::new("environment")
                        .long("environment")
                        .value_name("ENV")
                        .value_parser(["dev", "prod"])
                        .help("Target environment; dev loads the staging dataset"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let config_path = run_matches
                .get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/evocon.toml");

            // clap already validated the value, so a parse failure cannot
            // happen here.
            let environment = run_matches
                .get_one::<String>("environment")
                .and_then(|s| s.parse().ok());

            let options = RunOptions {
                start_date: run_matches.get_one::<String>("start-date").cloned(),
                end_date: run_matches.get_one::<String>("end-date").cloned(),
                full_refresh: run_matches.get_flag("full-refresh"),
                environment,
            };

            println!("Starting Evocon pipeline with config: {}", config_path);

            if let Err(e) = etl::run_etl_pipeline(config_path, options).await {
                eprintln!("Evocon pipeline error: {}", e);
                process::exit(1);
            }
        }

        _ => {
            eprintln!("Please specify a valid subcommand");
            process::exit(1);
        }
    }
}
