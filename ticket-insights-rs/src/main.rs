// ticket-insights: run the extraction → summary → report pipeline
//
// Usage: ticket-insights [START END]   (dates as YYYY-MM-DD)

use std::env;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};

use ticket_insights::config::{InferenceConfig, PipelineConfig, DEFAULT_PROVIDER};
use ticket_insights::{render, source, ClientBuilder, Pipeline};

fn parse_window_args(args: &[String]) -> anyhow::Result<Option<(NaiveDate, NaiveDate)>> {
    match args {
        [] => Ok(None),
        [start, end] => {
            let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
                .with_context(|| format!("invalid START date {:?}", start))?;
            let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
                .with_context(|| format!("invalid END date {:?}", end))?;
            if start > end {
                bail!("START {} is after END {}", start, end);
            }
            Ok(Some((start, end)))
        }
        _ => bail!("usage: ticket-insights [START END]  (dates as YYYY-MM-DD)"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let window = parse_window_args(&args)?;

    let pipeline_config =
        PipelineConfig::from_provider(&**DEFAULT_PROVIDER).context("loading pipeline configuration")?;
    let inference_config =
        InferenceConfig::from_provider(&**DEFAULT_PROVIDER).context("loading inference configuration")?;
    log::info!("Using model {} at {}", inference_config.model, inference_config.base_url);

    let tickets = source::load_tickets(&pipeline_config.tickets_file)
        .with_context(|| format!("loading {}", pipeline_config.tickets_file.display()))?;

    let (start, end) = match window {
        Some(window) => window,
        None => {
            let window = source::default_window(&tickets)?;
            log::info!("Date range: {} to {} (last 2 days)", window.0, window.1);
            window
        }
    };

    let tickets = source::filter_window(tickets, start, end);
    log::info!("{} tickets in window {} to {}", tickets.len(), start, end);
    if tickets.is_empty() {
        bail!("no tickets between {} and {}", start, end);
    }

    let client = ClientBuilder::new()
        .config(inference_config)
        .build()
        .context("building inference client")?;
    let pipeline = Pipeline::from_config(&pipeline_config, client)?;

    let today = Local::now().date_naive();
    let output = pipeline.run(&tickets, today).await.context("pipeline run failed")?;

    let path = render::write_markdown(&output.report, &pipeline_config.reports_dir())?;
    log::info!("Saved report to {}", path.display());

    println!("{}", render::console_digest(&output.report));
    println!("Full report: {}", path.display());

    Ok(())
}
