use std::time::Instant;

use directory_export::auth::get_authenticated_page;
use directory_export::browser::Page;
use directory_export::config::Config;
use directory_export::downloader::Downloader;
use directory_export::error::AuthenticationError;
use directory_export::pipeline::{self, RunOptions};
use directory_export::RunSummary;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let start = Instant::now();
    let rule = "=".repeat(60);
    println!("{}\nInstant Church Directory Scraper\n{}", rule, rule);

    match run().await {
        Ok((summary, options)) => {
            let text = pipeline::format_summary(&summary, start.elapsed().as_secs_f64(), &options.export_root);
            println!("{}", text);
        }
        Err(RunError::Auth(e)) => {
            println!("\nAuthentication failed: {}", e);
            println!("Please check your credentials in the .env file");
            std::process::exit(1);
        }
        Err(RunError::Unexpected(e)) => {
            println!("\nUnexpected error: {:#}", e);
            std::process::exit(1);
        }
    }
}

enum RunError {
    Auth(AuthenticationError),
    Unexpected(anyhow::Error),
}

async fn run() -> Result<(RunSummary, RunOptions), RunError> {
    let config = Config::from_env().map_err(RunError::Auth)?;
    let options = RunOptions::from(&config);
    let downloader = Downloader::new(config.max_concurrent_downloads).map_err(RunError::Unexpected)?;

    info!("Authenticating...");
    let page = get_authenticated_page(&config).await.map_err(RunError::Auth)?;

    let result = pipeline::run(&page, &options, &downloader).await;

    info!("Closing browser...");
    if let Err(e) = page.close().await {
        warn!("Warning: Failed to quit browser: {}", e);
    }

    result.map(|summary| (summary, options)).map_err(RunError::Unexpected)
}
