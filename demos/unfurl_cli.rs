use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use unfurl_scraper::{
    ClientConfig, MemoryInstrumentationStorage, NetworkConfig, ResourceType, ScrapeContext,
    Scraper, ScraperConfig,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ForcedType {
    Generic,
    ImageService,
    Map,
}

impl From<ForcedType> for ResourceType {
    fn from(value: ForcedType) -> Self {
        match value {
            ForcedType::Generic => ResourceType::Generic,
            ForcedType::ImageService => ResourceType::ImageService,
            ForcedType::Map => ResourceType::Map,
        }
    }
}

/// Unfurl one or more URLs and print the raw result as JSON.
#[derive(Debug, Parser)]
struct Args {
    /// URLs to unfurl
    #[arg(required = true)]
    urls: Vec<String>,

    /// Skip classification and use this strategy
    #[arg(long, value_enum)]
    force: Option<ForcedType>,

    /// Per-URL deadline in seconds
    #[arg(long, default_value_t = 15)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();

    #[cfg(feature = "logging")]
    {
        use unfurl_scraper::{setup_logging, LogConfig};

        setup_logging(LogConfig {
            file_output: false,
            ..LogConfig::default()
        })?;
    }

    let storage = Arc::new(MemoryInstrumentationStorage::new());
    let scraper = Scraper::new(
        ScraperConfig::new().with_client_config(
            ClientConfig::default()
                .with_network(NetworkConfig::from_env())
                .with_instrumentation(storage.clone()),
        ),
    );

    for url in &args.urls {
        let ctx = ScrapeContext::with_timeout(Duration::from_secs(args.timeout));
        println!("\n{} {}", "Unfurling".bold().blue(), url);

        match scraper.scrape(&ctx, url, args.force.map(Into::into)).await {
            Ok(raw) => {
                #[cfg(feature = "logging")]
                unfurl_scraper::log_unfurl_card(&raw, url);
                println!("{}: {}", "Type".bold(), raw.resource_type());
                println!("{}", serde_json::to_string_pretty(&raw)?);
            }
            Err(e) => {
                #[cfg(feature = "logging")]
                unfurl_scraper::log_error_card(url, &e);
                println!("{}: {}", "Error".bold().red(), e);
            }
        }
    }

    println!(
        "\n{} {} requests, {} bytes",
        "Network:".bold().green(),
        storage.len(),
        storage.total_bytes()
    );
    Ok(())
}
