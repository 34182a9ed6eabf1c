use anyhow::{Context, Result};
use clap::Parser;
use gifguess_acquisition::service::cache_store_from_config;
use gifguess_acquisition::{AcquisitionConfig, GifAcquisition};
use gifguess_core::{init_tracing, load_dotenv, ConfigLoader, RedisConfig, TracingConfig};

#[derive(Parser)]
#[command(name = "gif-acquire")]
#[command(about = "Fetch, re-host, and cache GIFs for a set of search terms", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(required = true, help = "Search terms")]
    queries: Vec<String>,

    #[arg(short, long, default_value = "4", help = "Items wanted per term")]
    limit: usize,

    #[arg(long, env = "GIPHY_API_KEY", help = "Search provider API key")]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    load_dotenv();

    let cli = Cli::parse();

    init_tracing(TracingConfig {
        service_name: "gif-acquire".to_string(),
        ..TracingConfig::from_env()
    })
    .context("Failed to initialise tracing")?;

    let mut config = AcquisitionConfig::load().context("Failed to load configuration")?;
    if let Some(key) = cli.api_key {
        config.provider.api_key = key;
    }
    let redis = match config.cache.redis_config() {
        Some(redis) => Some(redis),
        None => RedisConfig::from_env().ok(),
    };

    let store = cache_store_from_config(&config.cache, redis).await;
    let service = GifAcquisition::from_config(&config, store)
        .context("Failed to build acquisition service")?;

    let results = service.search_many(&cli.queries, cli.limit).await;

    let json = serde_json::to_string_pretty(&results).context("Failed to encode results")?;
    println!("{}", json);

    Ok(())
}
