use anyhow::Context;
use clap::Parser;
use stacksearch_api::RetryConfig;
use stacksearch_cache::CacheDirectory;
use stacksearch_core::{
    actions, cache_sites, config, question_feedback, site_feedback, Config, Feedback, FzfFilter,
    StackExchangeProvider,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stacksearch")]
#[command(version, about = "Search StackExchange sites from Alfred", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Download the list of sites and their icons
    CacheSites,
    /// Script filter: choose a site
    Sites {
        #[arg(default_value = "", allow_hyphen_values = true)]
        query: String,
    },
    /// Script filter: search questions on the chosen site
    Search {
        /// `terms [#tag ...] [// local words]`
        #[arg(default_value = "", allow_hyphen_values = true)]
        query: String,
    },
    /// Reveal the chosen site's icon in Finder
    RevealIcon,
    /// Open a question link in the browser
    OpenUrl { url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the script filter JSON, so logs go to stderr
    // (Alfred's debugger shows them)
    let level = if config::debug_requested(|key| std::env::var(key).ok()) {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("warn,stacksearch={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CacheSites => {
            if let Err(e) = run_cache_sites().await {
                // the host turns stdout into the completion notification
                println!("Failed to cache sites: {:#}", e);
                return Err(e);
            }
        }
        Commands::Sites { query } => {
            let feedback = match load() {
                Ok((config, cache)) => site_feedback(&cache, &FzfFilter::new(), &config, &query).await,
                Err(e) => Err(e),
            };
            write_feedback(feedback)?;
        }
        Commands::Search { query } => {
            let feedback = match load() {
                Ok((config, cache)) => run_search(&config, &cache, &query).await,
                Err(e) => Err(e),
            };
            write_feedback(feedback)?;
        }
        Commands::RevealIcon => {
            let (config, cache) = load()?;
            actions::reveal_icon(&cache, &config.site_id).await?;
        }
        Commands::OpenUrl { url } => {
            actions::open_url(&url)?;
        }
    }

    Ok(())
}

fn load() -> stacksearch_core::Result<(Config, CacheDirectory)> {
    let config = Config::from_env()?;
    let cache = CacheDirectory::open(&config.cache_dir)?;
    Ok((config, cache))
}

async fn run_cache_sites() -> anyhow::Result<()> {
    let (config, cache) = load()?;
    let provider = StackExchangeProvider::new(config.client_options(RetryConfig::default()))?;

    let report = cache_sites(&cache, &provider)
        .await
        .with_context(|| format!("caching sites into {}", cache.root().display()))?;
    println!("{}", report);
    Ok(())
}

async fn run_search(
    config: &Config,
    cache: &CacheDirectory,
    query: &str,
) -> stacksearch_core::Result<Feedback> {
    // one attempt per keystroke
    let provider = StackExchangeProvider::new(config.client_options(RetryConfig::none()))?;
    question_feedback(&provider, cache, &FzfFilter::new(), config, query).await
}

/// Script filters always print valid feedback; errors become an item
fn write_feedback(feedback: stacksearch_core::Result<Feedback>) -> anyhow::Result<()> {
    print!("{}", Feedback::render(feedback)?);
    Ok(())
}
