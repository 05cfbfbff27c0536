//! listing-harvest main entry point
//!
//! This is the command-line interface for the two-stage listing harvester.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use listing_harvest::config::{
    assemble_locations, load_config_with_hash, parse_list, parse_selection, validate, Config,
};
use listing_harvest::crawler::{discover_links, extract_details};
use listing_harvest::output::{print_summary, read_link_file};
use listing_harvest::url::{generate_search_urls, normalize_inputs, possible_url_count};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// listing-harvest: bulk extraction of business listings
///
/// The `links` stage turns search terms and locations into detail-page links.
/// The `details` stage visits those links and scrapes contact data.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Bulk extraction of business listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover detail-page links from search listings
    Links(LinksArgs),

    /// Scrape business details from a file of detail links
    Details(DetailsArgs),
}

#[derive(Args, Debug)]
struct LinksArgs {
    /// Comma-separated search terms
    #[arg(long, value_name = "TERMS")]
    terms: Option<String>,

    /// Comma-separated 1-based indices into the seed locations
    #[arg(long, value_name = "INDICES")]
    select: Option<String>,

    /// Comma-separated extra locations
    #[arg(long, value_name = "LOCATIONS")]
    add_locations: Option<String>,

    /// Upper bound on generated URLs (0 = unlimited)
    #[arg(long, value_name = "N")]
    max_urls: Option<usize>,

    /// Result pages fetched per search
    #[arg(long, value_name = "N")]
    pages: Option<u32>,

    /// Concurrent workers (0 = unbounded)
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Output CSV path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Show how many URLs would be fetched and exit
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct DetailsArgs {
    /// Link file produced by the links stage
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output CSV path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Listing levels followed per input URL
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Do not visit the businesses' own websites
    #[arg(long)]
    no_website: bool,

    /// Concurrent workers (0 = unbounded)
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_ref())?;

    match cli.command {
        Command::Links(args) => handle_links(config, args).await,
        Command::Details(args) => handle_details(config, args).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvest=info,warn"),
            1 => EnvFilter::new("listing_harvest=debug,info"),
            2 => EnvFilter::new("listing_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load_configuration(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    Ok(config)
}

/// Handles the `links` stage
async fn handle_links(mut config: Config, args: LinksArgs) -> anyhow::Result<()> {
    if let Some(terms) = &args.terms {
        config.search.terms = parse_list(terms);
    }
    if let Some(select) = &args.select {
        config.locations.select = parse_selection(select)?;
    }
    if let Some(extra) = &args.add_locations {
        if !config.locations.custom.trim().is_empty() {
            config.locations.custom.push(',');
        }
        config.locations.custom.push_str(extra);
    }
    if let Some(max_urls) = args.max_urls {
        config.search.max_urls = max_urls;
    }
    if let Some(pages) = args.pages {
        config.search.pages_per_query = pages;
    }
    if let Some(concurrency) = args.concurrency {
        config.crawler.concurrency = concurrency;
    }
    if let Some(output) = &args.output {
        config.output.links_path = output.display().to_string();
    }
    validate(&config).context("Invalid settings")?;

    let locations = assemble_locations(&config.locations)?;
    let terms = normalize_inputs(&config.search.terms);
    if terms.is_empty() {
        bail!("No search terms given (use --terms or [search] terms)");
    }

    println!(
        "Possible URLs: {}",
        possible_url_count(
            terms.len(),
            normalize_inputs(&locations).len(),
            config.search.pages_per_query
        )
    );

    let cap = (config.search.max_urls > 0).then_some(config.search.max_urls);
    let candidates = generate_search_urls(
        &config.search.base_url,
        &terms,
        &locations,
        config.search.pages_per_query,
        cap,
    )?;

    if args.dry_run {
        println!("=== listing-harvest Dry Run ===\n");
        println!("Would fetch {} listing URLs", candidates.len());
        for candidate in candidates.iter().take(10) {
            println!("  - {}", candidate.url);
        }
        if candidates.len() > 10 {
            println!("  ... and {} more", candidates.len() - 10);
        }
        println!("\nOutput: {}", config.output.links_path);
        return Ok(());
    }

    let urls = candidates.into_iter().map(|c| c.url).collect();
    let summary = discover_links(&config, urls)
        .await
        .context("Link discovery failed")?;

    print_summary(&summary);
    println!("Links saved to {}", config.output.links_path);

    Ok(())
}

/// Handles the `details` stage
async fn handle_details(mut config: Config, args: DetailsArgs) -> anyhow::Result<()> {
    if let Some(output) = &args.output {
        config.output.details_path = output.display().to_string();
    }
    if let Some(max_depth) = args.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if args.no_website {
        config.crawler.follow_website = false;
    }
    if let Some(concurrency) = args.concurrency {
        config.crawler.concurrency = concurrency;
    }
    validate(&config).context("Invalid settings")?;

    let input = args
        .input
        .unwrap_or_else(|| PathBuf::from(&config.output.links_path));
    let urls = read_link_file(&input)
        .with_context(|| format!("Failed to read links from {}", input.display()))?;

    if urls.is_empty() {
        tracing::warn!("No URLs found in {}", input.display());
    }

    let summary = extract_details(&config, urls)
        .await
        .context("Detail extraction failed")?;

    print_summary(&summary);
    println!("Details saved to {}", config.output.details_path);

    Ok(())
}
