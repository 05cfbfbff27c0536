//! Configuration module for listing-harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and assembling the location list a run searches.
//!
//! # Example
//!
//! ```no_run
//! use listing_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Requests are spaced {}ms apart", config.fetcher.request_delay_ms);
//! ```

mod locations;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FetcherConfig, LocationsConfig, OutputConfig, SearchConfig,
    SelectorConfig,
};

pub use locations::{assemble_locations, parse_list, parse_selection, DEFAULT_SEED_LOCATIONS};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::{validate, MAX_PAGES_PER_QUERY};
