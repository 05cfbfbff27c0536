//! Seed locations and assembly of the final location list
//!
//! The location list is built exactly once, before URL generation starts, from
//! the configured seeds, an optional index selection and optional custom
//! additions. The result is an owned `Vec` that nothing mutates afterwards.

use crate::config::types::LocationsConfig;
use crate::ConfigError;

/// Metro-area locations around the DMV region searched by default
pub const DEFAULT_SEED_LOCATIONS: [&str; 31] = [
    "Bethesda, MD",
    "Washington, DC",
    "Arlington, VA",
    "Alexandria, VA",
    "Silver Spring, MD",
    "Rockville, MD",
    "Fairfax, VA",
    "Reston, VA",
    "Falls Church, VA",
    "Gaithersburg, MD",
    "McLean, VA",
    "College Park, MD",
    "Vienna, VA",
    "Bowie, MD",
    "Annandale, VA",
    "Chevy Chase, MD",
    "Tysons, VA",
    "Herndon, VA",
    "Columbia, MD",
    "Frederick, MD",
    "Laurel, MD",
    "Greenbelt, MD",
    "Manassas, VA",
    "Germantown, MD",
    "Stafford, VA",
    "Leesburg, VA",
    "Woodbridge, VA",
    "Annapolis, MD",
    "Hagerstown, MD",
    "Winchester, VA",
    "Fredericksburg, VA",
];

/// Assembles the immutable location list for a run
///
/// `select` holds 1-based indices into the seeds; an empty selection keeps every
/// seed. Custom locations are split on commas, trimmed, and appended after the
/// selected seeds.
///
/// # Errors
///
/// Returns `ConfigError::InvalidSelection` when an index is zero or past the end
/// of the seed list.
pub fn assemble_locations(config: &LocationsConfig) -> Result<Vec<String>, ConfigError> {
    let mut locations = if config.select.is_empty() {
        config.seeds.clone()
    } else {
        let mut selected = Vec::with_capacity(config.select.len());
        for &index in &config.select {
            let seed = index
                .checked_sub(1)
                .and_then(|i| config.seeds.get(i))
                .ok_or_else(|| {
                    ConfigError::InvalidSelection(format!(
                        "location {} is out of range (1-{})",
                        index,
                        config.seeds.len()
                    ))
                })?;
            selected.push(seed.clone());
        }
        selected
    };

    locations.extend(parse_list(&config.custom));

    Ok(locations)
}

/// Splits a comma-separated list into trimmed, non-empty entries
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses a comma-separated list of 1-based location indices
///
/// # Errors
///
/// Returns `ConfigError::InvalidSelection` if any entry is not a number.
pub fn parse_selection(input: &str) -> Result<Vec<usize>, ConfigError> {
    parse_list(input)
        .iter()
        .map(|entry| {
            entry.parse::<usize>().map_err(|_| {
                ConfigError::InvalidSelection(format!("'{}' is not a location number", entry))
            })
        })
        .collect()
}
