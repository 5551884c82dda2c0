//! Config utils.

use std::collections::HashMap;
use std::str::FromStr;

use crate::core::error::SimulationError;

/// Parses config value string, which consists of two parts - name and options.
/// Example: BruteForce[max_vms=6] parts are name BruteForce and options string "max_vms=6".
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((l, r)) => (l.trim().to_string(), Some(r.replace(']', ""))),
        None => (config_str.trim().to_string(), None),
    }
}

/// Parses options string from config value, returns map with option names and values.
///
/// # Examples
///
/// ```rust
/// use dslab_vm_scheduling::core::config::options::parse_options;
///
/// let options = parse_options("threshold=0.8,signal=price");
/// assert_eq!(options.get("threshold").unwrap(), "0.8");
/// assert_eq!(options.get("signal").unwrap(), "price");
/// assert_eq!(options.get("location"), None);
/// ```
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    for option_str in options_str.split(',') {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    options
}

/// Returns parsed value of the option or `None` if the option is absent.
pub fn parse_option<T: FromStr>(options: &HashMap<String, String>, name: &str) -> Result<Option<T>, SimulationError> {
    match options.get(name) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| SimulationError::Config(format!("invalid value of option {}: {}", name, value))),
        None => Ok(None),
    }
}
