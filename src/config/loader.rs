//! Configuration loader for the JSON config file
//!
//! Loads and validates `config.json` at startup. Validation failures are
//! fatal by design; nothing else in the process starts on a bad config.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::AppError;

use super::types::Config;

/// Load configuration from a JSON file
///
/// # Returns
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(AppError)` - File not found, parse error, or validation failure
pub fn load_config(path: &Path) -> Result<Config, AppError> {
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let config: Config = serde_json::from_reader(reader).map_err(|e| {
        AppError::Config(format!("JSON parse error in '{}': {}", path.display(), e))
    })?;

    config.validate()?;

    Ok(config)
}

/// Load configuration from a JSON string (useful for testing)
pub fn load_config_from_str(json: &str) -> Result<Config, AppError> {
    let config: Config =
        serde_json::from_str(json).map_err(|e| AppError::Config(format!("JSON parse error: {}", e)))?;

    config.validate()?;

    Ok(config)
}

// ============================================================================
// Tests
// ============================================================================
