//! Configuration loading with defaults

use std::path::Path;

use tracing::debug;

use crate::errors::Result;
use crate::fs;
use crate::schemas::Config;

/// Load `.waybill/config.json`, falling back to defaults.
///
/// Missing fields take their serde defaults. The result is validated, so a
/// ratio outside `(0, 1]` fails with `ConfigError`.
pub fn load_config(root: &Path) -> Result<Config> {
    let config = fs::read_config(root)?;
    config.validate()?;
    debug!(
        handling_fee_ratio = config.handling_fee_ratio,
        customer_score_ratio = config.customer_score_ratio,
        "Loaded configuration"
    );
    Ok(config)
}
