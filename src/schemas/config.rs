//! Config schema - Workspace configuration

use serde::{Deserialize, Serialize};

use crate::errors::{Result, WaybillError};

/// Main configuration for a waybill workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for forward compatibility
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Company name shown in listings
    #[serde(default = "default_company_name")]
    pub company_name: String,

    /// Share of the collected goods value kept as handling fee (rounded up)
    #[serde(default = "default_handling_fee_ratio")]
    pub handling_fee_ratio: f64,

    /// Score accrued per unit of freight fee (rounded up)
    #[serde(default = "default_customer_score_ratio")]
    pub customer_score_ratio: f64,
}

fn default_schema_version() -> u32 {
    1
}

fn default_company_name() -> String {
    "PP Logistics".to_string()
}

fn default_handling_fee_ratio() -> f64 {
    0.002
}

fn default_customer_score_ratio() -> f64 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Config {
            schema_version: 1,
            company_name: default_company_name(),
            handling_fee_ratio: default_handling_fee_ratio(),
            customer_score_ratio: default_customer_score_ratio(),
        }
    }
}

impl Config {
    /// Check that both ratios lie in (0, 1]
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("handling_fee_ratio", self.handling_fee_ratio),
            ("customer_score_ratio", self.customer_score_ratio),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(WaybillError::ConfigError(format!(
                    "{} must be greater than 0 and at most 1, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
