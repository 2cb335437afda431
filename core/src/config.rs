//! Runtime configuration. Loaded from a JSON file or built from defaults
//! that mirror the production constants.

use crate::error::LoanResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanConfig {
    /// Orders dated before this day are imported as history: no cash-flow
    /// debit, no client-class stats, no daily tier.
    pub historical_cutoff: NaiveDate,
    /// Hour at which the reporting period rolls to the next calendar day.
    pub daily_cutoff_hour: u32,
    /// Attribution group assigned to freshly created orders.
    pub default_group: String,
    /// Differences at or below this are not treated as drift.
    pub drift_epsilon: f64,
    /// Liquid funds seeded into the global aggregate on first migration.
    pub opening_liquid_funds: f64,
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            historical_cutoff: NaiveDate::from_ymd_opt(2025, 11, 28)
                .expect("valid cutoff date"),
            daily_cutoff_hour: 23,
            default_group: "S01".to_string(),
            drift_epsilon: 0.01,
            opening_liquid_funds: 100_000.0,
        }
    }
}

impl LoanConfig {
    pub fn load(path: &Path) -> LoanResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;
        let config: LoanConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }
}
