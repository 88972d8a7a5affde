//! Architecture configuration
//!
//! Settings that are not part of the graph itself: how kernels are truncated
//! and how the hot-reload monitor behaves. Filled from the `.config` section
//! of an architecture file on initial load, or from JSON.

use crate::error::{DynfieldError, Result};
use crate::weights::{Truncation, DEFAULT_CUTOFF_FACTOR};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Architecture configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchConfig {
    /// Sigmas a Gaussian kernel extends before truncation
    pub kernel_cutoff_factor: f64,
    /// Whether field domains wrap around when truncating kernels
    pub circular_kernels: bool,
    /// Quiet period before a changed file is reloaded (ms)
    pub reload_debounce_ms: u64,
    /// Reload events kept in history
    pub max_reload_history: usize,
}

impl Default for ArchConfig {
    fn default() -> Self {
        Self {
            kernel_cutoff_factor: DEFAULT_CUTOFF_FACTOR,
            circular_kernels: false,
            reload_debounce_ms: 100,
            max_reload_history: 100,
        }
    }
}

impl ArchConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DynfieldError::InvalidConfiguration(format!("bad config JSON: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Truncation geometry for a field of the given shape.
    pub fn truncation(&self, field_sizes: &[usize]) -> Truncation {
        Truncation::for_sizes(field_sizes)
            .circular(self.circular_kernels)
            .with_cutoff_factor(self.kernel_cutoff_factor)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.reload_debounce_ms)
    }

    /// Apply one `key value` setting from an architecture file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let bad = |what: &str| {
            DynfieldError::InvalidConfiguration(format!("{} expects {}, got '{}'", key, what, value))
        };
        match key {
            "kernel_cutoff_factor" => {
                self.kernel_cutoff_factor = value.parse().map_err(|_| bad("a number"))?
            }
            "circular_kernels" => self.circular_kernels = value.parse().map_err(|_| bad("true or false"))?,
            "reload_debounce_ms" => {
                self.reload_debounce_ms = value.parse().map_err(|_| bad("milliseconds"))?
            }
            "max_reload_history" => {
                self.max_reload_history = value.parse().map_err(|_| bad("a count"))?
            }
            _ => {
                return Err(DynfieldError::InvalidConfiguration(format!(
                    "unknown config key: {}",
                    key
                )))
            }
        }
        Ok(())
    }
}
