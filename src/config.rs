//! Layered settings: built-in defaults, an optional TOML file, then
//! `PERFMON_*` environment variables.
//!
//! ```toml
//! endpoint = "http://perfmon.internal:8888"
//! poll_interval_ms = 1000
//!
//! [viewer]
//! backfill = 10
//! shift_after = 20
//!
//! [severity]
//! attribute = "cpu"
//! warning_at = 0.5
//!
//! [labels]
//! threads = "thr"
//! ```
//!
//! Nested keys map to environment variables with a double underscore, e.g.
//! `PERFMON_SEVERITY__WARNING_AT=80`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::data::{Labels, ThresholdRule};
use crate::ui::viewer::ViewerOptions;

/// Dashboard settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// URL polled for snapshot payloads.
    pub endpoint: String,
    /// Period between polls.
    pub poll_interval_ms: u64,
    /// Per-request timeout.
    pub request_timeout_ms: u64,
    pub viewer: ViewerSettings,
    pub severity: SeveritySettings,
    /// Attribute → column label overrides.
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Points drawn when a viewer opens.
    pub backfill: usize,
    /// Chart length after which new points shift the oldest out.
    pub shift_after: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeveritySettings {
    /// Attribute checked by the warning rule.
    pub attribute: String,
    /// Inclusive warning threshold.
    pub warning_at: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8888".to_string(),
            poll_interval_ms: 1000,
            request_timeout_ms: 5000,
            viewer: ViewerSettings::default(),
            severity: SeveritySettings::default(),
            labels: HashMap::new(),
        }
    }
}

impl Default for ViewerSettings {
    fn default() -> Self {
        let options = ViewerOptions::default();
        Self {
            backfill: options.backfill,
            shift_after: options.shift_after,
        }
    }
}

impl Default for SeveritySettings {
    fn default() -> Self {
        let rule = ThresholdRule::default();
        Self {
            attribute: rule.attribute,
            warning_at: rule.warning_at,
        }
    }
}

impl Settings {
    /// Load settings, reading `path` if given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("PERFMON")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("failed to read configuration")?;

        let settings: Settings = config
            .try_deserialize()
            .context("invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }
        if self.endpoint.trim().is_empty() {
            anyhow::bail!("endpoint must not be empty");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn severity_rule(&self) -> ThresholdRule {
        ThresholdRule::new(self.severity.attribute.clone(), self.severity.warning_at)
    }

    pub fn labels(&self) -> Labels {
        Labels::with_overrides(self.labels.clone())
    }

    pub fn viewer_options(&self) -> ViewerOptions {
        ViewerOptions {
            backfill: self.viewer.backfill,
            shift_after: self.viewer.shift_after,
        }
    }
}
