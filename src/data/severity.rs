//! Cell severity classification.
//!
//! The dashboard asks a [`SeverityRule`] for every cell it draws, so the
//! rule can be swapped without touching the renderer.

use serde::Serialize;

/// Severity class of a dashboard cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
}

impl Severity {
    /// Class name used in exports.
    pub fn class(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
        }
    }
}

/// Maps an attribute and its latest value to a severity.
///
/// `value` is `None` for a blank cell.
pub trait SeverityRule {
    fn classify(&self, attr: &str, value: Option<f64>) -> Severity;
}

impl<F> SeverityRule for F
where
    F: Fn(&str, Option<f64>) -> Severity,
{
    fn classify(&self, attr: &str, value: Option<f64>) -> Severity {
        self(attr, value)
    }
}

/// Flags one attribute as `Warning` once its value reaches a threshold.
///
/// Every other attribute is `Info`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    pub attribute: String,
    pub warning_at: f64,
}

impl ThresholdRule {
    pub fn new(attribute: impl Into<String>, warning_at: f64) -> Self {
        Self {
            attribute: attribute.into(),
            warning_at,
        }
    }
}

impl Default for ThresholdRule {
    fn default() -> Self {
        Self::new("cpu", 0.5)
    }
}

impl SeverityRule for ThresholdRule {
    fn classify(&self, attr: &str, value: Option<f64>) -> Severity {
        match value {
            Some(v) if attr == self.attribute && v >= self.warning_at => Severity::Warning,
            _ => Severity::Info,
        }
    }
}
