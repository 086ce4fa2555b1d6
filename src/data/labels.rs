//! Short display labels for hosts, processes and attribute columns.

use std::collections::HashMap;

/// Built-in column labels for the attributes the perfmon daemon reports.
const DEFAULT_LABELS: &[(&str, &str)] = &[
    ("cpu", "cpu"),
    ("vmem", "mem"),
    ("io_read", "ioR"),
    ("io_write", "ioW"),
    ("net_recv", "netR"),
    ("net_send", "netS"),
    ("rss", "rss"),
];

/// Attribute → column header mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    short: HashMap<String, String>,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            short: DEFAULT_LABELS
                .iter()
                .map(|(attr, label)| (attr.to_string(), label.to_string()))
                .collect(),
        }
    }
}

impl Labels {
    /// Defaults extended or overridden by `overrides`.
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut labels = Self::default();
        labels
            .short
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        labels
    }

    /// Column header for an attribute; unknown attributes keep their name.
    pub fn column<'a>(&'a self, attr: &'a str) -> &'a str {
        self.short.get(attr).map(String::as_str).unwrap_or(attr)
    }
}

/// Host name up to the first `-`.
pub fn short_host(name: &str) -> &str {
    name.split('-').next().unwrap_or(name)
}

/// Process name up to the first `:`.
pub fn short_process(name: &str) -> &str {
    name.split(':').next().unwrap_or(name)
}
