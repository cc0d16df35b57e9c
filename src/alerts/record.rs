//! Alert record types

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a record is a finding or an internal error signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Normal finding produced by a handler
    Finding,
    /// Internal failure (RPC error, handler panic, timeout)
    Error,
}

/// Severity attached to a record
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single alert produced during a tick.
///
/// Records are never mutated after they leave the builder methods; whoever
/// holds the record owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Stable alert identifier (e.g. `QUORUM-SUPPORT-50`)
    pub alert_id: String,
    /// Human-readable name
    pub name: String,
    /// Free-form description
    pub description: String,
    pub kind: AlertKind,
    pub severity: Severity,
    /// Creation time (unix millis)
    pub timestamp: i64,
    /// Extra key/value context
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AlertRecord {
    /// Create a finding stamped with the current wall-clock time
    pub fn finding(alert_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::finding_at(alert_id, name, chrono::Utc::now().timestamp_millis())
    }

    /// Create a finding with an explicit timestamp
    pub fn finding_at(alert_id: impl Into<String>, name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            alert_id: alert_id.into(),
            name: name.into(),
            description: String::new(),
            kind: AlertKind::Finding,
            severity: Severity::Info,
            timestamp,
            metadata: BTreeMap::new(),
        }
    }

    /// Create an error-kind record with an explicit timestamp
    pub fn error_at(source: impl Into<String>, message: impl Into<String>, timestamp: i64) -> Self {
        let source = source.into();
        Self {
            alert_id: format!("{}-ERROR", source.to_uppercase()),
            name: format!("{} error", source),
            description: message.into(),
            kind: AlertKind::Error,
            severity: Severity::Info,
            timestamp,
            metadata: BTreeMap::from([("source".to_string(), source)]),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == AlertKind::Error
    }
}
