//! User-facing notifications ("toasts") raised by adapters and the board.

use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Fire-and-forget sink. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}

fn trace_notification(severity: Severity, message: &str) {
    match severity {
        Severity::Error => error!(target: "crm::notify", %message, "notification"),
        Severity::Warning => warn!(target: "crm::notify", %message, "notification"),
        Severity::Success | Severity::Info => {
            info!(target: "crm::notify", %severity, %message, "notification")
        }
    }
}

/// Writes every notification to the log. Used by the CLI.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        trace_notification(severity, message);
    }
}

/// Bounded in-memory feed; the oldest entry is evicted once full.
#[derive(Debug)]
pub struct NotificationFeed {
    capacity: usize,
    entries: Mutex<VecDeque<Notification>>,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn shared(capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(capacity))
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, VecDeque<Notification>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<Notification> {
        self.entries().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Oldest first, as `(severity, message)` pairs.
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.entries()
            .iter()
            .map(|entry| (entry.severity, entry.message.clone()))
            .collect()
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Notifier for NotificationFeed {
    fn notify(&self, severity: Severity, message: &str) {
        trace_notification(severity, message);
        let mut entries = self.entries();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(Notification {
            severity,
            message: message.to_string(),
            at: Utc::now(),
        });
    }
}
