use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a status, ordered from harmless to blocking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Ok => "ok",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

/// Validation result. Statuses are reported, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub severity: Severity,

    pub message: String,

    /// Property the status is about, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,

    /// Non-empty for a multi-status
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Status>,
}

impl Status {
    pub fn ok() -> Self {
        Self::new(Severity::Ok, "")
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            property: None,
            children: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Combine statuses into one.
    ///
    /// OK entries are dropped. A single remaining entry is returned as is;
    /// several become a multi-status whose severity is the worst child's
    /// and whose message is the first worst child's message.
    pub fn merge(statuses: impl IntoIterator<Item = Status>) -> Status {
        let mut children: Vec<Status> = statuses.into_iter().filter(|s| !s.is_ok()).collect();

        match children.len() {
            0 => Status::ok(),
            1 => children.remove(0),
            _ => {
                let worst = children
                    .iter()
                    .map(|s| s.severity)
                    .max()
                    .unwrap_or(Severity::Ok);
                let message = children
                    .iter()
                    .find(|s| s.severity == worst)
                    .map(|s| s.message.clone())
                    .unwrap_or_default();
                Status {
                    severity: worst,
                    message,
                    property: None,
                    children,
                }
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }

    pub fn is_multi(&self) -> bool {
        !self.children.is_empty()
    }

    /// Messages of every leaf status, depth first
    pub fn messages(&self) -> Vec<&str> {
        if self.children.is_empty() {
            if self.message.is_empty() {
                Vec::new()
            } else {
                vec![self.message.as_str()]
            }
        } else {
            self.children.iter().flat_map(Status::messages).collect()
        }
    }

    /// Leaf statuses about one property
    pub fn for_property<'a>(&'a self, property: &'a str) -> Vec<&'a Status> {
        let mut out = Vec::new();
        self.collect_for(property, &mut out);
        out
    }

    fn collect_for<'a>(&'a self, property: &str, out: &mut Vec<&'a Status>) {
        if self.children.is_empty() {
            if self.property.as_deref() == Some(property) {
                out.push(self);
            }
        } else {
            for child in &self.children {
                child.collect_for(property, out);
            }
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}
