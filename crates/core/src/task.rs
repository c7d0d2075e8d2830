//! Units of scheduled work.
//!
//! A [`Task`] names one resource to fetch and persist. Tasks are created by the
//! scheduler while seeding the work queue and are consumed exactly once by a
//! worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building a task.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The target identifier was empty or whitespace.
    #[error("task target must not be empty")]
    EmptyTarget,
}

/// Pick-up class of a task.
///
/// Variants are ordered: `High` is always handed out before `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Pages reported by the updated-pages list.
    High,
    /// Pages from the static seed list.
    Low,
}

impl Priority {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resource to fetch and persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    priority: Priority,
    target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a task, rejecting an empty target.
    pub fn new(
        priority: Priority,
        target: impl Into<String>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Result<Self, TaskError> {
        let target = target.into().trim().to_string();
        if target.is_empty() {
            return Err(TaskError::EmptyTarget);
        }
        Ok(Self {
            priority,
            target,
            updated_at,
        })
    }

    /// Low-priority task for a static seed entry.
    pub fn seed(target: impl Into<String>) -> Result<Self, TaskError> {
        Self::new(Priority::Low, target, None)
    }

    /// High-priority task for a page reported as updated.
    pub fn updated_page(
        target: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        Self::new(Priority::High, target, Some(updated_at))
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Last update time reported by the dynamic source, if any.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_seed_task_is_low_without_timestamp() {
        let task = Task::seed("/about/").unwrap();
        assert_eq!(task.priority(), Priority::Low);
        assert_eq!(task.target(), "/about/");
        assert!(task.updated_at().is_none());
    }

    #[test]
    fn test_updated_page_is_high_with_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let task = Task::updated_page("/news/", ts).unwrap();
        assert_eq!(task.priority(), Priority::High);
        assert_eq!(task.updated_at(), Some(ts));
    }

    #[test]
    fn test_empty_target_rejected() {
        assert_eq!(Task::seed("").unwrap_err(), TaskError::EmptyTarget);
        assert_eq!(Task::seed("   ").unwrap_err(), TaskError::EmptyTarget);
    }

    #[test]
    fn test_target_is_trimmed() {
        let task = Task::seed("  a.html\r").unwrap();
        assert_eq!(task.target(), "a.html");
    }

    #[test]
    fn test_high_sorts_before_low() {
        assert!(Priority::High < Priority::Low);
        assert_eq!(Priority::High.to_string(), "high");
    }
}
