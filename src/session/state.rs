//! Session state types.

use serde::{Deserialize, Serialize};

/// Lifecycle stage of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Active,
    Finished,
}

/// Deduplicated form-issue tags in first-seen order
///
/// Only grows: there is no removal API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormIssues(Vec<String>);

impl FormIssues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `issues` into the set, returning the tags that were new
    pub fn merge<'a, I>(&mut self, issues: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut added = Vec::new();
        for issue in issues {
            if !self.contains(issue) {
                self.0.push(issue.clone());
                added.push(issue.clone());
            }
        }
        added
    }

    pub fn contains(&self, issue: &str) -> bool {
        self.0.iter().any(|existing| existing == issue)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Mutable state of one workout session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub status: SessionStatus,
    pub session_id: String,
    pub started_at_ms: u64,
    pub exercise_id: String,
    pub exercise_name: String,
    /// Last count reported by the analysis service
    pub rep_count: u32,
    pub form_issues: FormIssues,
}

impl SessionState {
    pub fn idle() -> Self {
        Self {
            status: SessionStatus::Idle,
            session_id: String::new(),
            started_at_ms: 0,
            exercise_id: String::new(),
            exercise_name: String::new(),
            rep_count: 0,
            form_issues: FormIssues::new(),
        }
    }
}

/// Frozen record produced by the finish transition
///
/// Serializes to the analyze endpoint's request schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub exercise_id: String,
    pub exercise_name: String,
    pub duration_seconds: u64,
    pub rep_count: u32,
    pub issues: Vec<String>,
}
