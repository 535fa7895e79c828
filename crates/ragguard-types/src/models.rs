use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// -- Complaint status --

/// Lifecycle of a complaint. Only administrators move a complaint between states.
///
/// ```text
/// pending ──► investigating ──► resolved
///    │              │
///    └──────────────┴─────────► dismissed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintStatus {
    #[default]
    Pending,
    Investigating,
    Resolved,
    Dismissed,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 4] = [
        ComplaintStatus::Pending,
        ComplaintStatus::Investigating,
        ComplaintStatus::Resolved,
        ComplaintStatus::Dismissed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::Investigating => "investigating",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Dismissed => "dismissed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ComplaintStatus::Resolved | ComplaintStatus::Dismissed)
    }

    /// Whether an administrator may move a complaint from `self` to `next`.
    /// Re-applying the current status is allowed and changes nothing.
    pub fn can_transition_to(self, next: ComplaintStatus) -> bool {
        use ComplaintStatus::*;

        if self == next {
            return true;
        }

        matches!(
            (self, next),
            (Pending, Investigating)
                | (Pending, Dismissed)
                | (Investigating, Resolved)
                | (Investigating, Dismissed)
        )
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ComplaintStatus::Pending),
            "investigating" => Ok(ComplaintStatus::Investigating),
            "resolved" => Ok(ComplaintStatus::Resolved),
            "dismissed" => Ok(ComplaintStatus::Dismissed),
            other => Err(ParseEnumError::new("complaint status", other)),
        }
    }
}

// -- Scan verdict --

/// Classification of an uploaded file by the reputation service.
///
/// Older clients labelled malicious files as `blocked`; that label is still
/// accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Clean,
    Warning,
    #[serde(alias = "blocked")]
    Malicious,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Clean => "clean",
            Verdict::Warning => "warning",
            Verdict::Malicious => "malicious",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clean" => Ok(Verdict::Clean),
            "warning" => Ok(Verdict::Warning),
            "malicious" | "blocked" => Ok(Verdict::Malicious),
            other => Err(ParseEnumError::new("verdict", other)),
        }
    }
}

// -- Account role --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Faculty => "faculty",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "faculty" => Ok(Role::Faculty),
            "staff" => Ok(Role::Staff),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

// -- Records --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub student_id: Option<String>,
    pub department: String,
    pub is_admin: bool,
}

/// A submitted incident report. Everything except `status` (and the
/// `updated_at` stamp that tracks it) is fixed at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Submitter's display name, filled in on admin listings.
    pub name: Option<String>,
    pub department: Option<String>,
    pub subject: String,
    pub description: String,
    /// Date the incident happened, as reported by the submitter.
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    pub witnesses: Option<String>,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub id: Uuid,
    pub user_id: Uuid,
    pub complaint_id: Uuid,
    pub name: Option<String>,
    pub department: Option<String>,
    pub original_filename: String,
    pub file_hash: String,
    pub verdict: Verdict,
    pub report_link: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_flow_follows_lifecycle() {
        use ComplaintStatus::*;

        assert!(Pending.can_transition_to(Investigating));
        assert!(Pending.can_transition_to(Dismissed));
        assert!(Investigating.can_transition_to(Resolved));
        assert!(Investigating.can_transition_to(Dismissed));

        assert!(!Pending.can_transition_to(Resolved));
        assert!(!Resolved.can_transition_to(Pending));
        assert!(!Dismissed.can_transition_to(Investigating));
        assert!(!Investigating.can_transition_to(Pending));
    }

    #[test]
    fn same_status_is_a_noop_transition() {
        for status in ComplaintStatus::ALL {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn terminal_states() {
        assert!(ComplaintStatus::Resolved.is_terminal());
        assert!(ComplaintStatus::Dismissed.is_terminal());
        assert!(!ComplaintStatus::Pending.is_terminal());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in ComplaintStatus::ALL {
            assert_eq!(status.as_str().parse::<ComplaintStatus>().unwrap(), status);
        }
        assert!("closed".parse::<ComplaintStatus>().is_err());
    }

    #[test]
    fn blocked_reads_as_malicious() {
        assert_eq!("blocked".parse::<Verdict>().unwrap(), Verdict::Malicious);
        let v: Verdict = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(v, Verdict::Malicious);
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"malicious\"");
    }

    #[test]
    fn parse_error_names_the_kind() {
        let err = "admin".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unknown role 'admin'");
    }
}
