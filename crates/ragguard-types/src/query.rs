//! Search, sort and tally helpers shared by the server and its clients.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Complaint, ScanReport, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Incident date, falling back to the submission date when none was given.
    Date,
    #[default]
    Created,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Case-insensitive substring match over subject, description, location,
/// submitter name and department. A blank term matches everything.
pub fn matches_search(complaint: &Complaint, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    [
        Some(complaint.subject.as_str()),
        Some(complaint.description.as_str()),
        complaint.location.as_deref(),
        complaint.name.as_deref(),
        complaint.department.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

fn incident_day(complaint: &Complaint) -> NaiveDate {
    complaint
        .date
        .unwrap_or_else(|| complaint.created_at.date_naive())
}

pub fn sort_complaints(complaints: &mut [Complaint], key: SortKey, order: SortOrder) {
    complaints.sort_by(|a, b| {
        let ord = match key {
            SortKey::Date => incident_day(a)
                .cmp(&incident_day(b))
                .then_with(|| a.created_at.cmp(&b.created_at)),
            SortKey::Created => a.created_at.cmp(&b.created_at),
        };
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// Filter then sort, the way the admin dashboard presents complaints.
pub fn apply_listing(
    complaints: Vec<Complaint>,
    search: Option<&str>,
    key: SortKey,
    order: SortOrder,
) -> Vec<Complaint> {
    let mut out: Vec<Complaint> = match search {
        Some(term) => complaints
            .into_iter()
            .filter(|c| matches_search(c, term))
            .collect(),
        None => complaints,
    };
    sort_complaints(&mut out, key, order);
    out
}

/// Per-verdict counts over a list of scan reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictCounts {
    pub clean: usize,
    pub warning: usize,
    pub malicious: usize,
    pub total: usize,
}

impl VerdictCounts {
    pub fn tally(reports: &[ScanReport]) -> Self {
        reports.iter().fold(Self::default(), |mut acc, report| {
            match report.verdict {
                Verdict::Clean => acc.clean += 1,
                Verdict::Warning => acc.warning += 1,
                Verdict::Malicious => acc.malicious += 1,
            }
            acc.total += 1;
            acc
        })
    }

    /// Reports that need an administrator's attention.
    pub fn flagged(&self) -> usize {
        self.warning + self.malicious
    }
}
