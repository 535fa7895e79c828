//! Row → API model conversion. Corrupt columns are logged and replaced with
//! defaults rather than failing a whole listing.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;
use uuid::Uuid;

use ragguard_db::models::{ComplaintRow, ScanReportRow, UserRow};
use ragguard_types::models::{Complaint, ComplaintStatus, Role, ScanReport, UserProfile, Verdict};

fn parse_uuid(value: &str, column: &str, row_id: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", column, value, row_id, e);
        Uuid::default()
    })
}

fn parse_timestamp(value: &str, column: &str, row_id: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') format, in case rows were written by hand
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}' on row '{}': {}", column, value, row_id, e);
            DateTime::default()
        })
}

pub fn parse_incident_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn user_profile(row: &UserRow) -> UserProfile {
    UserProfile {
        id: parse_uuid(&row.id, "id", &row.id),
        name: row.name.clone(),
        email: row.email.clone(),
        role: row.role.parse().unwrap_or_else(|e| {
            warn!("Corrupt role on user '{}': {}", row.id, e);
            Role::Student
        }),
        student_id: row.student_id.clone(),
        department: row.department.clone(),
        is_admin: row.is_admin,
    }
}

pub fn complaint(row: ComplaintRow) -> Complaint {
    let status = row.status.parse().unwrap_or_else(|e| {
        warn!("Corrupt status on complaint '{}': {}", row.id, e);
        ComplaintStatus::Pending
    });

    Complaint {
        id: parse_uuid(&row.id, "id", &row.id),
        user_id: parse_uuid(&row.user_id, "user_id", &row.id),
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
        updated_at: parse_timestamp(&row.updated_at, "updated_at", &row.id),
        date: row.incident_date.as_deref().and_then(parse_incident_date),
        name: row.submitter_name,
        department: row.submitter_department,
        subject: row.subject,
        description: row.description,
        location: row.location,
        witnesses: row.witnesses,
        file_name: row.file_name,
        file_path: row.file_path,
        status,
    }
}

pub fn scan_report(row: ScanReportRow) -> ScanReport {
    let verdict = row.verdict.parse().unwrap_or_else(|e| {
        warn!("Corrupt verdict on scan report '{}': {}", row.id, e);
        Verdict::Warning
    });

    ScanReport {
        id: parse_uuid(&row.id, "id", &row.id),
        user_id: parse_uuid(&row.user_id, "user_id", &row.id),
        complaint_id: parse_uuid(&row.complaint_id, "complaint_id", &row.id),
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
        name: row.submitter_name,
        department: row.submitter_department,
        original_filename: row.original_filename,
        file_hash: row.file_hash,
        verdict,
        report_link: row.report_link,
        details: row.details,
    }
}
