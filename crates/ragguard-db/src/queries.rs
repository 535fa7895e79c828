use crate::Database;
use crate::models::{ComplaintRow, ScanReportRow, UserRow};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, Row};

use ragguard_types::models::{ComplaintStatus, Verdict};

/// Result of [`Database::transition_complaint_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    NotFound,
    Unchanged,
    Rejected { from: ComplaintStatus },
    Updated { from: ComplaintStatus },
}

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
/// ordering in SQL matches chronological ordering.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub student_id: Option<String>,
    pub department: String,
    pub is_admin: bool,
    pub created_at: String,
}

pub struct NewComplaint {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub description: String,
    pub incident_date: Option<String>,
    pub location: Option<String>,
    pub witnesses: Option<String>,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub created_at: String,
}

pub struct NewScanReport {
    pub id: String,
    pub user_id: String,
    pub original_filename: String,
    pub file_hash: String,
    pub verdict: Verdict,
    pub report_link: String,
    pub details: Option<String>,
}

const COMPLAINT_SELECT: &str = "
    SELECT c.id, c.user_id, u.name, u.department, c.subject, c.description,
           c.incident_date, c.location, c.witnesses, c.file_name, c.file_path,
           c.status, c.created_at, c.updated_at
    FROM complaints c
    LEFT JOIN users u ON c.user_id = u.id";

const SCAN_SELECT: &str = "
    SELECT s.id, s.user_id, s.complaint_id, u.name, u.department,
           s.original_filename, s.file_hash, s.verdict, s.report_link,
           s.details, s.created_at
    FROM scan_reports s
    LEFT JOIN users u ON s.user_id = u.id";

impl Database {
    // -- Users --

    /// Insert a user. Returns false, leaving the table untouched, when the
    /// email is already registered.
    pub fn create_user(&self, user: &NewUser) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, name, email, password, role, student_id, department, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(email) DO NOTHING",
                rusqlite::params![
                    user.id,
                    user.name,
                    user.email,
                    user.password_hash,
                    user.role,
                    user.student_id,
                    user.department,
                    user.is_admin,
                    user.created_at,
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, email, password, role, student_id, department, is_admin, created_at
                     FROM users WHERE email = ?1",
                    [email],
                    user_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Complaints --

    /// Insert a complaint and, when a file was scanned, its scan report, in a
    /// single transaction. Both rows share the complaint's `created_at`.
    pub fn insert_complaint(
        &self,
        complaint: &NewComplaint,
        scan: Option<&NewScanReport>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO complaints (id, user_id, subject, description, incident_date, location,
                                         witnesses, file_name, file_path, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                rusqlite::params![
                    complaint.id,
                    complaint.user_id,
                    complaint.subject,
                    complaint.description,
                    complaint.incident_date,
                    complaint.location,
                    complaint.witnesses,
                    complaint.file_name,
                    complaint.file_path,
                    ComplaintStatus::Pending.as_str(),
                    complaint.created_at,
                ],
            )?;

            if let Some(scan) = scan {
                tx.execute(
                    "INSERT INTO scan_reports (id, user_id, complaint_id, original_filename, file_hash,
                                               verdict, report_link, details, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    rusqlite::params![
                        scan.id,
                        scan.user_id,
                        complaint.id,
                        scan.original_filename,
                        scan.file_hash,
                        scan.verdict.as_str(),
                        scan.report_link,
                        scan.details,
                        complaint.created_at,
                    ],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_complaint(&self, id: &str) -> Result<Option<ComplaintRow>> {
        self.with_conn(|conn| {
            let sql = format!("{COMPLAINT_SELECT} WHERE c.id = ?1");
            let row = conn.query_row(&sql, [id], complaint_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_complaints(&self) -> Result<Vec<ComplaintRow>> {
        self.with_conn(|conn| {
            let sql = format!("{COMPLAINT_SELECT} ORDER BY c.created_at DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], complaint_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_complaints_for_user(&self, user_id: &str) -> Result<Vec<ComplaintRow>> {
        self.with_conn(|conn| {
            let sql = format!("{COMPLAINT_SELECT} WHERE c.user_id = ?1 ORDER BY c.created_at DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], complaint_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Move a complaint to `to`, checking the transition against the status
    /// stored at the moment of the write. Runs under the connection lock, so
    /// concurrent updates are applied one after the other and the last legal
    /// one wins.
    pub fn transition_complaint_status(
        &self,
        id: &str,
        to: ComplaintStatus,
        updated_at: &str,
    ) -> Result<StatusChange> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let current: Option<String> = tx
                .query_row("SELECT status FROM complaints WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            let Some(current) = current else {
                return Ok(StatusChange::NotFound);
            };
            let from: ComplaintStatus = current.parse()?;

            if from == to {
                return Ok(StatusChange::Unchanged);
            }
            if !from.can_transition_to(to) {
                return Ok(StatusChange::Rejected { from });
            }

            tx.execute(
                "UPDATE complaints SET status = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![to.as_str(), updated_at, id],
            )?;
            tx.commit()?;
            Ok(StatusChange::Updated { from })
        })
    }

    // -- Scan reports --

    pub fn list_scan_reports(&self) -> Result<Vec<ScanReportRow>> {
        self.with_conn(|conn| {
            let sql = format!("{SCAN_SELECT} ORDER BY s.created_at DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], scan_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_scan_report_for_complaint(&self, complaint_id: &str) -> Result<Option<ScanReportRow>> {
        self.with_conn(|conn| {
            let sql = format!("{SCAN_SELECT} WHERE s.complaint_id = ?1");
            let row = conn.query_row(&sql, [complaint_id], scan_from_row).optional()?;
            Ok(row)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        student_id: row.get(5)?,
        department: row.get(6)?,
        is_admin: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn complaint_from_row(row: &Row<'_>) -> rusqlite::Result<ComplaintRow> {
    Ok(ComplaintRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        submitter_name: row.get(2)?,
        submitter_department: row.get(3)?,
        subject: row.get(4)?,
        description: row.get(5)?,
        incident_date: row.get(6)?,
        location: row.get(7)?,
        witnesses: row.get(8)?,
        file_name: row.get(9)?,
        file_path: row.get(10)?,
        status: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn scan_from_row(row: &Row<'_>) -> rusqlite::Result<ScanReportRow> {
    Ok(ScanReportRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        complaint_id: row.get(2)?,
        submitter_name: row.get(3)?,
        submitter_department: row.get(4)?,
        original_filename: row.get(5)?,
        file_hash: row.get(6)?,
        verdict: row.get(7)?,
        report_link: row.get(8)?,
        details: row.get(9)?,
        created_at: row.get(10)?,
    })
}
