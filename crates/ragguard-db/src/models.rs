/// Database row types: these map directly to SQLite rows.
/// Enum-valued columns stay as text here; the API layer parses them.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub student_id: Option<String>,
    pub department: String,
    pub is_admin: bool,
    pub created_at: String,
}

/// A complaint joined with its submitter's name and department.
pub struct ComplaintRow {
    pub id: String,
    pub user_id: String,
    pub submitter_name: Option<String>,
    pub submitter_department: Option<String>,
    pub subject: String,
    pub description: String,
    pub incident_date: Option<String>,
    pub location: Option<String>,
    pub witnesses: Option<String>,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ScanReportRow {
    pub id: String,
    pub user_id: String,
    pub complaint_id: String,
    pub submitter_name: Option<String>,
    pub submitter_department: Option<String>,
    pub original_filename: String,
    pub file_hash: String,
    pub verdict: String,
    pub report_link: String,
    pub details: Option<String>,
    pub created_at: String,
}
