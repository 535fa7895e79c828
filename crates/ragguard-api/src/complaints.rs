use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use ragguard_db::queries::format_timestamp;
use ragguard_db::{NewComplaint, NewScanReport, StatusChange};
use ragguard_scan::{ScanSubject, sha256_hex, sniff};
use ragguard_types::api::{
    ComplaintDetail, ComplaintListQuery, SubmitComplaintResponse, UpdateStatusRequest,
    UpdateStatusResponse,
};
use ragguard_types::models::{Complaint, ComplaintStatus, Verdict};
use ragguard_types::query::apply_listing;

use crate::error::{ApiError, FieldErrors};
use crate::middleware::Session;
use crate::state::{AppState, run_db};
use crate::storage::sanitize_filename;
use crate::views;

/// 5 MB upload limit for attachments
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
const MAX_SUBJECT_LEN: usize = 200;

// ── Form parsing ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
    /// Set when the part exceeded [`MAX_FILE_SIZE`]; `data` is then empty.
    pub oversized: bool,
}

/// Raw multipart submission, before validation.
#[derive(Debug, Default)]
pub struct ComplaintForm {
    pub user_id: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub witnesses: Option<String>,
    pub file: Option<UploadedFile>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::field("file", "File must be 5MB or smaller")
    } else {
        ApiError::field("form", format!("Malformed form data: {}", err.body_text()))
    }
}

async fn read_form(mut multipart: Multipart) -> Result<ComplaintForm, ApiError> {
    let mut form = ComplaintForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let mut data = Vec::new();
            let mut oversized = false;

            // Keep reading past the limit so the remaining fields can still be
            // validated, but stop buffering.
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                if oversized {
                    continue;
                }
                if data.len() + chunk.len() > MAX_FILE_SIZE {
                    oversized = true;
                    data = Vec::new();
                    continue;
                }
                data.extend_from_slice(&chunk);
            }

            // Browsers send an empty part when no file was picked
            if file_name.is_empty() && data.is_empty() && !oversized {
                continue;
            }

            form.file = Some(UploadedFile {
                file_name,
                data,
                oversized,
            });
            continue;
        }

        let slot = match name.as_str() {
            "user_id" => &mut form.user_id,
            "subject" => &mut form.subject,
            "description" => &mut form.description,
            "date" => &mut form.date,
            "location" => &mut form.location,
            "witnesses" => &mut form.witnesses,
            other => {
                debug!("Ignoring unknown form field '{}'", other);
                continue;
            }
        };
        *slot = Some(field.text().await.map_err(multipart_error)?);
    }

    Ok(form)
}

// ── Validation ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ValidFile {
    /// Sanitized original filename, for display only.
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct ValidComplaint {
    pub subject: String,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    pub witnesses: Option<String>,
    pub file: Option<ValidFile>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Check every field and report all problems at once. Nothing is persisted
/// before this passes.
pub fn validate_complaint(form: ComplaintForm) -> Result<ValidComplaint, ApiError> {
    let mut errors = FieldErrors::new();

    let subject = non_blank(form.subject);
    match &subject {
        None => errors.add("subject", "Subject is required"),
        Some(s) if s.chars().count() > MAX_SUBJECT_LEN => {
            errors.add("subject", "Subject must be 200 characters or fewer")
        }
        Some(_) => {}
    }

    let description = non_blank(form.description);
    if description.is_none() {
        errors.add("description", "Description is required");
    }

    let date = match non_blank(form.date) {
        Some(raw) => match views::parse_incident_date(&raw) {
            Some(d) => Some(d),
            None => {
                errors.add("date", "Date must be in YYYY-MM-DD format");
                None
            }
        },
        None => None,
    };

    let file = match form.file {
        Some(f) if f.oversized => {
            errors.add("file", "File must be 5MB or smaller");
            None
        }
        Some(f) if f.data.is_empty() => {
            errors.add("file", "The attached file is empty");
            None
        }
        Some(f) if !sniff::is_pdf(&f.file_name, &f.data) => {
            errors.add("file", "Only PDF files are accepted");
            None
        }
        Some(f) => Some(ValidFile {
            name: sanitize_filename(&f.file_name),
            data: f.data,
        }),
        None => None,
    };

    errors.into_result()?;

    Ok(ValidComplaint {
        subject: subject.unwrap_or_default(),
        description: description.unwrap_or_default(),
        date,
        location: non_blank(form.location),
        witnesses: non_blank(form.witnesses),
        file,
    })
}

// ── Upload + scan ───────────────────────────────────────────────────────

async fn discard_upload(state: &AppState, stored_name: &str) {
    if let Err(e) = state.storage.delete_file(stored_name).await {
        warn!("Failed to remove upload {}: {}", stored_name, e);
    }
}

/// Store the attachment, hash it and run the reputation lookup. Returns the
/// stored name (absent for malicious files, which are not kept) and the
/// scan report to persist. On scan failure the stored copy is removed.
async fn store_and_scan(
    state: &AppState,
    complaint_id: Uuid,
    user_id: Uuid,
    file: &ValidFile,
) -> Result<(Option<String>, NewScanReport), ApiError> {
    let sha256 = sha256_hex(&file.data);
    let stored_name = format!("{}.pdf", complaint_id);

    state.storage.write_file(&stored_name, &file.data).await?;

    let subject = ScanSubject {
        file_name: &file.name,
        sha256: &sha256,
        bytes: &file.data,
    };
    let outcome = match state.scanner.scan(subject).await {
        Ok(outcome) => outcome,
        Err(e) => {
            discard_upload(state, &stored_name).await;
            return Err(e.into());
        }
    };

    info!(
        "Scanned {} ({}) for complaint {}: {}",
        file.name, sha256, complaint_id, outcome.verdict
    );

    let kept = if outcome.verdict == Verdict::Malicious {
        warn!("Discarding malicious upload {} ({})", file.name, sha256);
        discard_upload(state, &stored_name).await;
        None
    } else {
        Some(stored_name)
    };

    let report = NewScanReport {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        original_filename: file.name.clone(),
        file_hash: sha256,
        verdict: outcome.verdict,
        report_link: outcome.report_link,
        details: outcome.details,
    };

    Ok((kept, report))
}

// ── Handlers ────────────────────────────────────────────────────────────

/// POST /api/complaints/submit-complaint: multipart complaint with an
/// optional PDF attachment.
pub async fn submit_complaint(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(multipart).await?;

    if let Some(claimed) = form.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if claimed != session.user_id.to_string() {
            return Err(ApiError::Forbidden(
                "Complaints can only be submitted from your own account".into(),
            ));
        }
    }

    let valid = validate_complaint(form)?;

    let complaint_id = Uuid::new_v4();
    let (file_path, scan) = match &valid.file {
        Some(file) => {
            let (kept, report) = store_and_scan(&state, complaint_id, session.user_id, file).await?;
            (kept, Some(report))
        }
        None => (None, None),
    };

    let new_complaint = NewComplaint {
        id: complaint_id.to_string(),
        user_id: session.user_id.to_string(),
        subject: valid.subject,
        description: valid.description,
        incident_date: valid.date.map(|d| d.format("%Y-%m-%d").to_string()),
        location: valid.location,
        witnesses: valid.witnesses,
        file_name: valid.file.as_ref().map(|f| f.name.clone()),
        file_path: file_path.clone(),
        created_at: format_timestamp(Utc::now()),
    };

    let inserted = run_db(&state, move |db| {
        db.insert_complaint(&new_complaint, scan.as_ref())?;
        let complaint = db.get_complaint(&new_complaint.id)?;
        let scan = db.get_scan_report_for_complaint(&new_complaint.id)?;
        Ok((complaint, scan))
    })
    .await;

    let (complaint_row, scan_row) = match inserted {
        Ok(rows) => rows,
        Err(e) => {
            if let Some(stored) = &file_path {
                discard_upload(&state, stored).await;
            }
            return Err(e);
        }
    };

    let complaint = complaint_row.map(views::complaint).ok_or_else(|| {
        ApiError::Internal(anyhow::anyhow!(
            "complaint {} missing right after insert",
            complaint_id
        ))
    })?;
    let scan = scan_row.map(views::scan_report);

    info!(
        "Complaint {} submitted by {} (attachment: {})",
        complaint_id,
        session.user_id,
        scan.as_ref().map_or("none", |s| s.verdict.as_str())
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitComplaintResponse {
            success: true,
            message: "Complaint submitted successfully".into(),
            complaint,
            scan,
        }),
    ))
}

/// GET /api/complaints: admin listing with optional search and sort.
pub async fn list_complaints(
    State(state): State<AppState>,
    Query(query): Query<ComplaintListQuery>,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    let rows = run_db(&state, |db| db.list_complaints()).await?;
    let complaints = rows.into_iter().map(views::complaint).collect();

    Ok(Json(apply_listing(
        complaints,
        query.search.as_deref(),
        query.sort,
        query.order,
    )))
}

/// GET /api/complaints/my-complaints: the caller's own complaints, newest first.
pub async fn my_complaints(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    let uid = session.user_id.to_string();
    let rows = run_db(&state, move |db| db.list_complaints_for_user(&uid)).await?;

    Ok(Json(rows.into_iter().map(views::complaint).collect()))
}

/// GET /api/complaints/{id}: visible to the submitter and to administrators.
pub async fn get_complaint(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(complaint_id): Path<Uuid>,
) -> Result<Json<ComplaintDetail>, ApiError> {
    let cid = complaint_id.to_string();
    let (complaint_row, scan_row) = run_db(&state, move |db| {
        Ok((db.get_complaint(&cid)?, db.get_scan_report_for_complaint(&cid)?))
    })
    .await?;

    let complaint = complaint_row
        .map(views::complaint)
        .filter(|c| session.is_admin || c.user_id == session.user_id)
        .ok_or_else(|| ApiError::NotFound("Complaint not found".into()))?;

    Ok(Json(ComplaintDetail {
        complaint,
        scan: scan_row.map(views::scan_report),
    }))
}

/// PATCH /api/complaints/update-status/{id}: admin status change.
///
/// Only `status` and `updated_at` change. Setting the current status again is
/// a no-op success.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(complaint_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, ApiError> {
    let next: ComplaintStatus = req.status.trim().to_lowercase().parse().map_err(|_| {
        ApiError::field(
            "status",
            "Status must be one of pending, investigating, resolved, dismissed",
        )
    })?;

    let cid = complaint_id.to_string();
    let now = format_timestamp(Utc::now());
    let (change, row) = run_db(&state, move |db| {
        let change = db.transition_complaint_status(&cid, next, &now)?;
        Ok((change, db.get_complaint(&cid)?))
    })
    .await?;

    let message = match change {
        StatusChange::NotFound => return Err(ApiError::NotFound("Complaint not found".into())),
        StatusChange::Rejected { from } => {
            return Err(ApiError::Conflict(format!(
                "Cannot move a {} complaint to {}",
                from, next
            )));
        }
        StatusChange::Unchanged => format!("Status is already {}", next),
        StatusChange::Updated { from } => {
            info!(
                "Complaint {} moved {} -> {} by {}",
                complaint_id, from, next, session.user_id
            );
            format!("Status updated to {}", next)
        }
    };

    let complaint = row
        .map(views::complaint)
        .ok_or_else(|| ApiError::NotFound("Complaint not found".into()))?;

    Ok(Json(UpdateStatusResponse {
        success: true,
        message,
        complaint,
    }))
}
