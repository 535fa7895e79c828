use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Complaint, ScanReport, UserProfile};
use crate::query::{SortKey, SortOrder};

// -- JWT Claims --

/// JWT claims issued at login and checked by the session middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub student_id: Option<String>,
    pub department: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Set by the admin portal login form; rejected for non-admin accounts.
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

// -- Complaints --

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitComplaintResponse {
    pub success: bool,
    pub message: String,
    pub complaint: Complaint,
    pub scan: Option<ScanReport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComplaintDetail {
    pub complaint: Complaint,
    pub scan: Option<ScanReport>,
}

/// `status` stays a string here so an unknown value can be reported as a
/// field error instead of a body rejection.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub message: String,
    pub complaint: Complaint,
}

#[derive(Debug, Default, Deserialize)]
pub struct ComplaintListQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub order: SortOrder,
}
