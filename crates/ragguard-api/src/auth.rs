use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use ragguard_db::queries::format_timestamp;
use ragguard_db::{Database, NewUser};
use ragguard_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use ragguard_types::models::Role;

use crate::error::{ApiError, FieldErrors};
use crate::state::{AppState, run_db};
use crate::views;

const MIN_PASSWORD_LEN: usize = 8;
const TOKEN_TTL_HOURS: i64 = 24;

/// Roughly `\S+@\S+\.\S+`: something, an `@`, something, a dot, something.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

/// A registration that passed validation, with the role parsed and the email
/// normalised to lowercase.
#[derive(Debug)]
pub struct ValidRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub student_id: Option<String>,
    pub department: String,
}

pub fn validate_registration(req: RegisterRequest) -> Result<ValidRegistration, ApiError> {
    let mut errors = FieldErrors::new();

    let name = req.name.trim().to_string();
    if name.is_empty() {
        errors.add("name", "Full name is required");
    }

    let email = req.email.trim().to_lowercase();
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !looks_like_email(&email) {
        errors.add("email", "Email is invalid");
    }

    if req.password.is_empty() {
        errors.add("password", "Password is required");
    } else if req.password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", "Password must be at least 8 characters");
    }

    let role = req.role.trim().to_lowercase().parse::<Role>();
    if role.is_err() {
        errors.add("role", "Role must be student, faculty or staff");
    }

    let student_id = req
        .student_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if matches!(role, Ok(Role::Student)) && student_id.is_none() {
        errors.add("studentId", "Student ID is required");
    }

    let department = req.department.trim().to_string();
    if department.is_empty() {
        errors.add("department", "Department is required");
    }

    errors.into_result()?;

    Ok(ValidRegistration {
        name,
        email,
        password: req.password,
        role: role.map_err(|e| ApiError::Internal(e.into()))?,
        student_id,
        department,
    })
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reg = validate_registration(req)?;

    let email = reg.email.clone();
    if run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("User already exists!".into()));
    }

    let password_hash = hash_password(&reg.password).map_err(ApiError::Internal)?;
    let user_id = Uuid::new_v4();

    let new_user = NewUser {
        id: user_id.to_string(),
        name: reg.name,
        email: reg.email,
        password_hash,
        role: reg.role.to_string(),
        student_id: reg.student_id,
        department: reg.department,
        is_admin: false,
        created_at: format_timestamp(Utc::now()),
    };
    // Two registrations can both pass the lookup above; the insert decides.
    if !run_db(&state, move |db| db.create_user(&new_user)).await? {
        return Err(ApiError::Conflict("User already exists!".into()));
    }

    info!("Registered user {}", user_id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Registration successful!".into(),
            user_id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::Unauthenticated("Invalid email or password".into());

    let email = req.email.trim().to_lowercase();
    let user = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(invalid)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    if req.is_admin && !user.is_admin {
        return Err(ApiError::Forbidden(
            "This account does not have administrator access".into(),
        ));
    }

    let profile = views::user_profile(&user);
    let token = create_token(&state.jwt_secret, profile.id, &profile.email, profile.is_admin)?;

    info!("User {} logged in (admin: {})", profile.id, profile.is_admin);

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".into(),
        token,
        user: profile,
    }))
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    is_admin: bool,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        is_admin,
        exp: (Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))
}

/// Create the administrator account if no account uses `email` yet.
/// Returns whether an account was created.
pub fn bootstrap_admin(db: &Database, email: &str, password: &str) -> anyhow::Result<bool> {
    let email = email.trim().to_lowercase();
    if db.get_user_by_email(&email)?.is_some() {
        return Ok(false);
    }

    let password_hash = hash_password(password)?;

    let created = db.create_user(&NewUser {
        id: Uuid::new_v4().to_string(),
        name: "Administrator".into(),
        email: email.clone(),
        password_hash,
        role: Role::Staff.to_string(),
        student_id: None,
        department: "Administration".into(),
        is_admin: true,
        created_at: format_timestamp(Utc::now()),
    })?;

    if created {
        info!("Created administrator account {}", email);
    }
    Ok(created)
}
