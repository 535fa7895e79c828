use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use ragguard_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, attached to the request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            is_admin: claims.is_admin,
        }
    }
}

pub fn decode_session(token: &str, secret: &str) -> Result<Session, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthenticated("Invalid or expired token".into()))?;

    Ok(token_data.claims.into())
}

/// Extract and validate the bearer token, then attach a [`Session`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| ApiError::Unauthenticated("Please log in to continue".into()))?;

    let session = decode_session(bearer.token(), &state.jwt_secret)?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Must run inside [`require_auth`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let session = req
        .extensions()
        .get::<Session>()
        .ok_or_else(|| ApiError::Unauthenticated("Please log in to continue".into()))?;

    if !session.is_admin {
        return Err(ApiError::Forbidden("Administrator access required".into()));
    }

    Ok(next.run(req).await)
}
