use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    utils::{TokenType, verify_token},
};

/// Caller identity attached to every authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|_| AppError::Unauthorized)?;

    let claims = verify_token(bearer.token(), TokenType::Access, &state.config)?;

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        name: claims.name,
        email: claims.email,
    });

    Ok(next.run(req).await)
}
