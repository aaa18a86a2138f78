use axum::{
    extract::{Json, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    error::AppError,
    jobs,
    utils::{TokenType, generate_token, verify_token},
};

use super::model::{
    AccessTokenResponse, CreateUserRequest, RefreshRequest, TokenPairResponse, TokenRequest, User,
    UserDetail,
};

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let user = User::create(&state.pool, &req).await?;
    tracing::info!(user_id = %user.id, "registered user");

    tokio::spawn(jobs::send_welcome_email(
        state.mailer.clone(),
        state.config.default_from_email.clone(),
        user.email.clone(),
        user.name.clone(),
    ));

    Ok((StatusCode::CREATED, Json(UserDetail::from(user))))
}

pub async fn obtain_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let user = User::find_by_email(&state.pool, &req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !user.verify_login(&req.password)? {
        return Err(AppError::Unauthorized);
    }

    let access_token = generate_token(
        user.id,
        &user.name,
        &user.email,
        TokenType::Access,
        &state.config,
    )?;
    let refresh_token = generate_token(
        user.id,
        &user.name,
        &user.email,
        TokenType::Refresh,
        &state.config,
    )?;

    Ok(Json(TokenPairResponse {
        access_token,
        refresh_token,
    }))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let claims = verify_token(&req.refresh, TokenType::Refresh, &state.config)?;

    // refresh tokens outlive deactivation otherwise
    let user = User::find_by_id(&state.pool, claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or(AppError::Unauthorized)?;

    let access = generate_token(
        user.id,
        &user.name,
        &user.email,
        TokenType::Access,
        &state.config,
    )?;

    Ok(Json(AccessTokenResponse { access }))
}
