use std::borrow::Cow;

use anyhow::Context;
use axum::{Json, extract::State, http::StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidateLength, ValidationError, ValidationErrors};

use crate::{
    auth::{encode_jwt, error::AuthError, verify_password_hash},
    db::user::{create_user, get_user_credential_by_email},
    error::Error,
    model::{Role, User},
    state::SharedAppState,
    telemetry::spawn_blocking_with_tracing,
};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

pub(crate) fn validate_username(username: &str, errors: &mut ValidationErrors) {
    if !username.validate_length(Some(3), Some(30), None) {
        errors.add(
            "username",
            ValidationError::new("username_length")
                .with_message(Cow::from("Username length must be between 3 and 30")),
        );
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
    {
        errors.add(
            "username",
            ValidationError::new("username_format").with_message(Cow::from(
                "Username may only contain letters, digits, `_`, `.` and `-`",
            )),
        );
    }
}

pub(crate) fn validate_email(email: &str, errors: &mut ValidationErrors) {
    if !email.validate_email() {
        errors.add(
            "email",
            ValidationError::new("email_email").with_message(Cow::from("Incorrect email format")),
        );
    }
    if !email.validate_length(Some(1), Some(100), None) {
        errors.add(
            "email",
            ValidationError::new("email_length")
                .with_message(Cow::from("Email length must be between 1 and 100")),
        );
    }
}

pub(crate) fn validate_password(
    field: &'static str,
    password: &SecretString,
    errors: &mut ValidationErrors,
) {
    if !password
        .expose_secret()
        .validate_length(Some(6), Some(72), None)
    {
        errors.add(
            field,
            ValidationError::new("password_length")
                .with_message(Cow::from("Password length must be between 6 and 72")),
        );
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        validate_username(&self.username, &mut errors);
        validate_email(&self.email, &mut errors);
        validate_password("password", &self.password, &mut errors);

        if !errors.errors().is_empty() {
            return Err(errors);
        }

        Ok(())
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: SecretString,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        validate_email(&self.email, &mut errors);
        if self.password.expose_secret().is_empty() {
            errors.add(
                "password",
                ValidationError::new("password_required")
                    .with_message(Cow::from("Password is required")),
            );
        }

        if !errors.errors().is_empty() {
            return Err(errors);
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

async fn issue_token(app_state: &SharedAppState, user_id: i64) -> Result<String, Error> {
    let app_state = app_state.clone();

    spawn_blocking_with_tracing(move || encode_jwt(user_id, &app_state.config.jwt))
        .await
        .context("encode jwt")
        .map_err(Error::Other)?
}

#[tracing::instrument(name = "[POST] auth register", skip_all, fields(email = %request.email))]
pub async fn register(
    State(app_state): State<SharedAppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), Error> {
    request.validate().map_err(Error::Validation)?;

    let user = create_user(
        &app_state.pool,
        request.username.trim().to_string(),
        request.email.trim().to_lowercase(),
        request.password,
        Role::User,
    )
    .await?;

    let token = issue_token(&app_state, user.id).await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[tracing::instrument(name = "[POST] auth login", skip_all, fields(email = %request.email))]
pub async fn login(
    State(app_state): State<SharedAppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, Error> {
    request.validate().map_err(Error::Validation)?;

    let (user, hashed_password) =
        get_user_credential_by_email(&app_state.pool, request.email.trim())
            .await?
            .ok_or(Error::Auth(AuthError::UserNotFound))?;

    spawn_blocking_with_tracing(move || verify_password_hash(hashed_password, request.password))
        .await
        .context("verify password hash")
        .map_err(Error::Other)?
        .map_err(|_| Error::Auth(AuthError::IncorrectCredential))?;

    let token = issue_token(&app_state, user.id).await?;

    Ok(Json(AuthResponse { token, user }))
}
