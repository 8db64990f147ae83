use std::{
    borrow::Cow,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Multipart, State},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    auth::verify_password_hash,
    controllers::auth::{validate_email, validate_password, validate_username},
    db::user::{
        delete_user, get_user_password, get_user_stats, update_user_avatar, update_user_password,
        update_user_profile,
    },
    error::Error,
    model::{User, UserStats},
    state::SharedAppState,
    telemetry::spawn_blocking_with_tracing,
};

const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;
const AVATAR_DIR: &str = "avatars";
const PUBLIC_UPLOADS_PREFIX: &str = "/uploads/";

#[derive(Serialize, Deserialize, Debug)]
pub struct ProfileResponse {
    pub user: User,
    pub stats: UserStats,
}

#[tracing::instrument(name = "[GET] user/profile", skip_all, fields(user_id = user.id))]
pub async fn show(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
) -> Result<Json<ProfileResponse>, Error> {
    let stats = get_user_stats(&app_state.pool, user.id).await?;

    Ok(Json(ProfileResponse {
        user: User::clone(&user),
        stats,
    }))
}

#[derive(Deserialize, Debug)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(username) = &self.username {
            validate_username(username, &mut errors);
        }
        if let Some(email) = &self.email {
            validate_email(email, &mut errors);
        }

        if !errors.errors().is_empty() {
            return Err(errors);
        }

        Ok(())
    }
}

#[tracing::instrument(name = "[PUT] user/profile", skip_all, fields(user_id = user.id))]
pub async fn update(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<User>, Error> {
    request.validate().map_err(Error::Validation)?;

    let user = update_user_profile(
        &app_state.pool,
        user.id,
        request.username.map(|u| u.trim().to_string()),
        request.email.map(|e| e.trim().to_lowercase()),
    )
    .await?;

    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: SecretString,
    pub new_password: SecretString,
}

impl Validate for UpdatePasswordRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        validate_password("new_password", &self.new_password, &mut errors);

        if !errors.errors().is_empty() {
            return Err(errors);
        }

        Ok(())
    }
}

#[tracing::instrument(name = "[PUT] user/password", skip_all, fields(user_id = user.id))]
pub async fn update_password(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<UpdatePasswordRequest>,
) -> Result<Json<Value>, Error> {
    request.validate().map_err(Error::Validation)?;

    let hashed_password = get_user_password(&app_state.pool, user.id).await?;
    let current_password = request.current_password;

    spawn_blocking_with_tracing(move || verify_password_hash(hashed_password, current_password))
        .await
        .context("verify password hash")
        .map_err(Error::Other)?
        .map_err(|_| Error::BadRequest("Current password is incorrect".to_string()))?;

    update_user_password(&app_state.pool, user.id, request.new_password).await?;

    Ok(Json(json!({ "msg": "Password updated" })))
}

/// Returns the file extension for an accepted avatar upload.
fn avatar_extension(content_type: Option<&str>, file_name: Option<&str>) -> Option<&'static str> {
    match content_type {
        Some("image/jpeg") | Some("image/jpg") => return Some("jpg"),
        Some("image/png") => return Some("png"),
        _ => {}
    }

    let extension = Path::new(file_name?).extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        _ => None,
    }
}

/// Maps a stored public avatar path back onto the uploads directory.
fn stored_avatar_path(uploads_dir: &str, public_path: &str) -> Option<PathBuf> {
    let relative = public_path.strip_prefix(PUBLIC_UPLOADS_PREFIX)?;
    if relative.is_empty() || relative.split('/').any(|part| part == ".." || part.is_empty()) {
        return None;
    }

    Some(Path::new(uploads_dir).join(relative))
}

async fn remove_stored_avatar(uploads_dir: &str, public_path: Option<String>) {
    let Some(path) = public_path.and_then(|p| stored_avatar_path(uploads_dir, &p)) else {
        return;
    };

    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!(err.msg = %e, path = %path.display(), "failed to remove old avatar");
    }
}

/// Writes the avatar file, then hands its public path to `commit`. The file
/// is removed again when `commit` fails.
async fn save_avatar<T, F, Fut>(
    uploads_dir: &str,
    file_name: &str,
    bytes: &[u8],
    commit: F,
) -> Result<T, Error>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let directory = Path::new(uploads_dir).join(AVATAR_DIR);
    tokio::fs::create_dir_all(&directory)
        .await
        .context("create avatar directory")
        .map_err(Error::Other)?;

    let file_path = directory.join(file_name);
    tokio::fs::write(&file_path, bytes)
        .await
        .context("write avatar file")
        .map_err(Error::Other)?;

    let public_path = format!("{PUBLIC_UPLOADS_PREFIX}{AVATAR_DIR}/{file_name}");
    match commit(public_path).await {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&file_path).await {
                tracing::warn!(err.msg = %remove_err, path = %file_path.display(), "failed to remove unsaved avatar");
            }
            Err(e)
        }
    }
}

fn avatar_error(message: &'static str) -> Error {
    let mut errors = ValidationErrors::new();
    errors.add(
        "avatar",
        ValidationError::new("avatar").with_message(Cow::from(message)),
    );

    Error::Validation(errors)
}

#[tracing::instrument(name = "[PUT] user/avatar", skip_all, fields(user_id = user.id))]
pub async fn update_avatar(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    mut multipart: Multipart,
) -> Result<Json<User>, Error> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(e.body_text()))?
    {
        if field.name() != Some("avatar") {
            continue;
        }

        let extension = avatar_extension(field.content_type(), field.file_name())
            .ok_or_else(|| avatar_error("Avatar must be a JPG or PNG image"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(e.body_text()))?;

        upload = Some((extension, bytes));
        break;
    }

    let (extension, bytes) = upload.ok_or_else(|| avatar_error("Avatar file is required"))?;
    if bytes.is_empty() {
        return Err(avatar_error("Avatar file is required"));
    }
    if bytes.len() > MAX_AVATAR_BYTES {
        return Err(avatar_error("Avatar must not be larger than 2 MB"));
    }

    let uploads_dir = &app_state.config.application.uploads_dir;
    let file_name = format!("{}-{}.{}", user.id, uuid::Uuid::new_v4(), extension);
    let pool = &app_state.pool;
    let user_id = user.id;
    let (user, previous) = save_avatar(uploads_dir, &file_name, &bytes, |public_path| async move {
        update_user_avatar(pool, user_id, &public_path).await
    })
    .await?;

    remove_stored_avatar(uploads_dir, previous).await;

    Ok(Json(user))
}

#[tracing::instrument(name = "[DELETE] user/account", skip_all, fields(user_id = user.id))]
pub async fn destroy(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
) -> Result<Json<Value>, Error> {
    let avatar = delete_user(&app_state.pool, user.id).await?;

    remove_stored_avatar(&app_state.config.application.uploads_dir, avatar).await;

    Ok(Json(json!({ "msg": "Account deleted" })))
}
