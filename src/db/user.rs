use anyhow::Context;
use secrecy::SecretString;
use sqlx::PgPool;

use crate::{
    auth::compute_password_hash,
    error::Error,
    model::{Role, User, UserEntity, UserStats},
    telemetry::spawn_blocking_with_tracing,
};

use super::error::DatabaseError;

const USER_COLUMNS: &str = "id, username, email, avatar, role, created_at";

#[derive(sqlx::FromRow)]
struct UserCredentialEntity {
    #[sqlx(flatten)]
    user: UserEntity,
    password: String,
}

fn map_unique_violation(error: sqlx::Error) -> Error {
    if DatabaseError::is_unique_violation(&error) {
        return Error::BadRequest("Username or email already registered".to_string());
    }

    Error::Database(DatabaseError::DatabaseError(error))
}

/// Returns the user along with the stored password hash.
#[tracing::instrument(name = "get user credential by email", skip_all, fields(email = %email))]
pub async fn get_user_credential_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<(User, String)>, Error> {
    let row = sqlx::query_as::<_, UserCredentialEntity>(&format!(
        r#"
        SELECT
            {USER_COLUMNS}, password
        FROM
            users
        WHERE
            lower(email) = lower($1)
    "#
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    Ok(row.map(|r| (User::from(r.user), r.password)))
}

#[tracing::instrument(name = "check user uniqueness", skip_all)]
async fn ensure_unique_identity(
    pool: &PgPool,
    username: Option<&str>,
    email: Option<&str>,
    except_user_id: Option<i64>,
) -> Result<(), Error> {
    if let Some(email) = email {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE lower(email) = lower($1) AND ($2::BIGINT IS NULL OR id <> $2)
            )
        "#,
        )
        .bind(email)
        .bind(except_user_id)
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::DatabaseError)?;

        if taken {
            return Err(Error::BadRequest("Email already registered".to_string()));
        }
    }

    if let Some(username) = username {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE lower(username) = lower($1) AND ($2::BIGINT IS NULL OR id <> $2)
            )
        "#,
        )
        .bind(username)
        .bind(except_user_id)
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::DatabaseError)?;

        if taken {
            return Err(Error::BadRequest("Username already taken".to_string()));
        }
    }

    Ok(())
}

#[tracing::instrument(name = "create user", skip_all, fields(username = %username, email = %email))]
pub async fn create_user(
    pool: &PgPool,
    username: String,
    email: String,
    password: SecretString,
    role: Role,
) -> Result<User, Error> {
    ensure_unique_identity(pool, Some(&username), Some(&email), None).await?;

    let password_hashed = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("compute password hash")
        .map_err(Error::Other)??;

    let user = sqlx::query_as::<_, UserEntity>(&format!(
        r#"
        INSERT INTO users
            (username, email, password, role)
        VALUES
            ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS};
    "#
    ))
    .bind(&username)
    .bind(&email)
    .bind(&password_hashed)
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .map_err(map_unique_violation)?;

    Ok(User::from(user))
}

#[tracing::instrument(name = "get user by id", skip_all, fields(user_id = user_id))]
pub async fn get_user_by_id_optional(pool: &PgPool, user_id: i64) -> Result<Option<User>, Error> {
    let user = sqlx::query_as::<_, UserEntity>(&format!(
        r#"
        SELECT
            {USER_COLUMNS}
        FROM
            users
        WHERE
            id = $1;
    "#
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    Ok(user.map(User::from))
}

#[tracing::instrument(name = "get user password", skip_all, fields(user_id = user_id))]
pub async fn get_user_password(pool: &PgPool, user_id: i64) -> Result<String, Error> {
    sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::DatabaseError)?
        .ok_or(Error::Database(DatabaseError::NotFound))
}

#[tracing::instrument(name = "update user profile", skip_all, fields(user_id = user_id))]
pub async fn update_user_profile(
    pool: &PgPool,
    user_id: i64,
    username: Option<String>,
    email: Option<String>,
) -> Result<User, Error> {
    ensure_unique_identity(pool, username.as_deref(), email.as_deref(), Some(user_id)).await?;

    let user = sqlx::query_as::<_, UserEntity>(&format!(
        r#"
        UPDATE users
        SET
            username = COALESCE($1, username),
            email = COALESCE($2, email),
            updated_at = now()
        WHERE
            id = $3
        RETURNING {USER_COLUMNS};
    "#
    ))
    .bind(username)
    .bind(email)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(map_unique_violation)?
    .ok_or(Error::Database(DatabaseError::NotFound))?;

    Ok(User::from(user))
}

#[tracing::instrument(name = "update user password", skip_all, fields(user_id = user_id))]
pub async fn update_user_password(
    pool: &PgPool,
    user_id: i64,
    password: SecretString,
) -> Result<(), Error> {
    let password_hashed = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("compute password hash")
        .map_err(Error::Other)??;

    sqlx::query("UPDATE users SET password = $1, updated_at = now() WHERE id = $2")
        .bind(password_hashed)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(DatabaseError::DatabaseError)?;

    Ok(())
}

/// Stores the new avatar path and hands back the previous one so the caller
/// can remove the old file.
#[tracing::instrument(name = "update user avatar", skip_all, fields(user_id = user_id))]
pub async fn update_user_avatar(
    pool: &PgPool,
    user_id: i64,
    avatar: &str,
) -> Result<(User, Option<String>), Error> {
    let mut tx = pool.begin().await.map_err(DatabaseError::DatabaseError)?;

    let previous = sqlx::query_scalar::<_, Option<String>>(
        "SELECT avatar FROM users WHERE id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(DatabaseError::DatabaseError)?
    .ok_or(Error::Database(DatabaseError::NotFound))?;

    let user = sqlx::query_as::<_, UserEntity>(&format!(
        r#"
        UPDATE users
        SET
            avatar = $1,
            updated_at = now()
        WHERE
            id = $2
        RETURNING {USER_COLUMNS};
    "#
    ))
    .bind(avatar)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    tx.commit().await.map_err(DatabaseError::DatabaseError)?;

    Ok((User::from(user), previous))
}

/// Deletes the user; bookmarks and history go with it through the foreign
/// keys. Returns the avatar path that was stored, if any.
#[tracing::instrument(name = "delete user", skip_all, fields(user_id = user_id))]
pub async fn delete_user(pool: &PgPool, user_id: i64) -> Result<Option<String>, Error> {
    sqlx::query_scalar::<_, Option<String>>("DELETE FROM users WHERE id = $1 RETURNING avatar")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::DatabaseError)?
        .ok_or(Error::Database(DatabaseError::NotFound))
}

#[tracing::instrument(name = "get user stats", skip_all, fields(user_id = user_id))]
pub async fn get_user_stats(pool: &PgPool, user_id: i64) -> Result<UserStats, Error> {
    let (bookmarks, history, read_chapters) = sqlx::query_as::<_, (i64, i64, i64)>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM bookmarks WHERE user_id = $1),
            (SELECT COUNT(*) FROM read_history WHERE user_id = $1),
            (SELECT COUNT(*) FROM read_chapters WHERE user_id = $1)
    "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    Ok(UserStats {
        bookmarks,
        history,
        read_chapters,
    })
}
