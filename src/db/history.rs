use sqlx::PgPool;

use crate::{
    error::Error,
    model::{ComicSummary, HistoryEntry},
};

use super::error::DatabaseError;

#[derive(sqlx::FromRow)]
struct HistoryRow {
    #[sqlx(flatten)]
    comic: ComicSummary,
    chapter_slug: String,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        HistoryEntry {
            comic: row.comic,
            chapter_slug: row.chapter_slug,
            updated_at: row.updated_at,
        }
    }
}

const HISTORY_SELECT: &str = r#"
    SELECT
        comics.id, comics.slug, comics.title, comics.cover_url,
        comics.rating, comics."type", read_history.chapter_slug, read_history.updated_at
    FROM
        read_history
    INNER JOIN
        comics ON comics.id = read_history.comic_id
"#;

/// Records a chapter view: the comic's history row now points at this
/// chapter, and the chapter joins the set of chapters ever read.
#[tracing::instrument(name = "record chapter read", skip_all, fields(user_id = user_id, comic_id = comic_id, chapter_slug = %chapter_slug))]
pub async fn record_chapter_read(
    pool: &PgPool,
    user_id: i64,
    comic_id: i64,
    chapter_slug: &str,
) -> Result<HistoryEntry, Error> {
    let mut tx = pool.begin().await.map_err(DatabaseError::DatabaseError)?;

    sqlx::query(
        r#"
        INSERT INTO read_history
            (user_id, comic_id, chapter_slug)
        VALUES
            ($1, $2, $3)
        ON CONFLICT (user_id, comic_id)
        DO UPDATE SET
            chapter_slug = EXCLUDED.chapter_slug,
            updated_at = now();
    "#,
    )
    .bind(user_id)
    .bind(comic_id)
    .bind(chapter_slug)
    .execute(&mut *tx)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    sqlx::query(
        r#"
        INSERT INTO read_chapters
            (user_id, comic_id, chapter_slug)
        VALUES
            ($1, $2, $3)
        ON CONFLICT (user_id, comic_id, chapter_slug) DO NOTHING;
    "#,
    )
    .bind(user_id)
    .bind(comic_id)
    .bind(chapter_slug)
    .execute(&mut *tx)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    let entry = sqlx::query_as::<_, HistoryRow>(&format!(
        "{HISTORY_SELECT} WHERE read_history.user_id = $1 AND read_history.comic_id = $2"
    ))
    .bind(user_id)
    .bind(comic_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    tx.commit().await.map_err(DatabaseError::DatabaseError)?;

    Ok(entry.into())
}

#[tracing::instrument(name = "get user history", skip_all, fields(user_id = user_id))]
pub async fn get_user_history(pool: &PgPool, user_id: i64) -> Result<Vec<HistoryEntry>, Error> {
    let history = sqlx::query_as::<_, HistoryRow>(&format!(
        "{HISTORY_SELECT} WHERE read_history.user_id = $1 ORDER BY read_history.updated_at DESC, read_history.id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::DatabaseError)?
    .into_iter()
    .map(HistoryEntry::from)
    .collect();

    Ok(history)
}

#[tracing::instrument(name = "get read chapters", skip_all, fields(user_id = user_id, comic_id = comic_id))]
pub async fn get_read_chapters(
    pool: &PgPool,
    user_id: i64,
    comic_id: i64,
) -> Result<Vec<String>, Error> {
    let chapters = sqlx::query_scalar::<_, String>(
        r#"
        SELECT chapter_slug
        FROM read_chapters
        WHERE user_id = $1 AND comic_id = $2
        ORDER BY created_at, id
    "#,
    )
    .bind(user_id)
    .bind(comic_id)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    Ok(chapters)
}

/// Forgets a comic entirely: its history row and its read chapters.
#[tracing::instrument(name = "delete user history", skip_all, fields(user_id = user_id, comic_id = comic_id))]
pub async fn delete_history_for_comic(
    pool: &PgPool,
    user_id: i64,
    comic_id: i64,
) -> Result<(), Error> {
    let mut tx = pool.begin().await.map_err(DatabaseError::DatabaseError)?;

    let removed = sqlx::query("DELETE FROM read_history WHERE user_id = $1 AND comic_id = $2")
        .bind(user_id)
        .bind(comic_id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::DatabaseError)?
        .rows_affected();

    if removed == 0 {
        return Err(Error::Database(DatabaseError::NotFound));
    }

    sqlx::query("DELETE FROM read_chapters WHERE user_id = $1 AND comic_id = $2")
        .bind(user_id)
        .bind(comic_id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::DatabaseError)?;

    tx.commit().await.map_err(DatabaseError::DatabaseError)?;

    Ok(())
}
