use sqlx::PgPool;

use crate::{
    error::Error,
    model::{BookmarkedComic, ComicSummary},
};

use super::error::DatabaseError;

#[derive(sqlx::FromRow)]
struct BookmarkRow {
    #[sqlx(flatten)]
    comic: ComicSummary,
    bookmarked_at: chrono::DateTime<chrono::Utc>,
}

/// Flips the bookmark for `(user_id, comic_id)` and returns whether the comic
/// is bookmarked afterwards.
#[tracing::instrument(name = "toggle bookmark", skip_all, fields(user_id = user_id, comic_id = comic_id))]
pub async fn toggle_bookmark(pool: &PgPool, user_id: i64, comic_id: i64) -> Result<bool, Error> {
    let mut tx = pool.begin().await.map_err(DatabaseError::DatabaseError)?;

    let removed = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND comic_id = $2")
        .bind(user_id)
        .bind(comic_id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::DatabaseError)?
        .rows_affected();

    if removed == 0 {
        sqlx::query(
            r#"
            INSERT INTO bookmarks
                (user_id, comic_id)
            VALUES
                ($1, $2)
            ON CONFLICT (user_id, comic_id) DO NOTHING;
        "#,
        )
        .bind(user_id)
        .bind(comic_id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::DatabaseError)?;
    }

    tx.commit().await.map_err(DatabaseError::DatabaseError)?;

    Ok(removed == 0)
}

#[tracing::instrument(name = "is bookmarked", skip_all, fields(user_id = user_id, comic_id = comic_id))]
pub async fn is_bookmarked(pool: &PgPool, user_id: i64, comic_id: i64) -> Result<bool, Error> {
    let bookmarked = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM bookmarks WHERE user_id = $1 AND comic_id = $2)",
    )
    .bind(user_id)
    .bind(comic_id)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    Ok(bookmarked)
}

#[tracing::instrument(name = "get user bookmarks", skip_all, fields(user_id = user_id))]
pub async fn get_user_bookmarks(pool: &PgPool, user_id: i64) -> Result<Vec<BookmarkedComic>, Error> {
    let bookmarks = sqlx::query_as::<_, BookmarkRow>(
        r#"
        SELECT
            comics.id, comics.slug, comics.title, comics.cover_url,
            comics.rating, comics."type", bookmarks.created_at AS bookmarked_at
        FROM
            bookmarks
        INNER JOIN
            comics ON comics.id = bookmarks.comic_id
        WHERE
            bookmarks.user_id = $1
        ORDER BY bookmarks.created_at DESC, bookmarks.id DESC
    "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::DatabaseError)?
    .into_iter()
    .map(|row| BookmarkedComic {
        comic: row.comic,
        bookmarked_at: row.bookmarked_at,
    })
    .collect();

    Ok(bookmarks)
}
