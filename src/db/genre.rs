use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{error::Error, model::Genre, util::slugify};

use super::{PostgresTransaction, error::DatabaseError};

pub const DEFAULT_GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Comedy",
    "Drama",
    "Fantasy",
    "Harem",
    "Historical",
    "Horror",
    "Isekai",
    "Martial Arts",
    "Mystery",
    "Psychological",
    "Romance",
    "School Life",
    "Sci-Fi",
    "Seinen",
    "Shoujo",
    "Shounen",
    "Slice of Life",
    "Sports",
    "Supernatural",
    "Thriller",
    "Tragedy",
];

#[tracing::instrument(name = "seed genres", skip_all)]
pub async fn seed_genres(pool: &PgPool) -> Result<(), Error> {
    let mut genre_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        INSERT INTO genres
            (name, slug)
    "#,
    );

    genre_builder.push_values(DEFAULT_GENRES, |mut b, name| {
        b.push_bind(*name).push_bind(slugify(name));
    });
    genre_builder.push(" ON CONFLICT DO NOTHING;");

    genre_builder
        .build()
        .execute(pool)
        .await
        .map_err(DatabaseError::DatabaseError)?;

    Ok(())
}

#[tracing::instrument(name = "get genres", skip_all)]
pub async fn get_genres(pool: &PgPool) -> Result<Vec<Genre>, Error> {
    let genres = sqlx::query_as::<_, Genre>("SELECT id, name, slug FROM genres ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::DatabaseError)?;

    Ok(genres)
}

/// Looks up genre ids for the given slugs. Every slug must exist.
#[tracing::instrument(name = "resolve genre ids", skip_all)]
pub async fn resolve_genre_ids(
    tx: &mut PostgresTransaction,
    slugs: &[String],
) -> Result<Vec<i64>, Error> {
    if slugs.is_empty() {
        return Ok(Vec::new());
    }

    let genres = sqlx::query_as::<_, Genre>(
        "SELECT id, name, slug FROM genres WHERE slug = ANY($1)",
    )
    .bind(slugs)
    .fetch_all(&mut **tx)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    let unknown: Vec<&str> = slugs
        .iter()
        .filter(|slug| !genres.iter().any(|g| &g.slug == *slug))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(Error::BadRequest(format!(
            "Unknown genre: {}",
            unknown.join(", ")
        )));
    }

    Ok(genres.into_iter().map(|g| g.id).collect())
}

/// Replaces the genre set of a comic.
pub async fn replace_comic_genres(
    tx: &mut PostgresTransaction,
    comic_id: i64,
    genre_ids: &[i64],
) -> Result<(), Error> {
    sqlx::query("DELETE FROM comic_genres WHERE comic_id = $1")
        .bind(comic_id)
        .execute(&mut **tx)
        .await
        .map_err(DatabaseError::DatabaseError)?;

    if genre_ids.is_empty() {
        return Ok(());
    }

    let mut comic_genre_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        INSERT INTO comic_genres
            (comic_id, genre_id)
    "#,
    );
    comic_genre_builder.push_values(genre_ids, |mut b, genre_id| {
        b.push_bind(comic_id).push_bind(*genre_id);
    });
    comic_genre_builder.push(" ON CONFLICT (comic_id, genre_id) DO NOTHING;");

    comic_genre_builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(DatabaseError::DatabaseError)?;

    Ok(())
}
