use futures::TryStreamExt;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::{
    error::Error,
    model::{Comic, ComicEntity, ComicGenre, ComicSummary, ComicType, Genre},
};

use super::{
    error::DatabaseError,
    genre::{replace_comic_genres, resolve_genre_ids},
};

const COMIC_COLUMNS: &str = r#"
    comics.id, comics.slug, comics.title, comics.alternative_title,
    comics.author, comics.status, comics.cover_url, comics.synopsis,
    comics.rating, comics."type", comics.created_at, comics.updated_at
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComicSort {
    Rating,
    #[default]
    CreatedAt,
    Title,
}

impl ComicSort {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rating" => Some(ComicSort::Rating),
            "created_at" | "latest" => Some(ComicSort::CreatedAt),
            "title" => Some(ComicSort::Title),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            ComicSort::Rating => "comics.rating",
            ComicSort::CreatedAt => "comics.created_at",
            ComicSort::Title => "lower(comics.title)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComicFilter {
    pub comic_type: Option<ComicType>,
    pub genre: Option<String>,
    pub search: Option<String>,
    pub sort: ComicSort,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ComicFilter {
    fn default() -> Self {
        ComicFilter {
            comic_type: None,
            genre: None,
            search: None,
            sort: ComicSort::CreatedAt,
            order: SortOrder::Desc,
            limit: 20,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComicInput {
    pub slug: String,
    pub title: String,
    pub alternative_title: Option<String>,
    pub author: Option<String>,
    pub status: Option<String>,
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    pub rating: f64,
    pub comic_type: ComicType,
    pub genres: Vec<String>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ComicChanges {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub alternative_title: Option<String>,
    pub author: Option<String>,
    pub status: Option<String>,
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    pub rating: Option<f64>,
    pub comic_type: Option<ComicType>,
    pub genres: Option<Vec<String>>,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ComicFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(comic_type) = &filter.comic_type {
        builder
            .push(r#" AND comics."type" = "#)
            .push_bind(comic_type.as_str());
    }

    if let Some(genre) = &filter.genre {
        builder
            .push(
                r#" AND EXISTS (
                SELECT 1 FROM comic_genres
                INNER JOIN genres ON genres.id = comic_genres.genre_id
                WHERE comic_genres.comic_id = comics.id AND genres.slug = "#,
            )
            .push_bind(genre.to_lowercase())
            .push(")");
    }

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (comics.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR comics.alternative_title ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

async fn get_genres_for_comics(pool: &PgPool, comic_ids: &[i64]) -> Result<Vec<ComicGenre>, Error> {
    if comic_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut genre_query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        SELECT
            comic_genres.comic_id, genres.id, genres.name, genres.slug
        FROM
            comic_genres
        INNER JOIN
            genres ON comic_genres.genre_id = genres.id
        WHERE
            comic_genres.comic_id in (
    "#,
    );
    let mut genre_query_builder_separator = genre_query_builder.separated(", ");
    for comic_id in comic_ids {
        genre_query_builder_separator.push_bind(*comic_id);
    }
    genre_query_builder_separator.push_unseparated(") ORDER BY genres.name;");
    let mut genre_stream = genre_query_builder.build().fetch(pool);

    let mut comic_genres = Vec::new();
    while let Some(row) = genre_stream
        .try_next()
        .await
        .map_err(DatabaseError::DatabaseError)?
    {
        comic_genres.push(ComicGenre {
            comic_id: row.get("comic_id"),
            genre: Genre {
                id: row.get("id"),
                name: row.get("name"),
                slug: row.get("slug"),
            },
        });
    }

    Ok(comic_genres)
}

#[tracing::instrument(name = "get comics with filter", skip_all, fields(filter = ?filter))]
pub async fn get_comics(pool: &PgPool, filter: &ComicFilter) -> Result<(Vec<Comic>, i64), Error> {
    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM comics");
    push_filters(&mut count_builder, filter);
    let total = count_builder
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::DatabaseError)?;

    if total == 0 {
        return Ok((Vec::new(), 0));
    }

    let mut comic_builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {COMIC_COLUMNS} FROM comics"));
    push_filters(&mut comic_builder, filter);
    comic_builder
        .push(" ORDER BY ")
        .push(filter.sort.column())
        .push(" ")
        .push(filter.order.keyword())
        .push(", comics.id ")
        .push(filter.order.keyword())
        .push(" LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset);

    let comic_raw = comic_builder
        .build_query_as::<ComicEntity>()
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::DatabaseError)?;

    let comic_ids: Vec<i64> = comic_raw.iter().map(|c| c.id).collect();
    let comic_genres = get_genres_for_comics(pool, &comic_ids).await?;

    let comics = comic_raw
        .into_iter()
        .map(|c| Comic::from_entity(c, &comic_genres))
        .collect();

    Ok((comics, total))
}

#[tracing::instrument(name = "get comic by slug", skip_all, fields(slug = %slug))]
pub async fn get_comic_by_slug(pool: &PgPool, slug: &str) -> Result<Comic, Error> {
    let comic_raw = sqlx::query_as::<_, ComicEntity>(&format!(
        "SELECT {COMIC_COLUMNS} FROM comics WHERE comics.slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::DatabaseError)?
    .ok_or(Error::Database(DatabaseError::NotFound))?;

    let comic_genres = get_genres_for_comics(pool, &[comic_raw.id]).await?;

    Ok(Comic::from_entity(comic_raw, &comic_genres))
}

#[tracing::instrument(name = "get comic id by slug", skip_all, fields(slug = %slug))]
pub async fn get_comic_id_by_slug(pool: &PgPool, slug: &str) -> Result<i64, Error> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM comics WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::DatabaseError)?
        .ok_or(Error::Database(DatabaseError::NotFound))
}

async fn ensure_slug_available(
    pool: &PgPool,
    slug: &str,
    except_comic_id: Option<i64>,
) -> Result<(), Error> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM comics WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
    )
    .bind(slug)
    .bind(except_comic_id)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    if taken {
        return Err(Error::BadRequest("Slug already exists".to_string()));
    }

    Ok(())
}

fn map_slug_violation(error: sqlx::Error) -> Error {
    if DatabaseError::is_unique_violation(&error) {
        return Error::BadRequest("Slug already exists".to_string());
    }

    Error::Database(DatabaseError::DatabaseError(error))
}

#[tracing::instrument(name = "create comic", skip_all, fields(slug = %input.slug))]
pub async fn create_comic(pool: &PgPool, input: ComicInput) -> Result<Comic, Error> {
    ensure_slug_available(pool, &input.slug, None).await?;

    let mut tx = pool.begin().await.map_err(DatabaseError::DatabaseError)?;

    let genre_ids = resolve_genre_ids(&mut tx, &input.genres).await?;

    let comic_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO comics
            (slug, title, alternative_title, author, status, cover_url, synopsis, rating, "type")
        VALUES
            ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id;
    "#,
    )
    .bind(&input.slug)
    .bind(&input.title)
    .bind(&input.alternative_title)
    .bind(&input.author)
    .bind(&input.status)
    .bind(&input.cover_url)
    .bind(&input.synopsis)
    .bind(input.rating)
    .bind(input.comic_type.as_str())
    .fetch_one(&mut *tx)
    .await
    .map_err(map_slug_violation)?;

    replace_comic_genres(&mut tx, comic_id, &genre_ids).await?;

    tx.commit().await.map_err(DatabaseError::DatabaseError)?;

    get_comic_by_slug(pool, &input.slug).await
}

#[tracing::instrument(name = "update comic", skip_all, fields(slug = %slug))]
pub async fn update_comic(pool: &PgPool, slug: &str, changes: ComicChanges) -> Result<Comic, Error> {
    let comic_id = get_comic_id_by_slug(pool, slug).await?;

    if let Some(new_slug) = &changes.slug {
        ensure_slug_available(pool, new_slug, Some(comic_id)).await?;
    }

    let mut tx = pool.begin().await.map_err(DatabaseError::DatabaseError)?;

    let updated_slug = sqlx::query_scalar::<_, String>(
        r#"
        UPDATE comics
        SET
            slug = COALESCE($1, slug),
            title = COALESCE($2, title),
            alternative_title = COALESCE($3, alternative_title),
            author = COALESCE($4, author),
            status = COALESCE($5, status),
            cover_url = COALESCE($6, cover_url),
            synopsis = COALESCE($7, synopsis),
            rating = COALESCE($8, rating),
            "type" = COALESCE($9, "type"),
            updated_at = now()
        WHERE
            id = $10
        RETURNING slug;
    "#,
    )
    .bind(&changes.slug)
    .bind(&changes.title)
    .bind(&changes.alternative_title)
    .bind(&changes.author)
    .bind(&changes.status)
    .bind(&changes.cover_url)
    .bind(&changes.synopsis)
    .bind(changes.rating)
    .bind(changes.comic_type.map(|t| t.as_str()))
    .bind(comic_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(map_slug_violation)?;

    if let Some(genres) = &changes.genres {
        let genre_ids = resolve_genre_ids(&mut tx, genres).await?;
        replace_comic_genres(&mut tx, comic_id, &genre_ids).await?;
    }

    tx.commit().await.map_err(DatabaseError::DatabaseError)?;

    get_comic_by_slug(pool, &updated_slug).await
}

#[tracing::instrument(name = "delete comic", skip_all, fields(slug = %slug))]
pub async fn delete_comic(pool: &PgPool, slug: &str) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM comics WHERE slug = $1")
        .bind(slug)
        .execute(pool)
        .await
        .map_err(DatabaseError::DatabaseError)?;

    if result.rows_affected() == 0 {
        return Err(Error::Database(DatabaseError::NotFound));
    }

    Ok(())
}

#[tracing::instrument(name = "search comics", skip_all, fields(keyword = %keyword))]
pub async fn search_comics(
    pool: &PgPool,
    keyword: &str,
    limit: i64,
) -> Result<Vec<ComicSummary>, Error> {
    let pattern = format!("%{}%", escape_like(keyword.trim()));

    let comics = sqlx::query_as::<_, ComicSummary>(
        r#"
        SELECT
            id, slug, title, cover_url, rating, "type"
        FROM
            comics
        WHERE
            title ILIKE $1 OR alternative_title ILIKE $1 OR slug ILIKE $1
        ORDER BY rating DESC, id
        LIMIT $2
    "#,
    )
    .bind(pattern)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::DatabaseError)?;

    Ok(comics)
}
