use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_option_number_from_string;
use serde_json::{Value, json};
use validator::{Validate, ValidationError};

use crate::{
    db::comic::{
        ComicChanges, ComicFilter, ComicInput, ComicSort, SortOrder, create_comic, delete_comic,
        get_comic_by_slug, get_comics, update_comic,
    },
    error::Error,
    model::{Comic, ComicPage, ComicType, PageMeta},
    state::SharedAppState,
    util::is_valid_slug,
};

const DEFAULT_LIMIT: i64 = 20;

#[derive(Deserialize, Debug, Validate)]
pub struct ComicQuery {
    #[serde(rename = "type")]
    pub comic_type: Option<String>,
    pub genre: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,

    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    #[validate(range(min = 1))]
    pub page: Option<i64>,

    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ComicQuery {
    fn into_filter(self) -> Result<(ComicFilter, i64), Error> {
        let comic_type = match non_empty(self.comic_type) {
            Some(value) => Some(
                ComicType::parse(&value)
                    .ok_or_else(|| Error::BadRequest(format!("Unknown comic type: {value}")))?,
            ),
            None => None,
        };

        let sort = match non_empty(self.sort) {
            Some(value) => ComicSort::parse(&value)
                .ok_or_else(|| Error::BadRequest(format!("Unknown sort: {value}")))?,
            None => ComicSort::default(),
        };

        // titles read naturally A-Z, everything else newest/highest first
        let default_order = match sort {
            ComicSort::Title => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        let order = match non_empty(self.order) {
            Some(value) => SortOrder::parse(&value)
                .ok_or_else(|| Error::BadRequest(format!("Unknown order: {value}")))?,
            None => default_order,
        };

        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        let offset = page
            .checked_sub(1)
            .and_then(|p| p.checked_mul(limit))
            .ok_or_else(|| Error::BadRequest("Page is out of range".to_string()))?;

        Ok((
            ComicFilter {
                comic_type,
                genre: non_empty(self.genre),
                search: non_empty(self.search),
                sort,
                order,
                limit,
                offset,
            },
            page,
        ))
    }
}

#[tracing::instrument(name = "[GET] comics", skip_all, fields(query = ?query))]
pub async fn index(
    State(app_state): State<SharedAppState>,
    Query(query): Query<ComicQuery>,
) -> Result<Json<ComicPage>, Error> {
    query.validate().map_err(Error::Validation)?;

    let (filter, page) = query.into_filter()?;
    let (comics, total) = get_comics(&app_state.pool, &filter).await?;

    Ok(Json(ComicPage {
        data: comics,
        pagination: PageMeta::new(page, filter.limit, total),
    }))
}

#[tracing::instrument(name = "[GET] comics/{slug}", skip_all, fields(slug = %slug))]
pub async fn show(
    State(app_state): State<SharedAppState>,
    Path(slug): Path<String>,
) -> Result<Json<Comic>, Error> {
    let comic = get_comic_by_slug(&app_state.pool, &slug).await?;

    Ok(Json(comic))
}

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if !is_valid_slug(slug) {
        return Err(ValidationError::new("slug_format").with_message(
            "Slug may only contain lowercase letters, digits, `-` and `.`".into(),
        ));
    }

    Ok(())
}

fn validate_comic_type(value: &str) -> Result<(), ValidationError> {
    if ComicType::parse(value).is_none() {
        return Err(ValidationError::new("comic_type")
            .with_message("Type must be one of Manga, Manhwa or Manhua".into()));
    }

    Ok(())
}

#[derive(Deserialize, Debug, Validate)]
pub struct StoreComicRequest {
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 255))]
    pub alternative_title: Option<String>,
    #[validate(length(max = 120))]
    pub author: Option<String>,
    #[validate(length(max = 32))]
    pub status: Option<String>,
    #[validate(url)]
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    #[validate(range(min = 0.0, max = 10.0))]
    pub rating: Option<f64>,
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_comic_type"))]
    pub comic_type: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[tracing::instrument(name = "[POST] comics", skip_all, fields(slug = %request.slug))]
pub async fn store(
    State(app_state): State<SharedAppState>,
    Json(request): Json<StoreComicRequest>,
) -> Result<(StatusCode, Json<Comic>), Error> {
    request.validate().map_err(Error::Validation)?;

    let input = ComicInput {
        slug: request.slug,
        title: request.title.trim().to_string(),
        alternative_title: non_empty(request.alternative_title),
        author: non_empty(request.author),
        status: non_empty(request.status),
        cover_url: non_empty(request.cover_url),
        synopsis: non_empty(request.synopsis),
        rating: request.rating.unwrap_or(0.0),
        comic_type: request
            .comic_type
            .as_deref()
            .and_then(ComicType::parse)
            .unwrap_or(ComicType::Manga),
        genres: request.genres.iter().map(|g| g.trim().to_lowercase()).collect(),
    };

    let comic = create_comic(&app_state.pool, input).await?;

    Ok((StatusCode::CREATED, Json(comic)))
}

#[derive(Deserialize, Debug, Validate)]
pub struct UpdateComicRequest {
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 255))]
    pub alternative_title: Option<String>,
    #[validate(length(max = 120))]
    pub author: Option<String>,
    #[validate(length(max = 32))]
    pub status: Option<String>,
    #[validate(url)]
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    #[validate(range(min = 0.0, max = 10.0))]
    pub rating: Option<f64>,
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_comic_type"))]
    pub comic_type: Option<String>,
    pub genres: Option<Vec<String>>,
}

#[tracing::instrument(name = "[PUT] comics/{slug}", skip_all, fields(slug = %slug))]
pub async fn update(
    State(app_state): State<SharedAppState>,
    Path(slug): Path<String>,
    Json(request): Json<UpdateComicRequest>,
) -> Result<Json<Comic>, Error> {
    request.validate().map_err(Error::Validation)?;

    let changes = ComicChanges {
        slug: request.slug,
        title: request.title.map(|t| t.trim().to_string()),
        alternative_title: request.alternative_title,
        author: request.author,
        status: request.status,
        cover_url: request.cover_url,
        synopsis: request.synopsis,
        rating: request.rating,
        comic_type: request.comic_type.as_deref().and_then(ComicType::parse),
        genres: request
            .genres
            .map(|genres| genres.iter().map(|g| g.trim().to_lowercase()).collect()),
    };

    let comic = update_comic(&app_state.pool, &slug, changes).await?;

    Ok(Json(comic))
}

#[tracing::instrument(name = "[DELETE] comics/{slug}", skip_all, fields(slug = %slug))]
pub async fn destroy(
    State(app_state): State<SharedAppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, Error> {
    delete_comic(&app_state.pool, &slug).await?;

    Ok(Json(json!({ "msg": "Comic deleted" })))
}
