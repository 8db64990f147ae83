use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    db::comic::get_comic_by_slug,
    error::Error,
    model::Comic,
    scraper::{Chapter, ScrapedDetail, SimilarComic},
    state::SharedAppState,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Database,
    Scraper,
    Unavailable,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DataSource {
    pub metadata: Source,
    pub chapters: Source,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DetailResponse {
    pub comic: Comic,
    pub chapters: Vec<Chapter>,
    pub first_chapter: Option<Chapter>,
    pub latest_chapter: Option<Chapter>,
    pub similar_comics: Vec<SimilarComic>,
    pub data_source: DataSource,
}

impl DetailResponse {
    fn new(comic: Comic, detail: ScrapedDetail, chapters_source: Source) -> Self {
        DetailResponse {
            comic,
            chapters: detail.chapters,
            first_chapter: detail.first_chapter,
            latest_chapter: detail.latest_chapter,
            similar_comics: detail.similar_comics,
            data_source: DataSource {
                metadata: Source::Database,
                chapters: chapters_source,
            },
        }
    }
}

/// Comic metadata comes from the database, chapters from the comic site.
/// A scraper failure degrades to an empty chapter list instead of an error.
#[tracing::instrument(name = "[GET] detail-komik/{slug}", skip_all, fields(slug = %slug))]
pub async fn show(
    State(app_state): State<SharedAppState>,
    Path(slug): Path<String>,
) -> Result<Json<DetailResponse>, Error> {
    let comic = get_comic_by_slug(&app_state.pool, &slug).await?;

    let response = match app_state
        .scraper
        .resolve_and_fetch_detail_by_slug(&comic.slug)
        .await
    {
        Ok(detail) => DetailResponse::new(comic, detail, Source::Scraper),
        Err(e) => {
            tracing::warn!(err.msg = %e, err.details = ?e, "chapter scraping failed");

            DetailResponse::new(comic, ScrapedDetail::default(), Source::Unavailable)
        }
    };

    Ok(Json(response))
}
