use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{db::comic::search_comics, error::Error, model::ComicSummary, state::SharedAppState};

const SEARCH_LIMIT: i64 = 20;

#[derive(Deserialize, Debug)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SearchResponse {
    pub results: Vec<ComicSummary>,
}

/// Title search over the local catalogue. The chapter scraper also calls this
/// as its last resort when a slug is unknown upstream.
#[tracing::instrument(name = "[GET] search", skip_all, fields(q = %query.q))]
pub async fn index(
    State(app_state): State<SharedAppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, Error> {
    let keyword = query.q.trim();
    if keyword.is_empty() {
        return Ok(Json(SearchResponse {
            results: Vec::new(),
        }));
    }

    let results = search_comics(&app_state.pool, keyword, SEARCH_LIMIT).await?;

    Ok(Json(SearchResponse { results }))
}
