use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    db::{
        comic::get_comic_id_by_slug,
        history::{
            delete_history_for_comic, get_read_chapters, get_user_history, record_chapter_read,
        },
    },
    error::Error,
    model::{HistoryEntry, User},
    state::SharedAppState,
};

#[tracing::instrument(name = "[GET] user/history", skip_all, fields(user_id = user.id))]
pub async fn index(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
) -> Result<Json<Vec<HistoryEntry>>, Error> {
    let history = get_user_history(&app_state.pool, user.id).await?;

    Ok(Json(history))
}

#[derive(Deserialize, Debug, Validate)]
pub struct RecordHistoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub comic_slug: String,
    #[validate(length(min = 1, max = 255))]
    pub chapter_slug: String,
}

impl RecordHistoryRequest {
    fn trimmed(self) -> Self {
        RecordHistoryRequest {
            comic_slug: self.comic_slug.trim().to_string(),
            chapter_slug: self.chapter_slug.trim().to_string(),
        }
    }
}

#[tracing::instrument(name = "[POST] user/history", skip_all, fields(user_id = user.id, comic_slug = %request.comic_slug, chapter_slug = %request.chapter_slug))]
pub async fn store(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<RecordHistoryRequest>,
) -> Result<Json<HistoryEntry>, Error> {
    let request = request.trimmed();
    request.validate().map_err(Error::Validation)?;

    let comic_id = get_comic_id_by_slug(&app_state.pool, &request.comic_slug).await?;
    let entry =
        record_chapter_read(&app_state.pool, user.id, comic_id, &request.chapter_slug).await?;

    Ok(Json(entry))
}

#[tracing::instrument(name = "[DELETE] user/history/{slug}", skip_all, fields(user_id = user.id, slug = %slug))]
pub async fn destroy(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, Error> {
    let comic_id = get_comic_id_by_slug(&app_state.pool, &slug).await?;
    delete_history_for_comic(&app_state.pool, user.id, comic_id).await?;

    Ok(Json(json!({ "msg": "History removed" })))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ReadChapters {
    pub chapters: Vec<String>,
}

#[tracing::instrument(name = "[GET] user/history/{slug}/chapters", skip_all, fields(user_id = user.id, slug = %slug))]
pub async fn chapters(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(slug): Path<String>,
) -> Result<Json<ReadChapters>, Error> {
    let comic_id = get_comic_id_by_slug(&app_state.pool, &slug).await?;
    let chapters = get_read_chapters(&app_state.pool, user.id, comic_id).await?;

    Ok(Json(ReadChapters { chapters }))
}
