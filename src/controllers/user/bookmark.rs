use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    db::{
        bookmark::{get_user_bookmarks, is_bookmarked, toggle_bookmark},
        comic::get_comic_id_by_slug,
    },
    error::Error,
    model::{BookmarkedComic, User},
    state::SharedAppState,
};

#[tracing::instrument(name = "[GET] user/bookmarks", skip_all, fields(user_id = user.id))]
pub async fn index(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
) -> Result<Json<Vec<BookmarkedComic>>, Error> {
    let bookmarks = get_user_bookmarks(&app_state.pool, user.id).await?;

    Ok(Json(bookmarks))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BookmarkStatus {
    pub bookmarked: bool,
}

#[tracing::instrument(name = "[GET] user/bookmark/{slug}", skip_all, fields(user_id = user.id, slug = %slug))]
pub async fn show(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(slug): Path<String>,
) -> Result<Json<BookmarkStatus>, Error> {
    let comic_id = get_comic_id_by_slug(&app_state.pool, &slug).await?;
    let bookmarked = is_bookmarked(&app_state.pool, user.id, comic_id).await?;

    Ok(Json(BookmarkStatus { bookmarked }))
}

#[derive(Deserialize, Debug, Validate)]
pub struct ToggleBookmarkRequest {
    #[validate(length(min = 1, max = 255))]
    pub comic_slug: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ToggleBookmarkResponse {
    pub bookmarked: bool,
    pub msg: String,
}

#[tracing::instrument(name = "[POST] user/bookmark", skip_all, fields(user_id = user.id, comic_slug = %request.comic_slug))]
pub async fn toggle(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<ToggleBookmarkRequest>,
) -> Result<Json<ToggleBookmarkResponse>, Error> {
    request.validate().map_err(Error::Validation)?;

    let comic_id = get_comic_id_by_slug(&app_state.pool, &request.comic_slug).await?;
    let bookmarked = toggle_bookmark(&app_state.pool, user.id, comic_id).await?;

    let msg = if bookmarked {
        "Bookmark added"
    } else {
        "Bookmark removed"
    };

    Ok(Json(ToggleBookmarkResponse {
        bookmarked,
        msg: msg.to_string(),
    }))
}
