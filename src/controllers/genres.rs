use axum::{Json, extract::State};

use crate::{db::genre::get_genres, error::Error, model::Genre, state::SharedAppState};

#[tracing::instrument(name = "[GET] genres", skip_all)]
pub async fn index(State(app_state): State<SharedAppState>) -> Result<Json<Vec<Genre>>, Error> {
    let genres = get_genres(&app_state.pool).await?;

    Ok(Json(genres))
}
