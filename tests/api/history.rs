use axum::http::StatusCode;
use komikita_api::{
    controllers::user::history::ReadChapters,
    model::{ComicType, HistoryEntry},
};
use serde_json::{Value, json};

use crate::{AppStateTest, authorized_request, insert_fake_comic, json_request, read_json};

fn record(token: &str, comic_slug: &str, chapter_slug: &str) -> axum::http::Request<axum::body::Body> {
    json_request(
        "POST",
        "/api/user/history",
        Some(token),
        json!({ "comic_slug": comic_slug, "chapter_slug": chapter_slug }),
    )
}

#[tokio::test]
async fn n_chapter_views_should_keep_one_history_row_and_n_read_chapters() {
    let mut test_state = AppStateTest::new(true).await;
    let (user, token) = test_state.generate_jwt_with_user().await;

    insert_fake_comic(&test_state.app_state.pool, "jujutsu-kaisen", ComicType::Manga, 8.6, &[]).await;

    let chapters = [
        "jujutsu-kaisen-chapter-1",
        "jujutsu-kaisen-chapter-2",
        "jujutsu-kaisen-chapter-3",
        "jujutsu-kaisen-chapter-4",
    ];
    for chapter in chapters {
        let response = test_state
            .generate_response(record(&token, "jujutsu-kaisen", chapter))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let entry: HistoryEntry = read_json(response).await;
        assert_eq!(entry.chapter_slug, chapter);
        assert_eq!(entry.comic.slug, "jujutsu-kaisen");
    }

    // re-reading a chapter adds nothing
    let response = test_state
        .generate_response(record(&token, "jujutsu-kaisen", chapters[1]))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (history_rows, read_rows): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM read_history WHERE user_id = $1),
            (SELECT COUNT(*) FROM read_chapters WHERE user_id = $1)
    "#,
    )
    .bind(user.id)
    .fetch_one(&test_state.app_state.pool)
    .await
    .unwrap();
    assert_eq!(history_rows, 1);
    assert_eq!(read_rows, chapters.len() as i64);

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(authorized_request("GET", "/api/user/history", &token))
        .await;
    let history: Vec<HistoryEntry> = read_json(response).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].chapter_slug, chapters[1]);

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(authorized_request(
            "GET",
            "/api/user/history/jujutsu-kaisen/chapters",
            &token,
        ))
        .await;
    let read: ReadChapters = read_json(response).await;
    assert_eq!(read.chapters, chapters.to_vec());

    test_state.cleanup().await;
}

#[tokio::test]
async fn history_should_be_ordered_by_most_recent_read() {
    let mut test_state = AppStateTest::new(true).await;
    let (_, token) = test_state.generate_jwt_with_user().await;

    let pool = &test_state.app_state.pool;
    insert_fake_comic(pool, "dandadan", ComicType::Manga, 8.5, &[]).await;
    insert_fake_comic(pool, "sakamoto-days", ComicType::Manga, 8.4, &[]).await;

    for (comic, chapter) in [
        ("dandadan", "dandadan-chapter-1"),
        ("sakamoto-days", "sakamoto-days-chapter-1"),
        ("dandadan", "dandadan-chapter-2"),
    ] {
        let response = test_state.generate_response(record(&token, comic, chapter)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = test_state
        .generate_response(authorized_request("GET", "/api/user/history", &token))
        .await;
    let history: Vec<HistoryEntry> = read_json(response).await;
    let slugs: Vec<&str> = history.iter().map(|h| h.comic.slug.as_str()).collect();
    assert_eq!(slugs, vec!["dandadan", "sakamoto-days"]);
    assert_eq!(history[0].chapter_slug, "dandadan-chapter-2");

    test_state.cleanup().await;
}

#[tokio::test]
async fn deleting_history_should_forget_read_chapters() {
    let mut test_state = AppStateTest::new(true).await;
    let (_, token) = test_state.generate_jwt_with_user().await;

    insert_fake_comic(&test_state.app_state.pool, "dandadan", ComicType::Manga, 8.5, &[]).await;

    let response = test_state
        .generate_response(record(&token, "dandadan", "dandadan-chapter-1"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(authorized_request("DELETE", "/api/user/history/dandadan", &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert!(body["msg"].is_string());

    let response = test_state
        .generate_response(authorized_request(
            "GET",
            "/api/user/history/dandadan/chapters",
            &token,
        ))
        .await;
    let read: ReadChapters = read_json(response).await;
    assert!(read.chapters.is_empty());

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(authorized_request("DELETE", "/api/user/history/dandadan", &token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    test_state.cleanup().await;
}

#[tokio::test]
async fn recording_history_should_validate_body() {
    let mut test_state = AppStateTest::new(true).await;
    let (_, token) = test_state.generate_jwt_with_user().await;

    let response = test_state
        .generate_response(record(&token, "dandadan", ""))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = test_state
        .generate_response(record(&token, "dandadan", "   "))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = test_state
        .generate_response(record(&token, "missing", "missing-chapter-1"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    test_state.cleanup().await;
}
