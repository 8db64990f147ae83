use axum::http::StatusCode;
use komikita_api::{
    controllers::user::bookmark::{BookmarkStatus, ToggleBookmarkResponse},
    model::{BookmarkedComic, ComicType},
};
use serde_json::json;

use crate::{AppStateTest, authorized_request, insert_fake_comic, json_request, read_json};

#[tokio::test]
async fn toggling_twice_should_restore_original_state() {
    let mut test_state = AppStateTest::new(true).await;
    let (_, token) = test_state.generate_jwt_with_user().await;

    insert_fake_comic(&test_state.app_state.pool, "blue-lock", ComicType::Manga, 8.3, &[]).await;

    let status_request = || authorized_request("GET", "/api/user/bookmark/blue-lock", &token);
    let toggle_request = || {
        json_request(
            "POST",
            "/api/user/bookmark",
            Some(&token),
            json!({ "comic_slug": "blue-lock" }),
        )
    };

    let status: BookmarkStatus = read_json(test_state.generate_response(status_request()).await).await;
    assert!(!status.bookmarked);

    // -----------------------------------------------------------------------------
    let response = test_state.generate_response(toggle_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let toggled: ToggleBookmarkResponse = read_json(response).await;
    assert!(toggled.bookmarked);

    let status: BookmarkStatus = read_json(test_state.generate_response(status_request()).await).await;
    assert!(status.bookmarked);

    // -----------------------------------------------------------------------------
    let response = test_state.generate_response(toggle_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let toggled: ToggleBookmarkResponse = read_json(response).await;
    assert!(!toggled.bookmarked);

    let status: BookmarkStatus = read_json(test_state.generate_response(status_request()).await).await;
    assert!(!status.bookmarked);

    let bookmarks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookmarks")
        .fetch_one(&test_state.app_state.pool)
        .await
        .unwrap();
    assert_eq!(bookmarks, 0);

    test_state.cleanup().await;
}

#[tokio::test]
async fn bookmarks_should_be_listed_newest_first_per_user() {
    let mut test_state = AppStateTest::new(true).await;
    let (_, token) = test_state.generate_jwt_with_user().await;
    let (_, other_token) = test_state.generate_jwt_with_user().await;

    let pool = &test_state.app_state.pool;
    insert_fake_comic(pool, "blue-lock", ComicType::Manga, 8.3, &[]).await;
    insert_fake_comic(pool, "omniscient-reader", ComicType::Manhwa, 9.0, &[]).await;

    for slug in ["blue-lock", "omniscient-reader"] {
        let request = json_request(
            "POST",
            "/api/user/bookmark",
            Some(&token),
            json!({ "comic_slug": slug }),
        );
        let response = test_state.generate_response(request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(authorized_request("GET", "/api/user/bookmarks", &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let bookmarks: Vec<BookmarkedComic> = read_json(response).await;
    let slugs: Vec<&str> = bookmarks.iter().map(|b| b.comic.slug.as_str()).collect();
    assert_eq!(slugs, vec!["omniscient-reader", "blue-lock"]);

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(authorized_request("GET", "/api/user/bookmarks", &other_token))
        .await;
    let bookmarks: Vec<BookmarkedComic> = read_json(response).await;
    assert!(bookmarks.is_empty());

    test_state.cleanup().await;
}

#[tokio::test]
async fn bookmarking_unknown_comic_should_be_not_found() {
    let mut test_state = AppStateTest::new(true).await;
    let (_, token) = test_state.generate_jwt_with_user().await;

    let request = json_request(
        "POST",
        "/api/user/bookmark",
        Some(&token),
        json!({ "comic_slug": "missing" }),
    );
    let response = test_state.generate_response(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = test_state
        .generate_response(authorized_request("GET", "/api/user/bookmark/missing", &token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    test_state.cleanup().await;
}
