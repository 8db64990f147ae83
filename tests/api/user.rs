use axum::{
    body::Body,
    http::{self, Request, StatusCode},
};
use komikita_api::{
    controllers::user::profile::ProfileResponse,
    model::{ComicType, User, UserStats},
};
use serde_json::{Value, json};

use crate::{AppStateTest, authorized_request, insert_fake_comic, json_request, read_json};

const BOUNDARY: &str = "komikita-test-boundary";

fn avatar_request(token: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("PUT")
        .uri("/api/user/avatar")
        .header(http::header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 64]);
    bytes
}

#[tokio::test]
async fn profile_should_return_user_with_stats() {
    let mut test_state = AppStateTest::new(true).await;
    let (user, token) = test_state.generate_jwt_with_user().await;

    insert_fake_comic(&test_state.app_state.pool, "frieren", ComicType::Manga, 9.3, &[]).await;

    let request = json_request(
        "POST",
        "/api/user/bookmark",
        Some(&token),
        json!({ "comic_slug": "frieren" }),
    );
    assert_eq!(test_state.generate_response(request).await.status(), StatusCode::OK);

    for chapter in ["frieren-chapter-1", "frieren-chapter-2"] {
        let request = json_request(
            "POST",
            "/api/user/history",
            Some(&token),
            json!({ "comic_slug": "frieren", "chapter_slug": chapter }),
        );
        assert_eq!(test_state.generate_response(request).await.status(), StatusCode::OK);
    }

    let response = test_state
        .generate_response(authorized_request("GET", "/api/user/profile", &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let profile: ProfileResponse = read_json(response).await;
    assert_eq!(profile.user.id, user.id);
    assert_eq!(profile.user.email, user.email);
    assert_eq!(
        profile.stats,
        UserStats {
            bookmarks: 1,
            history: 1,
            read_chapters: 2,
        }
    );

    test_state.cleanup().await;
}

#[tokio::test]
async fn profile_update_should_change_fields_and_reject_duplicates() {
    let mut test_state = AppStateTest::new(true).await;
    let (user, token) = test_state.generate_jwt_with_user().await;
    let (other, _) = test_state.generate_jwt_with_user().await;

    // -----------------------------------------------------------------------------
    let request = json_request(
        "PUT",
        "/api/user/profile",
        Some(&token),
        json!({ "username": "renamed_reader" }),
    );
    let response = test_state.generate_response(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let updated: User = read_json(response).await;
    assert_eq!(updated.username, "renamed_reader");
    assert_eq!(updated.email, user.email);

    // -----------------------------------------------------------------------------
    let request = json_request(
        "PUT",
        "/api/user/profile",
        Some(&token),
        json!({ "email": other.email }),
    );
    let response = test_state.generate_response(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // -----------------------------------------------------------------------------
    let request = json_request(
        "PUT",
        "/api/user/profile",
        Some(&token),
        json!({ "email": "not-an-email" }),
    );
    let response = test_state.generate_response(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    test_state.cleanup().await;
}

#[tokio::test]
async fn password_update_should_verify_current_password() {
    let mut test_state = AppStateTest::new(true).await;
    let (user, token) = test_state.generate_jwt_with_user().await;

    // -----------------------------------------------------------------------------
    let request = json_request(
        "PUT",
        "/api/user/password",
        Some(&token),
        json!({ "current_password": "wrong-password", "new_password": "new-secret" }),
    );
    let response = test_state.generate_response(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_json(response).await;
    assert_eq!(body["msg"], "Current password is incorrect");

    // -----------------------------------------------------------------------------
    let request = json_request(
        "PUT",
        "/api/user/password",
        Some(&token),
        json!({ "current_password": "password123", "new_password": "123" }),
    );
    let response = test_state.generate_response(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // -----------------------------------------------------------------------------
    let request = json_request(
        "PUT",
        "/api/user/password",
        Some(&token),
        json!({ "current_password": "password123", "new_password": "new-secret" }),
    );
    let response = test_state.generate_response(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let request = json_request(
        "POST",
        "/api/auth/login",
        None,
        json!({ "email": user.email, "password": "new-secret" }),
    );
    let response = test_state.generate_response(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    test_state.cleanup().await;
}

#[tokio::test]
async fn avatar_upload_should_store_file_and_replace_previous() {
    let mut test_state = AppStateTest::new(true).await;
    let (_, token) = test_state.generate_jwt_with_user().await;

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(avatar_request(&token, "me.png", "image/png", &png_bytes()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let first: User = read_json(response).await;
    let first_avatar = first.avatar.unwrap();
    assert!(first_avatar.starts_with("/uploads/avatars/"));
    assert!(first_avatar.ends_with(".png"));

    let first_file = test_state
        .uploads_dir()
        .join(first_avatar.trim_start_matches("/uploads/"));
    assert!(first_file.exists());

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(avatar_request(&token, "me.jpg", "image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0]))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let second: User = read_json(response).await;
    let second_avatar = second.avatar.unwrap();
    assert!(second_avatar.ends_with(".jpg"));
    assert!(!first_file.exists());

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(authorized_request("GET", &second_avatar, &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    test_state.cleanup().await;
}

#[tokio::test]
async fn avatar_upload_should_reject_wrong_type_and_large_files() {
    let mut test_state = AppStateTest::new(true).await;
    let (user, token) = test_state.generate_jwt_with_user().await;

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(avatar_request(&token, "me.gif", "image/gif", b"GIF89a"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // -----------------------------------------------------------------------------
    let too_large = vec![0u8; 2 * 1024 * 1024 + 1];
    let response = test_state
        .generate_response(avatar_request(&token, "me.png", "image/png", &too_large))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let avatar: Option<String> = sqlx::query_scalar("SELECT avatar FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&test_state.app_state.pool)
        .await
        .unwrap();
    assert_eq!(avatar, None);

    test_state.cleanup().await;
}

#[tokio::test]
async fn account_delete_should_cascade_and_invalidate_token() {
    let mut test_state = AppStateTest::new(true).await;
    let (user, token) = test_state.generate_jwt_with_user().await;

    insert_fake_comic(&test_state.app_state.pool, "frieren", ComicType::Manga, 9.3, &[]).await;

    let request = json_request(
        "POST",
        "/api/user/bookmark",
        Some(&token),
        json!({ "comic_slug": "frieren" }),
    );
    assert_eq!(test_state.generate_response(request).await.status(), StatusCode::OK);

    let response = test_state
        .generate_response(avatar_request(&token, "me.png", "image/png", &png_bytes()))
        .await;
    let with_avatar: User = read_json(response).await;
    let avatar_file = test_state.uploads_dir().join(
        with_avatar
            .avatar
            .unwrap()
            .trim_start_matches("/uploads/"),
    );
    assert!(avatar_file.exists());

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(authorized_request("DELETE", "/api/user/account", &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!avatar_file.exists());

    let bookmarks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookmarks WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&test_state.app_state.pool)
        .await
        .unwrap();
    assert_eq!(bookmarks, 0);

    // -----------------------------------------------------------------------------
    let response = test_state
        .generate_response(authorized_request("GET", "/api/user/profile", &token))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    test_state.cleanup().await;
}
