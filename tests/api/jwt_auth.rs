use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use komikita_api::{auth::encode_jwt, config::Jwt};
use secrecy::SecretString;

use crate::{AppStateTest, authorized_request};

fn profile_request(authorization: &str) -> Request<Body> {
    Request::builder()
        .uri("/api/user/profile")
        .header(axum::http::header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn should_throw_error_when_request_does_not_contain_header_authorization() {
    let test_state = AppStateTest::new(false).await;

    let request = Request::builder()
        .uri("/api/user/profile")
        .body(Body::empty())
        .unwrap();

    let response = test_state.generate_response(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_throw_error_when_auth_header_is_malformed() {
    let test_state = AppStateTest::new(false).await;

    for authorization in ["random-string", "not-bearer random-string", "bearer"] {
        let response = test_state
            .generate_response(profile_request(authorization))
            .await;

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "authorization header: {authorization}"
        );
    }
}

#[tokio::test]
async fn should_throw_error_when_jwt_token_is_invalid() {
    let test_state = AppStateTest::new(false).await;

    let response = test_state
        .generate_response(profile_request("bearer random-string"))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_throw_error_when_jwt_is_signed_with_other_secret() {
    let test_state = AppStateTest::new(false).await;

    let other = Jwt {
        secret: SecretString::from("another-secret"),
        ..test_state.app_state.config.jwt.clone()
    };
    let token = encode_jwt(1, &other).unwrap();

    let response = test_state
        .generate_response(authorized_request("GET", "/api/user/profile", &token))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_throw_error_when_user_no_longer_exists() {
    let mut test_state = AppStateTest::new(true).await;

    let token = encode_jwt(999_999, &test_state.app_state.config.jwt).unwrap();

    let response = test_state
        .generate_response(authorized_request("GET", "/api/user/profile", &token))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    test_state.cleanup().await;
}

#[tokio::test]
async fn should_pass_with_valid_token() {
    let mut test_state = AppStateTest::new(true).await;

    let (_, token) = test_state.generate_jwt_with_user().await;

    let response = test_state
        .generate_response(authorized_request("GET", "/api/user/profile", &token))
        .await;

    assert_eq!(response.status(), StatusCode::OK);

    test_state.cleanup().await;
}
