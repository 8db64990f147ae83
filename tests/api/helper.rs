use std::path::PathBuf;

use axum::{
    body::Body,
    http::{self, Request, Response},
};
use http_body_util::BodyExt;
use komikita_api::{
    auth::encode_jwt,
    config::Config,
    db::user::create_user,
    model::{Role, User},
    routes::init_router,
    state::AppState,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{Connection, Executor, PgConnection, postgres::PgPoolOptions};
use tower::ServiceExt;
use uuid::Uuid;

pub struct AppStateTest {
    pub app_state: AppState,
    database_name: Option<String>,
    uploads_dir: PathBuf,
}

impl AppStateTest {
    pub async fn new(run_migration: bool) -> Self {
        let mut config = Config::new().expect("Failed to read configuration");
        config.application.run_migration = run_migration;

        Self::new_with_config(config).await
    }

    /// Each migrated test state gets its own database and uploads directory.
    pub async fn new_with_config(mut config: Config) -> Self {
        let uploads_dir = std::env::temp_dir().join(format!("komikita-test-{}", Uuid::new_v4()));
        config.application.uploads_dir = uploads_dir.to_string_lossy().to_string();

        let database_name = if config.application.run_migration {
            let name = format!("komikita_test_{}", Uuid::new_v4().simple());

            let mut connection = PgConnection::connect_with(&config.database.without_db())
                .await
                .expect("Failed to connect to Postgres");
            connection
                .execute(format!(r#"CREATE DATABASE "{}";"#, name).as_str())
                .await
                .expect("Failed to create database.");

            config.database.database_name = name.clone();
            Some(name)
        } else {
            None
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(config.database.with_db());

        let app_state = AppState::with_pool(pool, config)
            .await
            .expect("Failed to build app state.");

        AppStateTest {
            app_state,
            database_name,
            uploads_dir,
        }
    }

    pub async fn generate_response(&self, request: Request<Body>) -> Response<Body> {
        init_router(self.app_state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    pub async fn generate_user(&self, role: Role) -> User {
        let suffix = Uuid::new_v4().simple().to_string();

        create_user(
            &self.app_state.pool,
            format!("reader_{}", &suffix[..12]),
            format!("{}@komikita.test", &suffix[..12]),
            "password123".into(),
            role,
        )
        .await
        .unwrap()
    }

    pub async fn generate_jwt_with_user(&self) -> (User, String) {
        let user = self.generate_user(Role::User).await;
        let token = encode_jwt(user.id, &self.app_state.config.jwt).unwrap();

        (user, token)
    }

    pub async fn generate_jwt_with_admin(&self) -> (User, String) {
        let user = self.generate_user(Role::Admin).await;
        let token = encode_jwt(user.id, &self.app_state.config.jwt).unwrap();

        (user, token)
    }

    pub fn uploads_dir(&self) -> &PathBuf {
        &self.uploads_dir
    }

    pub async fn cleanup(&mut self) {
        self.app_state.pool.close().await;

        let _ = tokio::fs::remove_dir_all(&self.uploads_dir).await;

        if let Some(name) = self.database_name.take() {
            let mut connection =
                PgConnection::connect_with(&self.app_state.config.database.without_db())
                    .await
                    .expect("Failed to connect to Postgres");
            connection
                .execute(format!(r#"DROP DATABASE IF EXISTS "{}" WITH (FORCE);"#, name).as_str())
                .await
                .expect("Failed to drop database.");
        }
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub fn authorized_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body = response.into_body().collect().await.unwrap().to_bytes();

    serde_json::from_slice(&body).unwrap()
}
