use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderName, HeaderValue, Method, Request, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    config::Application,
    controllers::{auth, comics, detail, genres, home, search, user},
    middlewares::{admin_middleware, jwt_auth_middleware},
    state::AppState,
};

const REQUEST_ID_HEADER: &str = "x-request-id";
const AVATAR_BODY_LIMIT: usize = 3 * 1024 * 1024;

fn cors_layer(application: &Application) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if application.cors_allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = application
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(origins)
}

pub fn init_router(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config.application);
    let uploads_dir = app_state.config.application.uploads_dir.clone();
    let state = Arc::new(app_state);

    let app = Router::new()
        .route("/", get(home::index))
        .route("/search", get(search::index))
        .route("/detail-komik/{slug}", get(detail::show));

    let auth_route = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let comics_route = Router::new()
        .route("/", post(comics::store))
        .route("/{slug}", put(comics::update).delete(comics::destroy))
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ))
        .route("/", get(comics::index))
        .route("/{slug}", get(comics::show));

    let user_route = Router::new()
        .route("/avatar", put(user::profile::update_avatar))
        .layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT))
        .route(
            "/profile",
            get(user::profile::show).put(user::profile::update),
        )
        .route("/password", put(user::profile::update_password))
        .route("/account", delete(user::profile::destroy))
        .route("/bookmarks", get(user::bookmark::index))
        .route("/bookmark", post(user::bookmark::toggle))
        .route("/bookmark/{slug}", get(user::bookmark::show))
        .route(
            "/history",
            get(user::history::index).post(user::history::store),
        )
        .route(
            "/history/{slug}",
            delete(user::history::destroy),
        )
        .route("/history/{slug}/chapters", get(user::history::chapters))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    let api_route = Router::new()
        .nest("/auth", auth_route)
        .nest("/comics", comics_route)
        .route("/genres", get(genres::index))
        .nest("/user", user_route);

    let x_request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let request_id_middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            x_request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|val| val.to_str().ok())
                    .unwrap_or("");
                let user_agent = request
                    .headers()
                    .get(header::USER_AGENT)
                    .and_then(|val| val.to_str().ok())
                    .unwrap_or("");

                let matched_path = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str);

                tracing::info_span!(
                    "http_request",
                    request_id,
                    method = ?request.method(),
                    uri = ?request.uri(),
                    path = matched_path,
                    version = ?request.version(),
                    user_agent,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(x_request_id_header));

    app.nest("/api", api_route)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(request_id_middleware)
        .with_state(state)
}
