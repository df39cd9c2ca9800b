use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tower_http::services::ServeDir;

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::image_host::ImageHost;
use crate::mailer::Mailer;
use crate::user::{SessionTokenSigner, UserManager, UserStore};

use super::session::Session;
use super::state::ServerState;
use super::user_routes::MAX_PHOTO_UPLOAD_BYTES;
use super::{auth_routes, log_requests, user_routes, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    user_store: Arc<dyn UserStore>,
    jwt_secret: &[u8],
    mailer: Arc<dyn Mailer>,
    image_host: Option<Arc<dyn ImageHost>>,
) -> Result<Router> {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        user_manager: Arc::new(UserManager::new(user_store)),
        token_signer: SessionTokenSigner::new(jwt_secret),
        mailer,
        image_host,
    };

    let auth_routes: Router = Router::new()
        .route("/signup", post(auth_routes::signup))
        .route("/verify/{token}", get(auth_routes::verify_email))
        .route("/login", post(auth_routes::login))
        .with_state(state.clone());

    let user_routes: Router = Router::new()
        .route("/me", get(user_routes::get_me))
        .route("/update", put(user_routes::update_name))
        .route(
            "/update-photo",
            put(user_routes::update_photo)
                .layer(DefaultBodyLimit::max(MAX_PHOTO_UPLOAD_BYTES + 1024)),
        )
        .route(
            "/recent",
            post(user_routes::record_recent_play).get(user_routes::get_recent_plays),
        )
        .route("/like", post(user_routes::toggle_like))
        .route("/likes", get(user_routes::get_liked_songs))
        .route("/library/{type}", post(user_routes::toggle_library_entry))
        .route("/library", get(user_routes::get_library))
        .route(
            "/self-playlist",
            post(user_routes::create_self_playlist).get(user_routes::get_self_playlists),
        )
        .route(
            "/self-playlist/{playlist_id}",
            delete(user_routes::delete_self_playlist),
        )
        .route(
            "/self-playlist/{playlist_id}/add",
            post(user_routes::add_song_to_self_playlist),
        )
        .route("/{user_id}", get(user_routes::get_public_user))
        .route("/{user_id}/photo", get(user_routes::get_user_photo))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .nest("/api/auth", auth_routes)
        .nest("/api/user", user_routes)
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    user_store: Arc<dyn UserStore>,
    jwt_secret: &[u8],
    mailer: Arc<dyn Mailer>,
    image_host: Option<Arc<dyn ImageHost>>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, user_store, jwt_secret, mailer, image_host)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::LogMailer;
    use crate::user::SqliteUserStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt; // for `oneshot`

    fn test_app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteUserStore::new(dir.path().join("user.db")).unwrap());
        let app = make_app(
            ServerConfig::default(),
            store,
            b"test-secret",
            Arc::new(LogMailer),
            None,
        )
        .unwrap();
        (dir, app)
    }

    #[tokio::test]
    async fn responds_unauthorized_on_protected_routes() {
        let (_dir, app) = test_app();

        let protected_routes = vec![
            ("GET", "/api/user/me"),
            ("PUT", "/api/user/update"),
            ("PUT", "/api/user/update-photo"),
            ("POST", "/api/user/recent"),
            ("GET", "/api/user/recent"),
            ("POST", "/api/user/like"),
            ("GET", "/api/user/likes"),
            ("POST", "/api/user/library/artists"),
            ("GET", "/api/user/library"),
            ("POST", "/api/user/self-playlist"),
            ("GET", "/api/user/self-playlist"),
            ("DELETE", "/api/user/self-playlist/abc"),
            ("POST", "/api/user/self-playlist/abc/add"),
        ];

        for (method, route) in protected_routes.into_iter() {
            println!("Trying route {} {}", method, route);
            let request = Request::builder()
                .method(method)
                .uri(route)
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn rejects_garbage_bearer_token() {
        let (_dir, app) = test_app();

        let request = Request::builder()
            .uri("/api/user/me")
            .header("Authorization", "Bearer not-a-real-token")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["msg"], "Token is not valid");
    }

    #[tokio::test]
    async fn public_user_routes_do_not_require_auth() {
        let (_dir, app) = test_app();

        // Unknown user: 404 rather than 401 proves the route is public
        let request = Request::builder()
            .uri("/api/user/zzzzzzzz")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = Request::builder()
            .uri("/api/user/zzzzzzzz/photo")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
