//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with methods for all server endpoints and bearer-token
//! session handling. When API routes or request formats change, update
//! only this file.

use reqwest::{Method, RequestBuilder, Response};
use serde_json::json;
use std::time::Duration;

use super::constants::*;
use super::server::TestServer;

/// HTTP test client carrying an optional bearer token.
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    token: Option<String>,
}

impl TestClient {
    /// Creates a new unauthenticated client.
    ///
    /// Use this for testing authentication flows. For most tests, use
    /// `authenticated()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client holding a valid session for a fresh, verified user
    /// with the default test credentials.
    ///
    /// # Panics
    ///
    /// Panics if any step of signup/verify/login fails (indicates a test
    /// infrastructure problem).
    pub async fn authenticated(server: &TestServer) -> Self {
        Self::authenticated_as(server, TEST_NAME, TEST_EMAIL, TEST_PASS).await
    }

    /// Like `authenticated`, for arbitrary credentials. Runs the whole
    /// signup -> email verification -> login flow.
    pub async fn authenticated_as(
        server: &TestServer,
        name: &str,
        email: &str,
        password: &str,
    ) -> Self {
        let mut client = Self::new(server.base_url.clone());

        let response = client.signup(name, email, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Test user signup failed: {:?}",
            response.text().await
        );

        let token = server
            .mailer
            .last_to(email)
            .expect("No verification mail captured")
            .verification_token()
            .expect("Verification mail carries no token");
        let response = client.verify(&token).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let response = client.login(email, password).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        client.token = Some(body["token"].as_str().unwrap().to_owned());

        client
    }

    /// Replaces the bearer token (e.g. with the one returned by signup).
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /api/auth/signup
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Response {
        self.request(Method::POST, "/api/auth/signup")
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .expect("Signup request failed")
    }

    /// GET /api/auth/verify/{token}
    pub async fn verify(&self, token: &str) -> Response {
        self.request(Method::GET, &format!("/api/auth/verify/{}", token))
            .send()
            .await
            .expect("Verify request failed")
    }

    /// POST /api/auth/login
    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.request(Method::POST, "/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Login request failed")
    }

    // ========================================================================
    // Profile Endpoints
    // ========================================================================

    /// GET /api/user/me
    pub async fn get_me(&self) -> Response {
        self.request(Method::GET, "/api/user/me")
            .send()
            .await
            .expect("Get me request failed")
    }

    /// GET /api/user/{userId}
    pub async fn get_public_user(&self, user_id: &str) -> Response {
        self.request(Method::GET, &format!("/api/user/{}", user_id))
            .send()
            .await
            .expect("Get public user request failed")
    }

    /// PUT /api/user/update
    pub async fn update_name(&self, name: Option<&str>) -> Response {
        let body = match name {
            Some(name) => json!({ "name": name }),
            None => json!({}),
        };
        self.request(Method::PUT, "/api/user/update")
            .json(&body)
            .send()
            .await
            .expect("Update name request failed")
    }

    /// PUT /api/user/update-photo (multipart field `photo`)
    pub async fn update_photo(&self, bytes: Vec<u8>, content_type: &str) -> Response {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("photo.jpg")
            .mime_str(content_type)
            .expect("Bad content type in test");
        let form = reqwest::multipart::Form::new().part("photo", part);
        self.request(Method::PUT, "/api/user/update-photo")
            .multipart(form)
            .send()
            .await
            .expect("Update photo request failed")
    }

    /// PUT a custom multipart form to /api/user/update-photo
    pub async fn update_photo_form(&self, form: reqwest::multipart::Form) -> Response {
        self.request(Method::PUT, "/api/user/update-photo")
            .multipart(form)
            .send()
            .await
            .expect("Update photo request failed")
    }

    /// GET /api/user/{userId}/photo
    pub async fn get_user_photo(&self, user_id: &str) -> Response {
        self.request(Method::GET, &format!("/api/user/{}/photo", user_id))
            .send()
            .await
            .expect("Get user photo request failed")
    }

    // ========================================================================
    // Recent Plays / Likes / Library
    // ========================================================================

    /// POST /api/user/recent
    pub async fn post_recent(&self, song_id: Option<&str>) -> Response {
        let body = match song_id {
            Some(song_id) => json!({ "songId": song_id }),
            None => json!({}),
        };
        self.request(Method::POST, "/api/user/recent")
            .json(&body)
            .send()
            .await
            .expect("Post recent request failed")
    }

    /// GET /api/user/recent
    pub async fn get_recent(&self) -> Response {
        self.request(Method::GET, "/api/user/recent")
            .send()
            .await
            .expect("Get recent request failed")
    }

    /// POST /api/user/like
    pub async fn post_like(&self, song_id: Option<&str>) -> Response {
        let body = match song_id {
            Some(song_id) => json!({ "songId": song_id }),
            None => json!({}),
        };
        self.request(Method::POST, "/api/user/like")
            .json(&body)
            .send()
            .await
            .expect("Post like request failed")
    }

    /// GET /api/user/likes
    pub async fn get_likes(&self) -> Response {
        self.request(Method::GET, "/api/user/likes")
            .send()
            .await
            .expect("Get likes request failed")
    }

    /// POST /api/user/library/{type}
    pub async fn post_library(&self, kind: &str, id: &str) -> Response {
        self.request(Method::POST, &format!("/api/user/library/{}", kind))
            .json(&json!({ "id": id }))
            .send()
            .await
            .expect("Post library request failed")
    }

    /// GET /api/user/library
    pub async fn get_library(&self) -> Response {
        self.request(Method::GET, "/api/user/library")
            .send()
            .await
            .expect("Get library request failed")
    }

    // ========================================================================
    // Self Playlists
    // ========================================================================

    /// POST /api/user/self-playlist
    pub async fn create_playlist(&self, name: Option<&str>, description: Option<&str>) -> Response {
        let mut body = serde_json::Map::new();
        if let Some(name) = name {
            body.insert("name".to_owned(), json!(name));
        }
        if let Some(description) = description {
            body.insert("description".to_owned(), json!(description));
        }
        self.request(Method::POST, "/api/user/self-playlist")
            .json(&serde_json::Value::Object(body))
            .send()
            .await
            .expect("Create playlist request failed")
    }

    /// GET /api/user/self-playlist
    pub async fn get_playlists(&self) -> Response {
        self.request(Method::GET, "/api/user/self-playlist")
            .send()
            .await
            .expect("Get playlists request failed")
    }

    /// POST /api/user/self-playlist/{playlistId}/add
    pub async fn add_song_to_playlist(&self, playlist_id: &str, song_id: &str) -> Response {
        self.request(
            Method::POST,
            &format!("/api/user/self-playlist/{}/add", playlist_id),
        )
        .json(&json!({ "songId": song_id }))
        .send()
        .await
        .expect("Add song to playlist request failed")
    }

    /// DELETE /api/user/self-playlist/{playlistId}
    pub async fn delete_playlist(&self, playlist_id: &str) -> Response {
        self.request(
            Method::DELETE,
            &format!("/api/user/self-playlist/{}", playlist_id),
        )
        .send()
        .await
        .expect("Delete playlist request failed")
    }
}
