//! Test server lifecycle management
//!
//! Each test gets an isolated server on a random port with its own SQLite
//! database, a mail recorder instead of a real mail integration, and a fake
//! image host.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;
use tokio::net::TcpListener;

use mellow_server::image_host::ImageHost;
use mellow_server::mailer::Mailer;
use mellow_server::server::RequestsLoggingLevel;
use mellow_server::{make_app, ServerConfig, SqliteUserStore, UserStore};

use super::constants::*;

/// A mail captured by the recording mailer.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl SentMail {
    /// Pulls the verification token out of the mail's link.
    pub fn verification_token(&self) -> Option<String> {
        let marker = "/api/auth/verify/";
        let start = self.body.find(marker)? + marker.len();
        let rest = &self.body[start..];
        let end = rest.find('"').unwrap_or(rest.len());
        Some(rest[..end].to_string())
    }
}

/// Records outgoing mail instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_to(&self, to: &str) -> Option<SentMail> {
        self.sent()
            .into_iter()
            .rev()
            .find(|mail| mail.to == to)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_owned(),
            subject: subject.to_owned(),
            body: html_body.to_owned(),
        });
        Ok(())
    }
}

/// Answers every upload with a deterministic public URL.
#[derive(Default)]
pub struct FakeImageHost {
    uploads: Mutex<usize>,
}

#[async_trait]
impl ImageHost for FakeImageHost {
    async fn upload(&self, _bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        *uploads += 1;
        Ok(format!("https://img.example.com/u/{}.jpg", uploads))
    }
}

/// Test server instance with an isolated database.
///
/// When dropped, the server shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// User store for direct database access in tests
    pub user_store: Arc<SqliteUserStore>,

    /// Captured outgoing mail
    pub mailer: Arc<RecordingMailer>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port and waits until it
    /// answers requests.
    pub async fn spawn() -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_db_dir.path().join("user.db");

        let user_store =
            Arc::new(SqliteUserStore::new(&db_path).expect("Failed to open user store"));
        let mailer = Arc::new(RecordingMailer::default());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            public_base_url: base_url.clone(),
            frontend_dir_path: None,
        };

        let app = make_app(
            config,
            user_store.clone() as Arc<dyn UserStore>,
            TEST_JWT_SECRET,
            mailer.clone(),
            Some(Arc::new(FakeImageHost::default()) as Arc<dyn ImageHost>),
        )
        .expect("Failed to build app");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server crashed");
        });

        let server = Self {
            base_url,
            port,
            user_store,
            mailer,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_until_ready().await;
        server
    }

    async fn wait_until_ready(&self) {
        let client = reqwest::Client::new();
        let deadline =
            std::time::Instant::now() + Duration::from_millis(SERVER_READY_TIMEOUT_MS);
        loop {
            if let Ok(response) = client.get(&self.base_url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            if std::time::Instant::now() > deadline {
                panic!("Test server did not become ready in time");
            }
            tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
        }
    }
}
