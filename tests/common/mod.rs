//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Once;

use chrono::Utc;
use socialcore::data::{Account, EntityId, Status, Visibility};
use socialcore::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

static INIT_METRICS: Once = Once::new();

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        INIT_METRICS.call_once(socialcore::metrics::init_metrics);

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "test.example.com".to_string(),
                protocol: "https".to_string(),
            },
            database: config::DatabaseConfig { path: db_path },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            announcements: config::AnnouncementConfig {
                scheduler_enabled: false,
                publish_interval_seconds: 60,
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = socialcore::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create an account together with a bearer token for it
    pub async fn create_account_with_token(
        &self,
        username: &str,
        is_admin: bool,
    ) -> (Account, String) {
        let account = self
            .state
            .db
            .create_account(username, is_admin)
            .await
            .unwrap();
        let token = format!("token-{}", account.id);
        self.state
            .db
            .insert_access_token(&account.id, &token)
            .await
            .unwrap();
        (account, token)
    }

    /// Create a status authored by `author`
    pub async fn create_status(&self, author: &Account, visibility: Visibility) -> Status {
        let status = Status {
            id: EntityId::new().0,
            account_id: author.id.clone(),
            content: "<p>Test status</p>".to_string(),
            visibility,
            created_at: Utc::now(),
        };
        self.state.db.insert_status(&status).await.unwrap();
        status
    }

    /// POST with a bearer token and no body
    pub async fn post_as(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }
}
