//! Common test utilities for meditate integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;

use meditate_core::{Profile, UserId};
use meditate_service::{create_router, AppState, ServiceConfig};
use meditate_store::{MemoryStore, ProfileStore};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for seeding and inspection.
    pub store: Arc<MemoryStore>,
    /// A test user ID for identified requests.
    pub test_user_id: UserId,
    /// The admin API key.
    pub admin_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with an empty store.
    pub fn new() -> Self {
        let admin_api_key = "test-admin-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            admin_api_key: Some(admin_api_key.clone()),
            ..ServiceConfig::default()
        };

        Self::with_config(config, admin_api_key)
    }

    /// Create a harness that rejects request bodies over `max_body_bytes`.
    pub fn with_body_limit(max_body_bytes: usize) -> Self {
        let admin_api_key = "test-admin-key".to_string();

        let config = ServiceConfig {
            admin_api_key: Some(admin_api_key.clone()),
            max_body_bytes,
            ..ServiceConfig::default()
        };

        Self::with_config(config, admin_api_key)
    }

    /// Create a harness whose config has no admin key.
    pub fn without_admin_key() -> Self {
        Self::with_config(ServiceConfig::default(), String::new())
    }

    fn with_config(config: ServiceConfig, admin_api_key: String) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(Arc::clone(&store) as Arc<dyn ProfileStore>, config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            test_user_id: UserId::generate(),
            admin_api_key,
        }
    }

    /// Value for the `x-user-id` header.
    pub fn user_header(&self) -> String {
        self.test_user_id.to_string()
    }

    /// Value for the `x-admin-key` header.
    pub fn admin_key(&self) -> String {
        self.admin_api_key.clone()
    }

    /// Insert a profile for the test user with the given balance.
    pub async fn seed_profile(&self, credits: i64) -> Profile {
        let profile = Profile::new(self.test_user_id.clone(), credits);
        self.store
            .insert_profile(&profile)
            .await
            .expect("Failed to seed profile")
    }

    /// Current stored state of the test user's profile.
    pub async fn stored_profile(&self) -> Option<Profile> {
        self.store
            .get_profile(&self.test_user_id)
            .await
            .expect("Failed to read profile")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
