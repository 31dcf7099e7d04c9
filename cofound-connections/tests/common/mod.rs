#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::Router;
use chrono::Utc;
use uuid::Uuid;

use cofound_connections::config::{AppConfig, StoreBackend};
use cofound_connections::directory::MemoryProfileDirectory;
use cofound_connections::events::RecordingEmitter;
use cofound_connections::models::Profile;
use cofound_connections::services::{LifecycleManager, RetryPolicy};
use cofound_connections::store::MemoryConnectionStore;
use cofound_connections::{build_router, AppState};
use cofound_shared::middleware::JwtKeys;
use cofound_shared::types::auth::Claims;

pub const JWT_SECRET: &str = "test-secret";

pub struct Fixture {
    pub store: Arc<MemoryConnectionStore>,
    pub directory: Arc<MemoryProfileDirectory>,
    pub emitter: Arc<RecordingEmitter>,
    pub state: Arc<AppState>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryConnectionStore::new());
        let directory = Arc::new(MemoryProfileDirectory::new());
        let emitter = Arc::new(RecordingEmitter::new());
        let config = AppConfig {
            jwt_secret: JWT_SECRET.into(),
            store_backend: StoreBackend::Memory,
            retry_base_delay_ms: 0,
            ..AppConfig::default()
        };
        let state = Arc::new(AppState::new(
            config,
            store.clone(),
            directory.clone(),
            emitter.clone(),
            None,
        ));
        Self { store, directory, emitter, state }
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.state.lifecycle
    }

    /// A standalone manager over the same store, for tests that need their
    /// own retry budget.
    pub fn manager_with(&self, retry: RetryPolicy) -> LifecycleManager {
        LifecycleManager::new(self.store.clone(), self.directory.clone(), self.emitter.clone(), retry)
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn add_profile(&self, completed: bool) -> Profile {
        let now = Utc::now();
        let profile = Profile {
            id: Uuid::now_v7(),
            credential_id: Uuid::now_v7(),
            display_name: Some("Founder".into()),
            age: Some(30),
            city: Some("Amsterdam".into()),
            country: Some("NL".into()),
            looking_for: Some("business co-founder".into()),
            interests: BTreeSet::from(["climate".to_string(), "saas".to_string()]),
            avatar_url: None,
            profile_completed: completed,
            created_at: now,
            updated_at: now,
        };
        self.directory.upsert(profile.clone());
        profile
    }

    pub fn token_for(&self, profile: &Profile) -> String {
        JwtKeys::new(JWT_SECRET)
            .sign(&Claims::new(profile.credential_id, 3600))
            .expect("sign test token")
    }
}
