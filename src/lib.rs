pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod store;
pub mod timer;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::services::{session_registry::SessionRegistry, session_service::SessionService};
use crate::store::{CandidateStore, FixtureCandidateStore, FixtureQuestionStore, QuestionStore};

#[derive(Clone)]
pub struct AppState {
    pub session_service: SessionService,
    pub registry: SessionRegistry,
}

impl AppState {
    /// State backed by the built-in fixture stores.
    pub fn new(config: &Config) -> Self {
        Self::with_stores(
            Arc::new(FixtureCandidateStore::seeded(config.provider_delay)),
            Arc::new(FixtureQuestionStore::seeded(config.provider_delay)),
        )
    }

    pub fn with_stores(
        candidates: Arc<dyn CandidateStore>,
        questions: Arc<dyn QuestionStore>,
    ) -> Self {
        let session_service = SessionService::new(candidates, questions);
        let registry = SessionRegistry::new(session_service.clone());
        Self {
            session_service,
            registry,
        }
    }
}
