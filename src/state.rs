//! Application state: media store, last generated collection, run slot and orchestrator.
//!
//! This module owns:
//!   - the in-memory media store
//!   - the last generated question collection (what review/export read)
//!   - the single run slot (at most one run in flight)
//!   - the quiz config (prompts + export settings, from TOML or defaults)
//!   - the optional orchestrator (present when a model gateway is configured)

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::config::{load_quiz_config_from_env, QuizConfig};
use crate::domain::QuizItem;
use crate::gateway::ModelGateway;
use crate::gemini::GeminiGateway;
use crate::media::MediaStore;
use crate::orchestrator::{BatchOrchestrator, RunHandle};

pub struct AppState {
    pub media: RwLock<MediaStore>,
    pub questions: RwLock<Vec<QuizItem>>,
    pub orchestrator: Option<BatchOrchestrator>,
    pub config: QuizConfig,
    run_slot: Mutex<Option<Arc<RunHandle>>>,
}

impl AppState {
    /// Build state from env: load config, init the Gemini gateway if a key is present.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_quiz_config_from_env().unwrap_or_default();

        let gateway = GeminiGateway::from_env();
        if let Some(gw) = &gateway {
            info!(target: "safetylens_backend", base_url = %gw.base_url, model = %gw.model, timeout = ?gw.timeout, "Gemini gateway enabled.");
        } else {
            warn!(target: "safetylens_backend", "Gemini gateway disabled (no GEMINI_API_KEY). Generation requests will be refused.");
        }

        Self::with_gateway(gateway.map(|g| Arc::new(g) as Arc<dyn ModelGateway>), config)
    }

    pub fn with_gateway(gateway: Option<Arc<dyn ModelGateway>>, config: QuizConfig) -> Self {
        let orchestrator = gateway.map(|g| BatchOrchestrator::new(g, config.prompts.clone()));
        Self {
            media: RwLock::new(MediaStore::new()),
            questions: RwLock::new(Vec::new()),
            orchestrator,
            config,
            run_slot: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<RunHandle>>> {
        self.run_slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the run slot. Returns None while another run is in flight.
    pub fn try_begin_run(&self, requested: usize) -> Option<RunGuard<'_>> {
        let mut slot = self.slot();
        if slot.is_some() {
            return None;
        }
        let handle = Arc::new(RunHandle::new(requested));
        *slot = Some(handle.clone());
        info!(target: "quiz", run_id = %handle.id, requested, "Run slot claimed");
        Some(RunGuard { state: self, handle })
    }

    pub fn current_run(&self) -> Option<Arc<RunHandle>> {
        self.slot().clone()
    }

    pub fn run_in_flight(&self) -> bool {
        self.slot().is_some()
    }
}

/// Frees the run slot when dropped, including when the awaiting request is abandoned.
pub struct RunGuard<'a> {
    state: &'a AppState,
    handle: Arc<RunHandle>,
}

impl RunGuard<'_> {
    pub fn handle(&self) -> &RunHandle {
        &self.handle
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.state.slot();
        if slot.as_ref().map(|h| h.id) == Some(self.handle.id) {
            *slot = None;
            info!(target: "quiz", run_id = %self.handle.id, "Run slot released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_run_at_a_time() {
        let state = AppState::with_gateway(None, QuizConfig::default());
        assert!(!state.run_in_flight());

        let guard = state.try_begin_run(10).unwrap();
        assert!(state.run_in_flight());
        assert!(state.try_begin_run(5).is_none());
        assert_eq!(state.current_run().unwrap().id, guard.handle().id);

        drop(guard);
        assert!(!state.run_in_flight());
        assert!(state.try_begin_run(5).is_some());
    }
}
