use crate::lifecycle::LifecycleController;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Reacts to the trigger events the webhook delivers
    pub controller: Arc<LifecycleController>,
}

impl AppState {
    pub fn new(controller: Arc<LifecycleController>) -> Self {
        Self { controller }
    }
}
