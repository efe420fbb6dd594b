//! Application state management

use crate::inference::InferenceAdapter;
use chrono::{DateTime, Utc};

/// Shared, read-only state: the model is loaded once at startup
#[derive(Debug, Clone)]
pub struct AppState {
    pub adapter: InferenceAdapter,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(adapter: InferenceAdapter) -> Self {
        Self {
            adapter,
            started_at: Utc::now(),
        }
    }
}
