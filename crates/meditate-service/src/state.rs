//! Application state.

use std::sync::Arc;

use meditate_store::ProfileStore;

use crate::config::ServiceConfig;
use crate::ledger::CreditLedger;
use crate::profiles::ProfileService;
use crate::retry::RetryPolicy;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Credit operations.
    pub ledger: CreditLedger,

    /// Profile actions.
    pub profiles: ProfileService,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Wire the ledger and profile service over one shared store.
    #[must_use]
    pub fn new(store: Arc<dyn ProfileStore>, config: ServiceConfig) -> Self {
        let retry = RetryPolicy::with_max_attempts(config.max_write_attempts);

        if config.admin_api_key.is_none() {
            tracing::warn!("ADMIN_API_KEY not set - admin endpoints will reject every request");
        }

        Self {
            ledger: CreditLedger::new(Arc::clone(&store)).with_retry_policy(retry),
            profiles: ProfileService::new(store, config.default_credits).with_retry_policy(retry),
            config,
        }
    }
}
