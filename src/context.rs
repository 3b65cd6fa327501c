// Request-scoped context. Every fan-out worker receives an immutable
// snapshot taken at submission time; nothing here is propagated through
// ambient or global state.

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub organization: Option<String>,
    // Per-organization enabled-provider set; empty means unconfigured.
    pub enabled_providers: Vec<String>,
    pub locale: String,
    pub test_mode: bool,
    pub correlation_id: String,
}

impl RequestContext {
    // Context for anonymous or unconfigured callers; these resolve to the
    // registry's default adapter.
    pub fn anonymous() -> Self {
        Self {
            organization: None,
            enabled_providers: Vec::new(),
            locale: "en".to_string(),
            test_mode: false,
            correlation_id: new_correlation_id(),
        }
    }

    pub fn for_organization(organization: &str, enabled_providers: Vec<String>) -> Self {
        Self {
            organization: Some(organization.to_string()),
            enabled_providers,
            locale: "en".to_string(),
            test_mode: false,
            correlation_id: new_correlation_id(),
        }
    }

    pub(crate) fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }
}

fn new_correlation_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}
