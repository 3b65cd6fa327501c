// Configuration surface for the hub and its code cache.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HubConfig {
    // Fixed size of the fan-out worker pool.
    pub worker_count: usize,
    // Deadline applied to each submitted adapter call individually.
    pub unit_deadline: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            worker_count: 8,
            unit_deadline: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    // Codes must outlive a full search -> details -> variants -> book
    // session; two hours covers that with margin.
    pub entry_ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: Duration::from_secs(2 * 60 * 60),
            max_entries: 100_000,
        }
    }
}
