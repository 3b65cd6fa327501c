// Code-indirection cache. Every normalization event mints a short opaque
// code and stores the provider identity plus the product state needed to
// service the client's follow-up calls. Codes are random, not sequential,
// so they cannot be guessed or enumerated across providers.

use crate::config::CacheConfig;
use crate::model::{ClientProduct, ProviderProduct};
use crate::money::Money;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

pub const CODE_LEN: usize = 12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("unknown or expired code {0:?}")]
    CodeNotFound(String),
}

// Everything needed to route a follow-up call back to the provider that
// produced the result. Never crosses the cache/orchestrator boundary into
// a client-facing response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub provider: String,
    pub native_id: String,
    pub price: Money,
    pub provider_product: ProviderProduct,
    pub client_product: ClientProduct,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedVariant {
    pub code: String,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub capacity: u32,
    pub extra: Value,
}

impl CachedVariant {
    // Structural identity: same code, name and price are the same variant
    // no matter which time bucket surfaced it.
    pub fn identity(&self) -> (&str, &str, &Money) {
        (&self.code, &self.name, &self.price)
    }
}

struct Slot {
    entry: CacheEntry,
    created_at: Instant,
}

struct VariantSlot {
    variants: Vec<CachedVariant>,
    created_at: Instant,
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub inserts: AtomicUsize,
    pub hits: AtomicUsize,
    pub misses: AtomicUsize,
    pub expired: AtomicUsize,
    pub evicted: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub entries: usize,
    pub inserts: usize,
    pub hits: usize,
    pub misses: usize,
    pub expired: usize,
    pub evicted: usize,
}

pub struct CodeCache {
    config: CacheConfig,
    products: DashMap<String, Slot>,
    variants: DashMap<(String, NaiveDate), VariantSlot>,
    // Insertion order, for capacity eviction. Codes removed elsewhere are
    // skipped when popped.
    insertion_log: Mutex<VecDeque<String>>,
    stats: CacheStats,
}

impl CodeCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            products: DashMap::new(),
            variants: DashMap::new(),
            insertion_log: Mutex::new(VecDeque::new()),
            stats: CacheStats::default(),
        }
    }

    // Mint a fresh opaque code and store one entry under it. The client
    // product is returned with its code filled in; at that moment exactly
    // one live entry exists for it.
    pub fn register(
        &self,
        provider: &str,
        provider_product: ProviderProduct,
        mut client_product: ClientProduct,
        price: Money,
    ) -> ClientProduct {
        let mut slot = Slot {
            entry: CacheEntry {
                provider: provider.to_string(),
                native_id: provider_product.native_id.clone(),
                price,
                provider_product,
                client_product: client_product.clone(),
            },
            created_at: Instant::now(),
        };

        let code = loop {
            let candidate = random_code();
            slot.entry.client_product.code = candidate.clone();
            // Collision over the retention window is negligible with
            // 62^12 codes; re-draw rather than overwrite.
            match self.try_insert(candidate.clone(), slot) {
                Ok(()) => break candidate,
                Err(returned) => slot = returned,
            }
        };
        client_product.code = code.clone();

        self.stats.inserts.fetch_add(1, Ordering::Relaxed);
        self.insertion_log.lock().push_back(code);
        self.enforce_capacity();
        client_product
    }

    fn try_insert(&self, code: String, slot: Slot) -> Result<(), Slot> {
        match self.products.entry(code) {
            Entry::Occupied(_) => Err(slot),
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                Ok(())
            }
        }
    }

    pub fn resolve(&self, code: &str) -> Result<CacheEntry, CacheError> {
        if let Some(slot) = self.products.get(code) {
            if slot.created_at.elapsed() > self.config.entry_ttl {
                drop(slot);
                self.products.remove(code);
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return Err(CacheError::CodeNotFound(code.to_string()));
            }
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(slot.entry.clone());
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        Err(CacheError::CodeNotFound(code.to_string()))
    }

    // Replace the variant set for (code, date) with a freshly fetched one.
    // Callers hand over an already deduplicated set; a repeated fetch is a
    // newer truth, not a merge.
    pub fn put_variants(&self, code: &str, date: NaiveDate, variants: Vec<CachedVariant>) {
        debug!(code, %date, count = variants.len(), "caching variant set");
        self.variants.insert(
            (code.to_string(), date),
            VariantSlot {
                variants,
                created_at: Instant::now(),
            },
        );
    }

    pub fn variants(&self, code: &str, date: NaiveDate) -> Option<Vec<CachedVariant>> {
        let key = (code.to_string(), date);
        let slot = self.variants.get(&key)?;
        if slot.created_at.elapsed() > self.config.entry_ttl {
            drop(slot);
            self.variants.remove(&key);
            self.stats.expired.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        Some(slot.variants.clone())
    }

    pub fn find_variant(
        &self,
        code: &str,
        date: NaiveDate,
        variant_code: &str,
    ) -> Result<CachedVariant, CacheError> {
        self.variants(code, date)
            .and_then(|variants| {
                variants.into_iter().find(|v| v.code == variant_code)
            })
            .ok_or_else(|| CacheError::CodeNotFound(variant_code.to_string()))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            entries: self.products.len(),
            inserts: self.stats.inserts.load(Ordering::Relaxed),
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            expired: self.stats.expired.load(Ordering::Relaxed),
            evicted: self.stats.evicted.load(Ordering::Relaxed),
        }
    }

    // Oldest-insertion-first eviction once the capacity bound is crossed.
    // Entries already expired or removed just drain from the log.
    fn enforce_capacity(&self) {
        while self.products.len() > self.config.max_entries {
            let oldest = self.insertion_log.lock().pop_front();
            match oldest {
                Some(code) => {
                    if self.products.remove(&code).is_some() {
                        self.stats.evicted.fetch_add(1, Ordering::Relaxed);
                        debug!(code = %code, "evicted oldest cache entry");
                    }
                }
                None => break,
            }
        }
    }
}

fn random_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(char::from)
        .collect()
}
