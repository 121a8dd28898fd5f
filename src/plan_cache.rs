//! Compiled plan cache
//!
//! Shares compiled [`AssemblyPlan`]s between executions of the same mapping
//! against the same result shape, so a mapping is compiled once no matter how
//! many times (or by how many callers) it is declared.
//!
//! # Architecture
//!
//! Cache Key: (normalized mapping, raw column descriptors)
//! Cache Value: `Arc<AssemblyPlan>`
//!
//! Keys compare structurally: two mappings authored independently that
//! describe the same tree share one entry. Compilation happens outside the
//! lock; two callers racing on the same key both compile and the last insert
//! wins. Failed compilations are never stored.
//!
//! # Configuration
//!
//! Environment variables:
//! - `FETCHPLAN_PLAN_CACHE_ENABLED` (default: true)
//! - `FETCHPLAN_PLAN_CACHE_MAX_ENTRIES` (default: 1000)
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::assembly::plan::AssemblyPlan;
use crate::domain_model::DomainModelLookup;
use crate::mapping::cache_key::ResultSetMappingKey;
use crate::mapping::errors::Result;
use crate::mapping::result_set_mapping::ResultSetMapping;
use crate::result_metadata::{ColumnDescriptor, ResultSetMetadata};

/// Key for cache lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanCacheKey {
    /// Normalized mapping tree
    pub mapping: ResultSetMappingKey,
    /// Raw result columns, in result order
    pub columns: Vec<ColumnDescriptor>,
}

impl PlanCacheKey {
    pub fn new(mapping: &ResultSetMapping, metadata: &ResultSetMetadata) -> Self {
        PlanCacheKey {
            mapping: mapping.cache_key_form(),
            columns: metadata.columns().to_vec(),
        }
    }
}

/// Cached entry with metadata
#[derive(Debug, Clone)]
struct CacheEntry {
    plan: Arc<AssemblyPlan>,
    /// Logical access tick (for LRU)
    last_accessed: u64,
}

/// Configuration for the plan cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCacheConfig {
    /// Enable or disable caching
    pub enabled: bool,
    /// Maximum number of entries (LRU eviction)
    pub max_entries: usize,
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        PlanCacheConfig {
            enabled: true,
            max_entries: 1000,
        }
    }
}

impl PlanCacheConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let enabled = std::env::var("FETCHPLAN_PLAN_CACHE_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.enabled);

        let max_entries = std::env::var("FETCHPLAN_PLAN_CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_entries);

        PlanCacheConfig {
            enabled,
            max_entries,
        }
    }
}

/// Plan cache with LRU eviction
pub struct PlanCache {
    cache: Mutex<HashMap<PlanCacheKey, CacheEntry>>,
    config: PlanCacheConfig,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PlanCache {
    pub fn new(config: PlanCacheConfig) -> Self {
        PlanCache {
            cache: Mutex::new(HashMap::new()),
            config,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PlanCacheConfig::default())
    }

    pub fn from_env() -> Self {
        Self::new(PlanCacheConfig::from_env())
    }

    pub fn config(&self) -> &PlanCacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PlanCacheKey, CacheEntry>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Get a compiled plan from the cache
    pub fn get(&self, key: &PlanCacheKey) -> Option<Arc<AssemblyPlan>> {
        if !self.config.enabled {
            return None;
        }

        let now = self.tick();
        let mut cache = self.lock();
        if let Some(entry) = cache.get_mut(key) {
            entry.last_accessed = now;
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(entry.plan.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Insert a compiled plan, evicting the least recently used entry when full
    pub fn insert(&self, key: PlanCacheKey, plan: Arc<AssemblyPlan>) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }

        let entry = CacheEntry {
            plan,
            last_accessed: self.tick(),
        };

        let mut cache = self.lock();
        if !cache.contains_key(&key) && cache.len() >= self.config.max_entries {
            self.evict_lru(&mut cache);
        }
        cache.insert(key, entry);
    }

    fn evict_lru(&self, cache: &mut HashMap<PlanCacheKey, CacheEntry>) {
        if let Some(key) = cache
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone())
        {
            cache.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            log::debug!(
                "Evicted plan for {} result(s) over {} column(s)",
                key.mapping.results.len(),
                key.columns.len()
            );
        }
    }

    /// Return the cached plan for `mapping`, compiling and caching it on a miss.
    pub fn get_or_compile(
        &self,
        mapping: &ResultSetMapping,
        model: &dyn DomainModelLookup,
        metadata: &ResultSetMetadata,
    ) -> Result<Arc<AssemblyPlan>> {
        let key = PlanCacheKey::new(mapping, metadata);
        if let Some(plan) = self.get(&key) {
            log::debug!("Plan cache hit");
            return Ok(plan);
        }

        let plan = Arc::new(mapping.compile(model, metadata)?);
        self.insert(key, plan.clone());
        Ok(plan)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clear entire cache
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Get cache metrics
    pub fn metrics(&self) -> CacheMetrics {
        let size = self.lock().len();

        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size,
            max_entries: self.config.max_entries,
        }
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, PartialEq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate entry utilization (0.0 to 1.0)
    pub fn entry_utilization(&self) -> f64 {
        if self.max_entries == 0 {
            0.0
        } else {
            self.size as f64 / self.max_entries as f64
        }
    }
}
