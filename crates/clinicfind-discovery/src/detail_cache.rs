//! Lazy, key-deduplicated doctor roster cache.
//!
//! [`DetailCache::ensure`] fetches a clinic's roster at most once while a
//! fetch is outstanding or has succeeded. Concurrent callers for the same
//! clinic share one in-flight future. Failures are recorded but not memoized:
//! the next `ensure` for that clinic fetches again.
//!
//! ```text
//! ensure(c1) ─┐
//! ensure(c1) ─┼──► DetailCache ──► one spawned fetch ──► RosterSource
//! ensure(c1) ─┘        │                   │
//!                      ▼                   ▼
//!               all callers get     entry: Pending → Resolved | Failed
//!               the same result
//! ```
//!
//! The fetch runs as a spawned task, so it completes and populates the cache
//! even if every caller stops waiting. Invalidating a pending entry marks it
//! stale instead of removing it: later callers still join the outstanding
//! fetch, and its result is dropped rather than written back.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use clinicfind_client::{ClientError, ClinicApiClient};
use clinicfind_core::{ClinicId, DoctorDetail};

use crate::error::EnrichmentFailed;

type RosterResult = Result<Arc<[DoctorDetail]>, EnrichmentFailed>;
type PendingRoster = Shared<BoxFuture<'static, RosterResult>>;

/// Where rosters come from. Implemented for the HTTP client and for test fakes.
pub trait RosterSource: Send + Sync + 'static {
    fn fetch_roster(
        &self,
        clinic_id: &ClinicId,
    ) -> impl Future<Output = Result<Vec<DoctorDetail>, ClientError>> + Send;
}

impl RosterSource for ClinicApiClient {
    async fn fetch_roster(&self, clinic_id: &ClinicId) -> Result<Vec<DoctorDetail>, ClientError> {
        self.fetch_doctor_roster(clinic_id).await
    }
}

enum CacheEntry {
    Pending {
        generation: u64,
        roster: PendingRoster,
        stale: bool,
    },
    Resolved(Arc<[DoctorDetail]>),
    Failed {
        reason: String,
    },
}

/// Public view of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Pending,
    Resolved { doctors: usize },
    Failed { reason: String },
}

/// Counters for monitoring how much work the cache saves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls to [`DetailCache::ensure`].
    pub requests: u64,
    /// Requests answered from a resolved entry.
    pub hits: u64,
    /// Requests that joined an in-flight fetch.
    pub coalesced: u64,
    /// Fetches actually issued.
    pub fetches: u64,
}

/// Resolved rosters at one point in time, keyed by clinic.
///
/// Facet aggregation and filtering read this instead of the live cache so
/// one recomputation always sees a consistent set.
#[derive(Debug, Clone, Default)]
pub struct DetailSnapshot {
    rosters: HashMap<ClinicId, Arc<[DoctorDetail]>>,
}

impl DetailSnapshot {
    #[must_use]
    pub fn get(&self, clinic_id: &ClinicId) -> Option<&[DoctorDetail]> {
        self.rosters.get(clinic_id).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rosters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rosters.is_empty()
    }
}

impl FromIterator<(ClinicId, Vec<DoctorDetail>)> for DetailSnapshot {
    fn from_iter<T: IntoIterator<Item = (ClinicId, Vec<DoctorDetail>)>>(iter: T) -> Self {
        Self {
            rosters: iter
                .into_iter()
                .map(|(id, doctors)| (id, Arc::from(doctors)))
                .collect(),
        }
    }
}

/// Session-scoped roster cache. Share it behind an `Arc` across tasks.
pub struct DetailCache<R> {
    source: Arc<R>,
    entries: Arc<Mutex<HashMap<ClinicId, CacheEntry>>>,
    next_generation: AtomicU64,
    requests: AtomicU64,
    hits: AtomicU64,
    coalesced: AtomicU64,
    fetches: AtomicU64,
}

impl<R: RosterSource> DetailCache<R> {
    pub fn new(source: R) -> Self {
        Self::with_shared_source(Arc::new(source))
    }

    pub fn with_shared_source(source: Arc<R>) -> Self {
        Self {
            source,
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    /// Returns the clinic's detailed roster, fetching it if nothing is
    /// resolved or in flight.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichmentFailed`] if the fetch this call started or joined
    /// failed. The entry is left `Failed` and a later call retries.
    pub async fn ensure(
        &self,
        clinic_id: &ClinicId,
    ) -> Result<Arc<[DoctorDetail]>, EnrichmentFailed> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let pending = {
            let mut entries = lock(&self.entries);
            match entries.get(clinic_id) {
                Some(CacheEntry::Resolved(doctors)) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Arc::clone(doctors));
                }
                Some(CacheEntry::Pending { roster, .. }) => {
                    self.coalesced.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(clinic_id = %clinic_id, "joining in-flight roster fetch");
                    roster.clone()
                }
                Some(CacheEntry::Failed { .. }) | None => {
                    self.fetches.fetch_add(1, Ordering::Relaxed);
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(clinic_id = %clinic_id, generation, "starting roster fetch");
                    // The lock is still held, so the task cannot settle before
                    // the pending entry exists.
                    let roster = self.spawn_fetch(clinic_id.clone(), generation);
                    entries.insert(
                        clinic_id.clone(),
                        CacheEntry::Pending {
                            generation,
                            roster: roster.clone(),
                            stale: false,
                        },
                    );
                    roster
                }
            }
        };

        pending.await
    }

    fn spawn_fetch(&self, clinic_id: ClinicId, generation: u64) -> PendingRoster {
        let source = Arc::clone(&self.source);
        let entries = Arc::clone(&self.entries);
        let task_id = clinic_id.clone();
        let task_entries = Arc::clone(&entries);

        let handle = tokio::spawn(async move {
            let result = match source.fetch_roster(&task_id).await {
                Ok(doctors) => Ok(Arc::<[DoctorDetail]>::from(doctors)),
                Err(err) => Err(EnrichmentFailed {
                    clinic_id: task_id.clone(),
                    reason: err.to_string(),
                }),
            };
            settle(&task_entries, &task_id, generation, &result);
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    let result = Err(EnrichmentFailed {
                        clinic_id: clinic_id.clone(),
                        reason: format!("roster task did not complete: {join_err}"),
                    });
                    settle(&entries, &clinic_id, generation, &result);
                    result
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Drops the entry for one clinic.
    ///
    /// A pending entry stays in place, marked stale, until its fetch
    /// finishes: callers in the meantime join that fetch instead of starting
    /// another, and its result is discarded.
    ///
    /// Returns `true` if an entry existed.
    pub fn invalidate(&self, clinic_id: &ClinicId) -> bool {
        let mut entries = lock(&self.entries);
        let existed = match entries.get_mut(clinic_id) {
            Some(CacheEntry::Pending { stale, .. }) => {
                *stale = true;
                true
            }
            Some(_) => {
                entries.remove(clinic_id);
                true
            }
            None => false,
        };
        if existed {
            tracing::debug!(clinic_id = %clinic_id, "roster cache entry invalidated");
        }
        existed
    }

    /// Drops every entry. Pending entries are marked stale, as with
    /// [`DetailCache::invalidate`].
    pub fn clear(&self) {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|_, entry| match entry {
            CacheEntry::Pending { stale, .. } => {
                *stale = true;
                true
            }
            CacheEntry::Resolved(_) | CacheEntry::Failed { .. } => false,
        });
        tracing::debug!(
            dropped = before - entries.len(),
            in_flight = entries.len(),
            "roster cache cleared"
        );
    }

    #[must_use]
    pub fn state(&self, clinic_id: &ClinicId) -> Option<EntryState> {
        lock(&self.entries).get(clinic_id).map(|entry| match entry {
            CacheEntry::Pending { .. } => EntryState::Pending,
            CacheEntry::Resolved(doctors) => EntryState::Resolved {
                doctors: doctors.len(),
            },
            CacheEntry::Failed { reason } => EntryState::Failed {
                reason: reason.clone(),
            },
        })
    }

    /// Copies out every resolved roster.
    #[must_use]
    pub fn snapshot(&self) -> DetailSnapshot {
        let entries = lock(&self.entries);
        DetailSnapshot {
            rosters: entries
                .iter()
                .filter_map(|(id, entry)| match entry {
                    CacheEntry::Resolved(doctors) => Some((id.clone(), Arc::clone(doctors))),
                    CacheEntry::Pending { .. } | CacheEntry::Failed { .. } => None,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        tracing::info!(
            requests = stats.requests,
            hits = stats.hits,
            coalesced = stats.coalesced,
            fetches = stats.fetches,
            entries = lock(&self.entries).len(),
            "roster cache statistics"
        );
    }
}

/// Writes a finished fetch back, unless the entry was invalidated or replaced.
fn settle(
    entries: &Mutex<HashMap<ClinicId, CacheEntry>>,
    clinic_id: &ClinicId,
    generation: u64,
    result: &RosterResult,
) {
    let mut entries = lock(entries);
    match entries.get(clinic_id) {
        Some(CacheEntry::Pending {
            generation: g,
            stale: false,
            ..
        }) if *g == generation => {}
        Some(CacheEntry::Pending {
            generation: g,
            stale: true,
            ..
        }) if *g == generation => {
            entries.remove(clinic_id);
            tracing::debug!(
                clinic_id = %clinic_id,
                generation,
                "discarding invalidated roster result"
            );
            return;
        }
        _ => {
            tracing::debug!(clinic_id = %clinic_id, generation, "discarding stale roster result");
            return;
        }
    }

    let entry = match result {
        Ok(doctors) => {
            tracing::debug!(clinic_id = %clinic_id, doctors = doctors.len(), "roster resolved");
            CacheEntry::Resolved(Arc::clone(doctors))
        }
        Err(err) => {
            tracing::warn!(
                clinic_id = %clinic_id,
                reason = %err.reason,
                "roster enrichment failed"
            );
            CacheEntry::Failed {
                reason: err.reason.clone(),
            }
        }
    };
    entries.insert(clinic_id.clone(), entry);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "detail_cache_test.rs"]
mod tests;
