//! Deduplicating cache of visit page fetches
//!
//! One screen session owns one cache. Concurrent requests for the same key
//! share a single in-flight fetch; settled pages are kept until invalidated
//! or evicted.

use std::collections::HashMap;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use crate::{
    error::AppResult,
    models::{FilterState, PageResult},
    repository::VisitSearch,
};

use super::strategy::DataSourceStrategy;

/// Cache identity: the active strategy plus exactly the fields it consumes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub strategy: DataSourceStrategy,
    pub search: VisitSearch,
}

impl QueryKey {
    /// Key of the page `filters` currently point at, `None` for a disabled strategy
    pub fn for_filters(strategy: DataSourceStrategy, filters: &FilterState) -> Option<Self> {
        strategy
            .current_page_search(filters)
            .map(|search| Self { strategy, search })
    }
}

type SharedFetch = Shared<BoxFuture<'static, AppResult<PageResult>>>;

enum Slot {
    Pending { id: u64, fetch: SharedFetch },
    Ready { page: PageResult, stored_seq: u64 },
}

/// State of a key in the cache
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Ready(PageResult),
    Pending,
    Absent,
}

struct Slots {
    next_id: u64,
    entries: HashMap<QueryKey, Slot>,
}

pub struct QueryCache {
    max_entries: usize,
    slots: Mutex<Slots>,
}

impl QueryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            slots: Mutex::new(Slots {
                next_id: 0,
                entries: HashMap::new(),
            }),
        }
    }

    pub async fn get(&self, key: &QueryKey) -> CacheLookup {
        let slots = self.slots.lock().await;
        match slots.entries.get(key) {
            Some(Slot::Ready { page, .. }) => CacheLookup::Ready(page.clone()),
            Some(Slot::Pending { .. }) => CacheLookup::Pending,
            None => CacheLookup::Absent,
        }
    }

    /// Return the page for `key`, calling `load` only when no settled page and
    /// no in-flight fetch exist for it.
    ///
    /// Failed fetches are not cached. A key invalidated while its fetch is in
    /// flight still resolves for the callers already waiting, but the page is
    /// not stored.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, load: F) -> AppResult<PageResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<PageResult>> + Send + 'static,
    {
        let (id, fetch) = {
            let mut slots = self.slots.lock().await;
            match slots.entries.get(&key) {
                Some(Slot::Ready { page, .. }) => return Ok(page.clone()),
                Some(Slot::Pending { id, fetch }) => (*id, fetch.clone()),
                None => {
                    let id = slots.next_id;
                    slots.next_id += 1;
                    let fetch = load().boxed().shared();
                    slots.entries.insert(
                        key.clone(),
                        Slot::Pending {
                            id,
                            fetch: fetch.clone(),
                        },
                    );
                    (id, fetch)
                }
            }
        };

        let result = fetch.await;

        let mut slots = self.slots.lock().await;
        let still_ours = matches!(
            slots.entries.get(&key),
            Some(Slot::Pending { id: current, .. }) if *current == id
        );
        if still_ours {
            match &result {
                Ok(page) => {
                    let stored_seq = slots.next_id;
                    slots.next_id += 1;
                    slots.entries.insert(
                        key,
                        Slot::Ready {
                            page: page.clone(),
                            stored_seq,
                        },
                    );
                    self.evict(&mut slots.entries);
                }
                Err(_) => {
                    slots.entries.remove(&key);
                }
            }
        }
        result
    }

    /// Drop every entry whose key matches `predicate`, pending ones included
    pub async fn invalidate<P>(&self, predicate: P) -> usize
    where
        P: Fn(&QueryKey) -> bool,
    {
        let mut slots = self.slots.lock().await;
        let before = slots.entries.len();
        slots.entries.retain(|key, _| !predicate(key));
        let removed = before - slots.entries.len();
        if removed > 0 {
            tracing::debug!("Invalidated {} cached visit queries", removed);
        }
        removed
    }

    /// Drop every entry issued under `strategy`
    pub async fn invalidate_strategy(&self, strategy: DataSourceStrategy) -> usize {
        self.invalidate(|key| key.strategy == strategy).await
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn evict(&self, entries: &mut HashMap<QueryKey, Slot>) {
        while entries.len() > self.max_entries {
            let oldest = entries
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready { stored_seq, .. } => Some((key, *stored_seq)),
                    Slot::Pending { .. } => None,
                })
                .min_by_key(|(_, stored_seq)| *stored_seq)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }
}
