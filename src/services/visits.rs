//! Visit list engine: per-screen filter state, cached page queries and exports

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use utoipa::ToSchema;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{
        Caller, ColumnKey, FilterPatch, FilterState, NavigationContext, PageResult, SortColumn,
        SortDirection, VisitRow,
    },
    repository::{Repository, VisitSearch},
};

use super::{
    crawler::PageCrawl,
    export::{CsvExporter, CsvFile},
    persistence::PersistenceAdapter,
    query_cache::{QueryCache, QueryKey},
    strategy::DataSourceStrategy,
};

/// What the visit screen shows
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitBoard {
    pub session_id: String,
    pub filters: FilterState,
    /// Active data source: `direct`, `team:<id>` or `disabled`
    pub strategy: String,
    pub rows: Vec<VisitRow>,
    pub total_pages: u32,
    pub last: bool,
    /// The current filters' page has not arrived yet; rows belong to the previous one
    pub pending: bool,
    /// Rows come from the navigation context lookup rather than the filters
    pub from_navigation: bool,
}

/// Which cached pages a filter change makes stale
enum Invalidation {
    /// Everything fetched under the active strategy
    Strategy,
    /// The page the new filters point at
    TargetKey,
    None,
}

struct ScreenSession {
    filters: FilterState,
    cache: Arc<QueryCache>,
    /// Key of the most recently issued interactive query
    active_key: Option<QueryKey>,
    displayed: Option<PageResult>,
    displayed_key: Option<QueryKey>,
    /// Navigation context result, shown until the user changes anything
    navigation_result: Option<PageResult>,
    last_seen: Instant,
}

impl ScreenSession {
    fn new(filters: FilterState, cache_max_entries: usize) -> Self {
        Self {
            filters,
            cache: Arc::new(QueryCache::new(cache_max_entries)),
            active_key: None,
            displayed: None,
            displayed_key: None,
            navigation_result: None,
            last_seen: Instant::now(),
        }
    }

    fn board(&self, session_id: &str, strategy: DataSourceStrategy) -> VisitBoard {
        let (page, from_navigation) = match &self.navigation_result {
            Some(page) => (Some(page), true),
            None => (self.displayed.as_ref(), false),
        };
        let pending = !from_navigation
            && self.active_key.is_some()
            && self.active_key != self.displayed_key;

        VisitBoard {
            session_id: session_id.to_string(),
            filters: self.filters.clone(),
            strategy: strategy.to_string(),
            rows: page
                .map(|p| p.content.iter().cloned().map(VisitRow::from).collect())
                .unwrap_or_default(),
            total_pages: page.map(|p| p.total_pages).unwrap_or(0),
            last: page.map(|p| p.last).unwrap_or(true),
            pending,
            from_navigation,
        }
    }
}

type SessionMap = HashMap<String, Arc<Mutex<ScreenSession>>>;

#[derive(Clone)]
pub struct VisitsService {
    repository: Repository,
    persistence: Arc<dyn PersistenceAdapter>,
    exporter: CsvExporter,
    sessions: Arc<RwLock<SessionMap>>,
    cache_max_entries: usize,
    export_page_size: u32,
    export_max_pages: u32,
    /// `None` keeps screens until they are unmounted
    idle_ttl: Option<Duration>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl VisitsService {
    pub fn new(
        repository: Repository,
        persistence: Arc<dyn PersistenceAdapter>,
        config: &AppConfig,
    ) -> Self {
        Self {
            repository,
            persistence,
            exporter: CsvExporter::new(config.export.file_name.clone()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            cache_max_entries: config.cache.max_entries,
            export_page_size: config.export.effective_page_size(),
            export_max_pages: config.export.max_pages,
            idle_ttl: match config.session.idle_ttl_seconds {
                0 => None,
                seconds => Some(Duration::from_secs(seconds)),
            },
        }
    }

    /// Look up a mounted screen and mark it as recently used
    async fn session(&self, session_id: &str) -> AppResult<Arc<Mutex<ScreenSession>>> {
        let session = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("No mounted visit screen for session {}", session_id))
            })?;
        session.lock().await.last_seen = Instant::now();
        Ok(session)
    }

    /// Whether `session` is still the mounted screen for `session_id`
    async fn is_mounted(&self, session_id: &str, session: &Arc<Mutex<ScreenSession>>) -> bool {
        self.sessions
            .read()
            .await
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, session))
    }

    /// Number of mounted screens
    pub async fn mounted_screens(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Persist and drop every screen untouched for longer than the idle TTL.
    /// Navigation contexts are left for the next mount.
    pub async fn evict_idle(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };

        let mounted: Vec<(String, Arc<Mutex<ScreenSession>>)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, session)| (id.clone(), session.clone()))
            .collect();

        let mut evicted = 0;
        for (session_id, session) in mounted {
            let filters = {
                let mut sessions = self.sessions.write().await;
                let still_mounted = sessions
                    .get(&session_id)
                    .is_some_and(|current| Arc::ptr_eq(current, &session));
                if !still_mounted {
                    continue;
                }
                let screen = session.lock().await;
                if screen.last_seen.elapsed() < ttl {
                    continue;
                }
                let filters = screen.filters.clone();
                sessions.remove(&session_id);
                filters
            };

            if let Err(e) = self.persistence.persist(&session_id, &filters).await {
                tracing::warn!("Failed to persist idle session {}: {}", session_id, e);
            }
            tracing::info!("Evicted idle visit screen {}", session_id);
            evicted += 1;
        }
        evicted
    }

    /// Run [`Self::evict_idle`] every `every` until the runtime shuts down
    pub fn spawn_idle_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = service.evict_idle().await;
                if evicted > 0 {
                    tracing::debug!("Idle sweep evicted {} visit screens", evicted);
                }
            }
        })
    }

    /// Fails when the filter store is unreachable
    pub async fn check_ready(&self) -> AppResult<()> {
        self.persistence.ping().await
    }

    /// Store a navigation context to be consumed by the next mount of `session_id`
    pub async fn set_navigation_context(
        &self,
        session_id: &str,
        context: &NavigationContext,
    ) -> AppResult<()> {
        tracing::info!(
            "Navigation context for {}: {} on {}",
            session_id,
            context.employee_name,
            context.selected_date
        );
        self.persistence
            .put_navigation_context(session_id, context)
            .await
    }

    /// Mount a visit screen.
    ///
    /// A pending navigation context wins over the persisted snapshot for the
    /// date window and employee, and its own lookup is shown until the user
    /// changes anything. Without one, the last snapshot is restored, falling
    /// back to the default window.
    pub async fn mount(&self, session_id: Option<String>, caller: &Caller) -> AppResult<VisitBoard> {
        let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if let Ok(previous) = self.session(&session_id).await {
            let filters = previous.lock().await.filters.clone();
            if let Err(e) = self.persistence.persist(&session_id, &filters).await {
                tracing::warn!("Failed to persist replaced session {}: {}", session_id, e);
            }
        }

        let navigation = match self.persistence.take_navigation_context(&session_id).await {
            Ok(navigation) => navigation,
            Err(e) => {
                tracing::warn!("Failed to read navigation context for {}: {}", session_id, e);
                None
            }
        };

        let mut filters = match self.persistence.restore(&session_id).await {
            Some(filters) => filters,
            None => FilterState::defaults(today()),
        };
        if let Some(context) = &navigation {
            filters.seed_from(context);
        }

        let session = Arc::new(Mutex::new(ScreenSession::new(
            filters,
            self.cache_max_entries,
        )));
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), session.clone());

        let strategy = DataSourceStrategy::select(&caller.role, caller.team_id);
        tracing::info!(
            "Mounted visit screen {} ({}, navigation: {})",
            session_id,
            strategy,
            navigation.is_some()
        );

        let Some(context) = navigation else {
            return self.current_page(&session_id, caller).await;
        };

        // A failed lookup hands the context back so the next mount retries it
        let mut lookup = FilterState::defaults(context.selected_date);
        lookup.seed_from(&context);
        let page = match strategy.current_page_search(&lookup) {
            Some(search) => match strategy
                .fetch(self.repository.visits.as_ref(), &caller.token, &search)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    if let Err(put_err) = self
                        .persistence
                        .put_navigation_context(&session_id, &context)
                        .await
                    {
                        tracing::warn!(
                            "Failed to restore navigation context for {}: {}",
                            session_id,
                            put_err
                        );
                    }
                    return Err(e);
                }
            },
            None => PageResult::empty(),
        };

        if !self.is_mounted(&session_id, &session).await {
            return Err(AppError::NotFound(format!(
                "Visit screen {} was unmounted",
                session_id
            )));
        }
        let mut screen = session.lock().await;
        screen.navigation_result = Some(page);
        Ok(screen.board(&session_id, strategy))
    }

    /// Tear down a visit screen: persist its filters, drop the navigation
    /// context, and discard results of fetches still in flight.
    pub async fn unmount(&self, session_id: &str) -> AppResult<()> {
        let session = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("No mounted visit screen for session {}", session_id))
            })?;

        let filters = session.lock().await.filters.clone();
        self.persistence.persist(session_id, &filters).await?;
        self.persistence.clear_navigation_context(session_id).await?;

        tracing::info!("Unmounted visit screen {}", session_id);
        Ok(())
    }

    /// Persist the filters without tearing the screen down
    pub async fn checkpoint(&self, session_id: &str) -> AppResult<()> {
        let session = self.session(session_id).await?;
        let filters = session.lock().await.filters.clone();
        self.persistence.persist(session_id, &filters).await
    }

    /// What the screen currently shows, without fetching
    pub async fn board(&self, session_id: &str, caller: &Caller) -> AppResult<VisitBoard> {
        let session = self.session(session_id).await?;
        let strategy = DataSourceStrategy::select(&caller.role, caller.team_id);
        let screen = session.lock().await;
        Ok(screen.board(session_id, strategy))
    }

    /// Fetch the page the filters point at, through the session cache.
    ///
    /// A response is displayed only if its key is still the active one when
    /// it arrives; otherwise it is dropped and the previous page stays.
    pub async fn current_page(&self, session_id: &str, caller: &Caller) -> AppResult<VisitBoard> {
        let session = self.session(session_id).await?;
        let strategy = DataSourceStrategy::select(&caller.role, caller.team_id);

        let (key, cache) = {
            let mut screen = session.lock().await;
            if screen.navigation_result.is_some() {
                return Ok(screen.board(session_id, strategy));
            }

            let key = QueryKey::for_filters(strategy, &screen.filters);
            screen.active_key = key.clone();
            match key {
                Some(key) => (key, screen.cache.clone()),
                None => {
                    screen.displayed = Some(PageResult::empty());
                    screen.displayed_key = None;
                    return Ok(screen.board(session_id, strategy));
                }
            }
        };

        let api = self.repository.visits.clone();
        let token = caller.token.clone();
        let search = key.search.clone();
        let result = cache
            .fetch(key.clone(), move || async move {
                strategy.fetch(api.as_ref(), &token, &search).await
            })
            .await;

        if !self.is_mounted(session_id, &session).await {
            tracing::debug!("Discarding visit page for unmounted screen {}", session_id);
            return Err(AppError::NotFound(format!(
                "Visit screen {} was unmounted",
                session_id
            )));
        }

        let mut screen = session.lock().await;
        if screen.active_key.as_ref() != Some(&key) {
            tracing::debug!("Discarding stale visit page for {}", session_id);
            return Ok(screen.board(session_id, strategy));
        }

        let page = result?;
        screen.displayed = Some(page);
        screen.displayed_key = Some(key);
        Ok(screen.board(session_id, strategy))
    }

    /// Manual retry after a failed fetch
    pub async fn retry(&self, session_id: &str, caller: &Caller) -> AppResult<VisitBoard> {
        self.update(session_id, caller, Invalidation::TargetKey, |_| Ok(()))
            .await
    }

    async fn update<F>(
        &self,
        session_id: &str,
        caller: &Caller,
        invalidation: Invalidation,
        mutate: F,
    ) -> AppResult<VisitBoard>
    where
        F: FnOnce(&mut FilterState) -> AppResult<()>,
    {
        let session = self.session(session_id).await?;
        let strategy = DataSourceStrategy::select(&caller.role, caller.team_id);

        let (cache, target) = {
            let mut screen = session.lock().await;
            let mut next = screen.filters.clone();
            mutate(&mut next)?;
            screen.filters = next;
            screen.navigation_result = None;
            (
                screen.cache.clone(),
                QueryKey::for_filters(strategy, &screen.filters),
            )
        };

        match invalidation {
            Invalidation::Strategy => {
                cache.invalidate_strategy(strategy).await;
            }
            Invalidation::TargetKey => {
                if let Some(target) = target {
                    cache.invalidate(|key| key == &target).await;
                }
            }
            Invalidation::None => {}
        }

        self.current_page(session_id, caller).await
    }

    /// Change the date window. An invalid window is rejected and leaves the
    /// filters as they were.
    pub async fn set_date_range(
        &self,
        session_id: &str,
        caller: &Caller,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<VisitBoard> {
        self.update(session_id, caller, Invalidation::Strategy, |filters| {
            filters.set_window(start, end)
        })
        .await
    }

    pub async fn apply_filters(
        &self,
        session_id: &str,
        caller: &Caller,
        patch: &FilterPatch,
    ) -> AppResult<VisitBoard> {
        self.update(session_id, caller, Invalidation::Strategy, |filters| {
            filters.apply_text_filters(patch);
            Ok(())
        })
        .await
    }

    pub async fn clear_filters(&self, session_id: &str, caller: &Caller) -> AppResult<VisitBoard> {
        self.update(session_id, caller, Invalidation::Strategy, |filters| {
            filters.clear_filters(today());
            Ok(())
        })
        .await
    }

    pub async fn sort(
        &self,
        session_id: &str,
        caller: &Caller,
        column: Option<SortColumn>,
        direction: Option<SortDirection>,
    ) -> AppResult<VisitBoard> {
        self.update(session_id, caller, Invalidation::TargetKey, |filters| {
            filters.sort_by(column, direction);
            Ok(())
        })
        .await
    }

    pub async fn set_page(
        &self,
        session_id: &str,
        caller: &Caller,
        page: u32,
    ) -> AppResult<VisitBoard> {
        self.update(session_id, caller, Invalidation::TargetKey, |filters| {
            filters.set_page(page)
        })
        .await
    }

    pub async fn set_columns(
        &self,
        session_id: &str,
        caller: &Caller,
        columns: Vec<ColumnKey>,
    ) -> AppResult<VisitBoard> {
        self.update(session_id, caller, Invalidation::None, |filters| {
            filters.set_columns(columns);
            Ok(())
        })
        .await
    }

    /// Crawl every page matching the screen's filters and render the
    /// selected columns as CSV.
    ///
    /// The crawl bypasses the session cache and runs in its own task, so
    /// neither filter changes nor an unmount interrupt it.
    pub async fn export(&self, session_id: &str, caller: &Caller) -> AppResult<CsvFile> {
        let session = self.session(session_id).await?;
        let filters = session.lock().await.filters.clone();
        let strategy = DataSourceStrategy::select(&caller.role, caller.team_id);
        CsvExporter::check_columns(&filters.selected_columns)?;

        tracing::info!(
            "Exporting visits {}..{} for {} ({})",
            filters.start_date,
            filters.end_date,
            session_id,
            strategy
        );

        let crawl = PageCrawl::new(
            self.repository.visits.clone(),
            strategy,
            caller.token.clone(),
            VisitSearch::from_filters(&filters, 0, self.export_page_size),
            self.export_max_pages,
        );
        let exporter = self.exporter.clone();
        let columns = filters.selected_columns;

        tokio::spawn(async move {
            let records = crawl.collect_all().await?;
            exporter.render(&columns, &records)
        })
        .await
        .map_err(|e| AppError::Export(format!("Export task failed: {}", e)))?
    }
}
