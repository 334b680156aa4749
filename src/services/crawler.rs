//! Full-dataset pagination for exports

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{PageResult, VisitRecord},
    repository::{RecordApi, VisitSearch},
};

use super::strategy::DataSourceStrategy;

/// Lazy, finite, non-restartable sequence of pages for one search.
///
/// Pages are requested from page 0 upwards. The sequence ends after a page
/// flagged `last`, after an empty page (logged as an anomaly when it was not
/// flagged `last`), or after the first error.
pub struct PageCrawl {
    api: Arc<dyn RecordApi>,
    strategy: DataSourceStrategy,
    token: String,
    search: VisitSearch,
    cursor: u32,
    max_pages: u32,
    finished: bool,
}

impl PageCrawl {
    /// `search` carries the filters and page size; its page number is ignored
    pub fn new(
        api: Arc<dyn RecordApi>,
        strategy: DataSourceStrategy,
        token: String,
        search: VisitSearch,
        max_pages: u32,
    ) -> Self {
        Self {
            api,
            finished: strategy.is_disabled(),
            strategy,
            token,
            search,
            cursor: 0,
            max_pages,
        }
    }

    /// Number of pages requested so far
    pub fn pages_fetched(&self) -> u32 {
        self.cursor
    }

    pub async fn next_page(&mut self) -> Option<AppResult<PageResult>> {
        if self.finished {
            return None;
        }
        if self.cursor >= self.max_pages {
            self.finished = true;
            return Some(Err(AppError::Export(format!(
                "Crawl stopped after {} pages without reaching the last page",
                self.max_pages
            ))));
        }

        let search = self.search.at_page(self.cursor);
        let result = self
            .strategy
            .fetch(self.api.as_ref(), &self.token, &search)
            .await;
        self.cursor += 1;

        match result {
            Ok(page) => {
                if page.last {
                    self.finished = true;
                } else if page.content.is_empty() {
                    tracing::warn!(
                        "Record API returned an empty page {} not flagged as last; ending crawl",
                        search.page
                    );
                    self.finished = true;
                }
                Some(Ok(page))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }

    /// Drain the crawl, concatenating pages in server order.
    /// Any page error discards everything collected so far.
    pub async fn collect_all(mut self) -> AppResult<Vec<VisitRecord>> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await {
            let page = page.map_err(|e| match e {
                AppError::Export(msg) => AppError::Export(msg),
                other => AppError::Export(format!(
                    "Fetching page {} failed: {}",
                    self.cursor.saturating_sub(1),
                    other
                )),
            })?;
            records.extend(page.content);
        }
        tracing::info!(
            "Crawl finished: {} records over {} pages",
            records.len(),
            self.cursor
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilterState;
    use crate::repository::visits::MockRecordApi;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn search() -> VisitSearch {
        let filters = FilterState::defaults(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        VisitSearch::from_filters(&filters, 0, 100)
    }

    fn page(ids: &[i64], last: bool) -> PageResult {
        PageResult {
            content: ids
                .iter()
                .map(|&id| VisitRecord {
                    id,
                    ..Default::default()
                })
                .collect(),
            total_pages: 0,
            last,
        }
    }

    /// Mock serving `pages` by page number through the direct endpoint
    fn api_serving(pages: Vec<PageResult>, calls: Arc<AtomicUsize>) -> Arc<dyn RecordApi> {
        let mut api = MockRecordApi::new();
        api.expect_get_by_date_sorted().returning(move |_, search| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(pages[search.page as usize].clone())
        });
        api.expect_get_for_team().times(0);
        Arc::new(api)
    }

    fn crawl(api: Arc<dyn RecordApi>, strategy: DataSourceStrategy) -> PageCrawl {
        PageCrawl::new(api, strategy, "tok".to_string(), search(), 50)
    }

    #[tokio::test]
    async fn test_crawl_issues_exactly_one_call_per_page() {
        for n in 1..=4usize {
            let pages: Vec<_> = (0..n)
                .map(|i| page(&[i as i64 * 10, i as i64 * 10 + 1], i + 1 == n))
                .collect();
            let calls = Arc::new(AtomicUsize::new(0));
            let api = api_serving(pages, calls.clone());

            let records = crawl(api, DataSourceStrategy::DirectFiltered)
                .collect_all()
                .await
                .unwrap();

            assert_eq!(calls.load(Ordering::SeqCst), n);
            let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
            let expected: Vec<i64> = (0..n as i64).flat_map(|i| [i * 10, i * 10 + 1]).collect();
            assert_eq!(ids, expected);
        }
    }

    #[tokio::test]
    async fn test_empty_page_not_flagged_last_ends_crawl() {
        let calls = Arc::new(AtomicUsize::new(0));
        let api = api_serving(
            vec![page(&[1, 2], false), page(&[], false), page(&[3], true)],
            calls.clone(),
        );

        let records = crawl(api, DataSourceStrategy::DirectFiltered)
            .collect_all()
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_page_error_discards_partial_results() {
        let mut api = MockRecordApi::new();
        api.expect_get_by_date_sorted()
            .returning(|_, search| match search.page {
                0 => Ok(page(&[1], false)),
                _ => Err(AppError::Network("connection reset".into())),
            });

        let result = crawl(Arc::new(api), DataSourceStrategy::DirectFiltered)
            .collect_all()
            .await;

        assert!(matches!(result, Err(AppError::Export(_))));
    }

    #[tokio::test]
    async fn test_page_limit_is_an_export_failure() {
        let mut api = MockRecordApi::new();
        api.expect_get_by_date_sorted()
            .times(3)
            .returning(|_, _| Ok(page(&[1], false)));

        let crawl = PageCrawl::new(
            Arc::new(api),
            DataSourceStrategy::DirectFiltered,
            "tok".to_string(),
            search(),
            3,
        );
        assert!(matches!(crawl.collect_all().await, Err(AppError::Export(_))));
    }

    #[tokio::test]
    async fn test_team_crawl_uses_team_endpoint_with_large_pages() {
        let mut api = MockRecordApi::new();
        api.expect_get_for_team()
            .withf(|_, team_id, search| *team_id == 7 && search.size == 100)
            .times(2)
            .returning(|_, _, search| Ok(page(&[search.page as i64], search.page == 1)));
        api.expect_get_by_date_sorted().times(0);

        let records = crawl(Arc::new(api), DataSourceStrategy::TeamScoped { team_id: 7 })
            .collect_all()
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_crawl_is_empty_and_silent() {
        let mut api = MockRecordApi::new();
        api.expect_get_by_date_sorted().times(0);
        api.expect_get_for_team().times(0);

        let mut crawl = crawl(Arc::new(api), DataSourceStrategy::Disabled);
        assert!(crawl.next_page().await.is_none());
        assert_eq!(crawl.pages_fetched(), 0);
    }

    #[tokio::test]
    async fn test_sequence_does_not_restart() {
        let calls = Arc::new(AtomicUsize::new(0));
        let api = api_serving(vec![page(&[1], true)], calls.clone());
        let mut crawl = crawl(api, DataSourceStrategy::DirectFiltered);

        assert!(crawl.next_page().await.is_some());
        assert!(crawl.next_page().await.is_none());
        assert!(crawl.next_page().await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
