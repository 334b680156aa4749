//! Visit searches against the remote record API

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};

use crate::{
    config::RecordApiConfig,
    error::{AppError, AppResult},
    models::{FilterState, PageResult, SortColumn, SortDirection},
};

const DIRECT_SEARCH_PATH: &str = "visit/getByDateSorted";
const TEAM_SEARCH_PATH: &str = "visit/getForTeam";

/// Parameters of one page request, as transmitted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitSearch {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Text filters are lower-cased; empty filters are `None`
    pub purpose: Option<String>,
    pub store_name: Option<String>,
    pub employee_name: Option<String>,
    pub sort: Option<(SortColumn, SortDirection)>,
    /// 0-based, as the record API counts pages
    pub page: u32,
    pub size: u32,
}

fn text_filter(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_lowercase())
    }
}

impl VisitSearch {
    /// Search for `page` (0-based) of `size` records matching `filters`.
    /// The interactive page fields of `filters` are not consulted.
    pub fn from_filters(filters: &FilterState, page: u32, size: u32) -> Self {
        Self {
            start_date: filters.start_date,
            end_date: filters.end_date,
            purpose: text_filter(&filters.purpose),
            store_name: text_filter(&filters.store_name),
            employee_name: text_filter(&filters.employee_name),
            sort: filters.sort_column.map(|c| (c, filters.sort_direction)),
            page,
            size,
        }
    }

    /// Search for the page the interactive list is showing
    pub fn for_current_page(filters: &FilterState) -> Self {
        Self::from_filters(
            filters,
            filters.current_page.saturating_sub(1),
            filters.items_per_page,
        )
    }

    pub fn at_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    pub fn without_employee(self) -> Self {
        Self {
            employee_name: None,
            ..self
        }
    }

    /// Query string pairs shared by both search endpoints
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("startDate", self.start_date.format("%Y-%m-%d").to_string()),
            ("endDate", self.end_date.format("%Y-%m-%d").to_string()),
            ("page", self.page.to_string()),
            ("size", self.size.to_string()),
        ];
        if let Some((column, direction)) = self.sort {
            pairs.push((
                "sort",
                format!("{},{}", column.as_param(), direction.as_param()),
            ));
        }
        if let Some(purpose) = &self.purpose {
            pairs.push(("purpose", purpose.clone()));
        }
        if let Some(store_name) = &self.store_name {
            pairs.push(("storeName", store_name.clone()));
        }
        if let Some(employee_name) = &self.employee_name {
            pairs.push(("employeeName", employee_name.clone()));
        }
        pairs
    }
}

/// The two visit search endpoints of the record API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordApi: Send + Sync {
    /// `GET /visit/getByDateSorted`, honours the employee filter
    async fn get_by_date_sorted(&self, token: &str, search: &VisitSearch) -> AppResult<PageResult>;

    /// `GET /visit/getForTeam`, scoped to one team, no employee filter
    async fn get_for_team(
        &self,
        token: &str,
        team_id: i64,
        search: &VisitSearch,
    ) -> AppResult<PageResult>;
}

/// reqwest-backed record API client
#[derive(Clone)]
pub struct HttpRecordApi {
    client: Client,
    base_url: String,
}

impl HttpRecordApi {
    pub fn new(config: &RecordApiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_page(
        &self,
        path: &str,
        token: &str,
        params: &[(&'static str, String)],
    ) -> AppResult<PageResult> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::Authentication(format!(
                "Record API rejected the token ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(AppError::Network(format!(
                "Record API returned {} for {}",
                status, path
            )));
        }

        let page = response.json::<PageResult>().await?;
        tracing::debug!(
            "{} returned {} records (last: {})",
            path,
            page.content.len(),
            page.last
        );
        Ok(page)
    }
}

#[async_trait]
impl RecordApi for HttpRecordApi {
    async fn get_by_date_sorted(&self, token: &str, search: &VisitSearch) -> AppResult<PageResult> {
        self.get_page(DIRECT_SEARCH_PATH, token, &search.query_pairs())
            .await
    }

    async fn get_for_team(
        &self,
        token: &str,
        team_id: i64,
        search: &VisitSearch,
    ) -> AppResult<PageResult> {
        let mut params = vec![("teamId", team_id.to_string())];
        params.extend(search.clone().without_employee().query_pairs());
        self.get_page(TEAM_SEARCH_PATH, token, &params).await
    }
}
