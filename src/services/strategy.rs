//! Data-source routing: which search endpoint a caller's queries go to

use crate::{
    error::AppResult,
    models::{FilterState, PageResult, Role},
    repository::{RecordApi, VisitSearch},
};

/// How visit pages are fetched for a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSourceStrategy {
    /// `getByDateSorted`, with the employee filter
    DirectFiltered,
    /// `getForTeam`, scoped to one team, employee filter ignored
    TeamScoped { team_id: i64 },
    /// Policy gate: no query is issued and the result is empty
    Disabled,
}

impl DataSourceStrategy {
    /// Decision table evaluated for every query
    pub fn select(role: &Role, team_id: Option<i64>) -> Self {
        match (role, team_id) {
            (Role::Manager, Some(team_id)) => DataSourceStrategy::TeamScoped { team_id },
            (Role::Manager, None) => DataSourceStrategy::Disabled,
            (Role::Admin | Role::OfficeManager, _) => DataSourceStrategy::DirectFiltered,
            (Role::Other(_), _) => DataSourceStrategy::Disabled,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, DataSourceStrategy::Disabled)
    }

    /// Search this strategy issues for `filters`, holding only the fields it
    /// consumes. `None` when the strategy is disabled.
    pub fn search(&self, filters: &FilterState, page: u32, size: u32) -> Option<VisitSearch> {
        let search = VisitSearch::from_filters(filters, page, size);
        match self {
            DataSourceStrategy::DirectFiltered => Some(search),
            DataSourceStrategy::TeamScoped { .. } => Some(search.without_employee()),
            DataSourceStrategy::Disabled => None,
        }
    }

    /// Search for the page the interactive list is showing
    pub fn current_page_search(&self, filters: &FilterState) -> Option<VisitSearch> {
        self.search(
            filters,
            filters.current_page.saturating_sub(1),
            filters.items_per_page,
        )
    }

    /// Fetch one page. A disabled strategy never touches the network.
    pub async fn fetch(
        &self,
        api: &dyn RecordApi,
        token: &str,
        search: &VisitSearch,
    ) -> AppResult<PageResult> {
        match self {
            DataSourceStrategy::DirectFiltered => api.get_by_date_sorted(token, search).await,
            DataSourceStrategy::TeamScoped { team_id } => {
                api.get_for_team(token, *team_id, &search.clone().without_employee())
                    .await
            }
            DataSourceStrategy::Disabled => Ok(PageResult::empty()),
        }
    }
}

impl std::fmt::Display for DataSourceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSourceStrategy::DirectFiltered => write!(f, "direct"),
            DataSourceStrategy::TeamScoped { team_id } => write!(f, "team:{}", team_id),
            DataSourceStrategy::Disabled => write!(f, "disabled"),
        }
    }
}
