//! Filter state of the visit list and the navigation context that can seed it

use chrono::{Duration, NaiveDate};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

use super::enums::{ColumnKey, SortColumn, SortDirection};

/// Widest date window a single query may cover
pub const MAX_WINDOW_DAYS: i64 = 30;
/// Span of the default window ending today
pub const DEFAULT_WINDOW_DAYS: i64 = 7;
/// Page size of the interactive list
pub const ITEMS_PER_PAGE: u32 = 10;

/// Check that `start..=end` is an acceptable query window
pub fn validate_window(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if start > end {
        return Err(AppError::Validation(format!(
            "Start date {} is after end date {}",
            start, end
        )));
    }
    if end - start > Duration::days(MAX_WINDOW_DAYS) {
        return Err(AppError::Validation(format!(
            "Date range cannot exceed {} days",
            MAX_WINDOW_DAYS
        )));
    }
    Ok(())
}

/// Every user-controlled parameter of the visit list.
///
/// Persisted as one JSON object; `itemsPerPage` is fixed and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sort_column: Option<SortColumn>,
    pub sort_direction: SortDirection,
    /// 1-based
    pub current_page: u32,
    pub purpose: String,
    pub store_name: String,
    pub employee_name: String,
    pub selected_columns: Vec<ColumnKey>,
    #[serde(skip, default = "default_items_per_page")]
    pub items_per_page: u32,
}

fn default_items_per_page() -> u32 {
    ITEMS_PER_PAGE
}

impl FilterState {
    /// Last seven days, newest visits first, default columns
    pub fn defaults(today: NaiveDate) -> Self {
        Self {
            start_date: today - Duration::days(DEFAULT_WINDOW_DAYS),
            end_date: today,
            sort_column: Some(SortColumn::Id),
            sort_direction: SortDirection::Desc,
            current_page: 1,
            purpose: String::new(),
            store_name: String::new(),
            employee_name: String::new(),
            selected_columns: ColumnKey::defaults(),
            items_per_page: ITEMS_PER_PAGE,
        }
    }

    /// Check the invariants a stored state must hold before it is used
    pub fn check(&self) -> AppResult<()> {
        validate_window(self.start_date, self.end_date)?;
        if self.current_page == 0 {
            return Err(AppError::Validation("Pages are numbered from 1".to_string()));
        }
        Ok(())
    }

    /// Replace the date window, leaving the state untouched when it is invalid
    pub fn set_window(&mut self, start: NaiveDate, end: NaiveDate) -> AppResult<()> {
        validate_window(start, end)?;
        self.start_date = start;
        self.end_date = end;
        self.current_page = 1;
        Ok(())
    }

    pub fn apply_text_filters(&mut self, patch: &FilterPatch) {
        if let Some(purpose) = &patch.purpose {
            self.purpose = purpose.trim().to_string();
        }
        if let Some(store_name) = &patch.store_name {
            self.store_name = store_name.trim().to_string();
        }
        if let Some(employee_name) = &patch.employee_name {
            self.employee_name = employee_name.trim().to_string();
        }
        self.current_page = 1;
    }

    /// Drop the text filters and return to the default window
    pub fn clear_filters(&mut self, today: NaiveDate) {
        let defaults = Self::defaults(today);
        self.start_date = defaults.start_date;
        self.end_date = defaults.end_date;
        self.purpose.clear();
        self.store_name.clear();
        self.employee_name.clear();
        self.current_page = 1;
    }

    /// Sort on `column`. Without an explicit direction, re-selecting the
    /// active column flips its direction and a new column starts ascending.
    pub fn sort_by(&mut self, column: Option<SortColumn>, direction: Option<SortDirection>) {
        let direction = match direction {
            Some(direction) => direction,
            None if column.is_some() && column == self.sort_column => self.sort_direction.toggled(),
            None => SortDirection::Asc,
        };
        self.sort_column = column;
        self.sort_direction = direction;
        self.current_page = 1;
    }

    pub fn set_page(&mut self, page: u32) -> AppResult<()> {
        if page == 0 {
            return Err(AppError::Validation("Pages are numbered from 1".to_string()));
        }
        self.current_page = page;
        Ok(())
    }

    /// Keep the first occurrence of each column, in the given order
    pub fn set_columns(&mut self, columns: Vec<ColumnKey>) {
        self.selected_columns = columns.into_iter().collect::<IndexSet<_>>().into_iter().collect();
    }

    /// Seed the window and employee from a navigation context
    pub fn seed_from(&mut self, context: &NavigationContext) {
        self.start_date = context.selected_date;
        self.end_date = context.selected_date;
        self.employee_name = context.employee_name.clone();
        self.current_page = 1;
    }
}

/// One-shot seed handed to the visit screen from elsewhere in the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigationContext {
    pub selected_date: NaiveDate,
    pub employee_name: String,
}

/// Text filters to apply; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterPatch {
    #[validate(length(max = 200))]
    pub purpose: Option<String>,
    #[validate(length(max = 200))]
    pub store_name: Option<String>,
    #[validate(length(max = 200))]
    pub employee_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_defaults_cover_last_seven_days() {
        let state = FilterState::defaults(date("2024-03-15"));
        assert_eq!(state.start_date, date("2024-03-08"));
        assert_eq!(state.end_date, date("2024-03-15"));
        assert_eq!(state.sort_column, Some(SortColumn::Id));
        assert_eq!(state.sort_direction, SortDirection::Desc);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.items_per_page, ITEMS_PER_PAGE);
    }

    #[test]
    fn test_window_of_thirty_days_is_accepted() {
        tokio_test::assert_ok!(validate_window(date("2024-01-01"), date("2024-01-31")));
        tokio_test::assert_ok!(validate_window(date("2024-01-01"), date("2024-01-01")));
        tokio_test::assert_err!(validate_window(date("2024-01-01"), date("2024-02-01")));
    }

    #[test]
    fn test_window_over_thirty_days_leaves_state_unchanged() {
        let mut state = FilterState::defaults(date("2024-03-15"));
        let before = state.clone();

        let result = state.set_window(date("2024-01-01"), date("2024-02-01"));
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(state, before);
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let mut state = FilterState::defaults(date("2024-03-15"));
        assert!(state.set_window(date("2024-03-10"), date("2024-03-01")).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut state = FilterState::defaults(date("2024-03-15"));
        state.purpose = "Stock audit".to_string();
        state.employee_name = "J. Doe".to_string();
        state.sort_by(Some(SortColumn::StoreName), None);
        state.current_page = 4;

        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("itemsPerPage"));
        let restored: FilterState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_sort_toggles_active_column() {
        let mut state = FilterState::defaults(date("2024-03-15"));
        state.sort_by(Some(SortColumn::Id), None);
        assert_eq!(state.sort_direction, SortDirection::Asc);

        state.sort_by(Some(SortColumn::StoreName), None);
        assert_eq!(state.sort_column, Some(SortColumn::StoreName));
        assert_eq!(state.sort_direction, SortDirection::Asc);

        state.sort_by(Some(SortColumn::StoreName), Some(SortDirection::Desc));
        assert_eq!(state.sort_direction, SortDirection::Desc);
    }

    #[test]
    fn test_set_columns_dedupes_in_order() {
        let mut state = FilterState::defaults(date("2024-03-15"));
        state.set_columns(vec![
            ColumnKey::Purpose,
            ColumnKey::StoreName,
            ColumnKey::Purpose,
        ]);
        assert_eq!(
            state.selected_columns,
            vec![ColumnKey::Purpose, ColumnKey::StoreName]
        );
    }

    #[test]
    fn test_seed_from_navigation_context() {
        let mut state = FilterState::defaults(date("2024-03-15"));
        state.current_page = 3;
        state.seed_from(&NavigationContext {
            selected_date: date("2024-02-20"),
            employee_name: "J. Doe".to_string(),
        });
        assert_eq!(state.start_date, date("2024-02-20"));
        assert_eq!(state.end_date, date("2024-02-20"));
        assert_eq!(state.employee_name, "J. Doe");
        assert_eq!(state.current_page, 1);
    }
}
