//! Visit list and export endpoints

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{ColumnKey, FilterPatch, NavigationContext, SortColumn, SortDirection},
    services::{export::column_header, visits::VisitBoard},
    AppState,
};

use super::{AuthenticatedCaller, OptionalScreenSession, ScreenSession};

/// Date window request
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeRequest {
    /// First day of the window (inclusive)
    pub start_date: NaiveDate,
    /// Last day of the window (inclusive), at most 30 days after the start
    pub end_date: NaiveDate,
}

/// Sort request. Without a direction, re-selecting the active column flips it.
#[derive(Deserialize, ToSchema)]
pub struct SortRequest {
    pub column: Option<SortColumn>,
    pub direction: Option<SortDirection>,
}

/// Page request
#[derive(Deserialize, ToSchema)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
}

/// Column selection request
#[derive(Deserialize, ToSchema)]
pub struct ColumnsRequest {
    /// Column keys in display order
    pub columns: Vec<String>,
}

/// Known column of the visit list
#[derive(Serialize, ToSchema)]
pub struct ColumnInfo {
    pub key: ColumnKey,
    pub label: String,
    pub sortable: bool,
    pub exportable: bool,
    pub default: bool,
}

/// Mount a visit screen
#[utoipa::path(
    post,
    path = "/visits/session",
    tag = "visits",
    security(("bearer_auth" = [])),
    params(
        ("X-Screen-Session" = Option<String>, Header, description = "Session to resume; generated when absent")
    ),
    responses(
        (status = 200, description = "Screen mounted", body = VisitBoard),
        (status = 401, description = "Missing bearer token"),
        (status = 502, description = "Record API unreachable")
    )
)]
pub async fn mount_screen(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    OptionalScreenSession(session): OptionalScreenSession,
) -> AppResult<Json<VisitBoard>> {
    let board = state.services.visits.mount(session, &caller).await?;
    Ok(Json(board))
}

/// Unmount a visit screen, persisting its filters
#[utoipa::path(
    delete,
    path = "/visits/session",
    tag = "visits",
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    responses(
        (status = 204, description = "Screen unmounted"),
        (status = 404, description = "No such screen session")
    )
)]
pub async fn unmount_screen(
    State(state): State<AppState>,
    ScreenSession(session): ScreenSession,
) -> AppResult<StatusCode> {
    state.services.visits.unmount(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Persist the filters without unmounting (page hidden)
#[utoipa::path(
    post,
    path = "/visits/session/checkpoint",
    tag = "visits",
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    responses(
        (status = 204, description = "Filters persisted"),
        (status = 404, description = "No such screen session")
    )
)]
pub async fn checkpoint_screen(
    State(state): State<AppState>,
    ScreenSession(session): ScreenSession,
) -> AppResult<StatusCode> {
    state.services.visits.checkpoint(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Hand a date and employee to the next mount of a screen session
#[utoipa::path(
    put,
    path = "/visits/navigation",
    tag = "visits",
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    request_body = NavigationContext,
    responses(
        (status = 204, description = "Navigation context stored")
    )
)]
pub async fn set_navigation_context(
    State(state): State<AppState>,
    ScreenSession(session): ScreenSession,
    Json(context): Json<NavigationContext>,
) -> AppResult<StatusCode> {
    state
        .services
        .visits
        .set_navigation_context(&session, &context)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fetch the page the filters point at
#[utoipa::path(
    get,
    path = "/visits",
    tag = "visits",
    security(("bearer_auth" = [])),
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    responses(
        (status = 200, description = "Current page", body = VisitBoard),
        (status = 401, description = "Missing bearer token or rejected by the record API"),
        (status = 404, description = "No such screen session"),
        (status = 502, description = "Record API unreachable")
    )
)]
pub async fn current_page(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ScreenSession(session): ScreenSession,
) -> AppResult<Json<VisitBoard>> {
    let board = state.services.visits.current_page(&session, &caller).await?;
    Ok(Json(board))
}

/// What the screen shows right now, without fetching
#[utoipa::path(
    get,
    path = "/visits/board",
    tag = "visits",
    security(("bearer_auth" = [])),
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    responses(
        (status = 200, description = "Displayed board", body = VisitBoard),
        (status = 404, description = "No such screen session")
    )
)]
pub async fn get_board(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ScreenSession(session): ScreenSession,
) -> AppResult<Json<VisitBoard>> {
    let board = state.services.visits.board(&session, &caller).await?;
    Ok(Json(board))
}

/// Refetch the current page after a failure
#[utoipa::path(
    post,
    path = "/visits/retry",
    tag = "visits",
    security(("bearer_auth" = [])),
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    responses(
        (status = 200, description = "Current page", body = VisitBoard),
        (status = 502, description = "Record API unreachable")
    )
)]
pub async fn retry(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ScreenSession(session): ScreenSession,
) -> AppResult<Json<VisitBoard>> {
    let board = state.services.visits.retry(&session, &caller).await?;
    Ok(Json(board))
}

/// Change the date window
#[utoipa::path(
    put,
    path = "/visits/date-range",
    tag = "visits",
    security(("bearer_auth" = [])),
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    request_body = DateRangeRequest,
    responses(
        (status = 200, description = "Window changed", body = VisitBoard),
        (status = 400, description = "Window longer than 30 days or inverted")
    )
)]
pub async fn set_date_range(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ScreenSession(session): ScreenSession,
    Json(request): Json<DateRangeRequest>,
) -> AppResult<Json<VisitBoard>> {
    let board = state
        .services
        .visits
        .set_date_range(&session, &caller, request.start_date, request.end_date)
        .await?;
    Ok(Json(board))
}

/// Apply text filters
#[utoipa::path(
    put,
    path = "/visits/filters",
    tag = "visits",
    security(("bearer_auth" = [])),
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    request_body = FilterPatch,
    responses(
        (status = 200, description = "Filters applied", body = VisitBoard),
        (status = 400, description = "Invalid filter values")
    )
)]
pub async fn apply_filters(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ScreenSession(session): ScreenSession,
    Json(patch): Json<FilterPatch>,
) -> AppResult<Json<VisitBoard>> {
    patch.validate()?;

    let board = state
        .services
        .visits
        .apply_filters(&session, &caller, &patch)
        .await?;
    Ok(Json(board))
}

/// Clear text filters and return to the default window
#[utoipa::path(
    delete,
    path = "/visits/filters",
    tag = "visits",
    security(("bearer_auth" = [])),
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    responses(
        (status = 200, description = "Filters cleared", body = VisitBoard)
    )
)]
pub async fn clear_filters(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ScreenSession(session): ScreenSession,
) -> AppResult<Json<VisitBoard>> {
    let board = state.services.visits.clear_filters(&session, &caller).await?;
    Ok(Json(board))
}

/// Change the sort
#[utoipa::path(
    put,
    path = "/visits/sort",
    tag = "visits",
    security(("bearer_auth" = [])),
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    request_body = SortRequest,
    responses(
        (status = 200, description = "Sort changed", body = VisitBoard)
    )
)]
pub async fn set_sort(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ScreenSession(session): ScreenSession,
    Json(request): Json<SortRequest>,
) -> AppResult<Json<VisitBoard>> {
    let board = state
        .services
        .visits
        .sort(&session, &caller, request.column, request.direction)
        .await?;
    Ok(Json(board))
}

/// Change the current page
#[utoipa::path(
    put,
    path = "/visits/page",
    tag = "visits",
    security(("bearer_auth" = [])),
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    request_body = PageRequest,
    responses(
        (status = 200, description = "Page changed", body = VisitBoard),
        (status = 400, description = "Page 0 requested")
    )
)]
pub async fn set_page(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ScreenSession(session): ScreenSession,
    Json(request): Json<PageRequest>,
) -> AppResult<Json<VisitBoard>> {
    let board = state
        .services
        .visits
        .set_page(&session, &caller, request.page)
        .await?;
    Ok(Json(board))
}

/// Known columns
#[utoipa::path(
    get,
    path = "/visits/columns",
    tag = "visits",
    responses(
        (status = 200, description = "Column catalogue", body = Vec<ColumnInfo>)
    )
)]
pub async fn list_columns() -> Json<Vec<ColumnInfo>> {
    let defaults = ColumnKey::defaults();
    Json(
        ColumnKey::ALL
            .iter()
            .map(|key| ColumnInfo {
                key: *key,
                label: column_header(*key).to_string(),
                sortable: key.sort_column().is_some(),
                exportable: key.is_exportable(),
                default: defaults.contains(key),
            })
            .collect(),
    )
}

/// Change the selected columns
#[utoipa::path(
    put,
    path = "/visits/columns",
    tag = "visits",
    security(("bearer_auth" = [])),
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    request_body = ColumnsRequest,
    responses(
        (status = 200, description = "Columns changed", body = VisitBoard),
        (status = 400, description = "Unknown column key")
    )
)]
pub async fn set_columns(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ScreenSession(session): ScreenSession,
    Json(request): Json<ColumnsRequest>,
) -> AppResult<Json<VisitBoard>> {
    let columns = request
        .columns
        .iter()
        .map(|key| key.parse::<ColumnKey>().map_err(AppError::Validation))
        .collect::<AppResult<Vec<_>>>()?;

    let board = state
        .services
        .visits
        .set_columns(&session, &caller, columns)
        .await?;
    Ok(Json(board))
}

/// Download every visit matching the filters as CSV
#[utoipa::path(
    get,
    path = "/visits/export",
    tag = "visits",
    security(("bearer_auth" = [])),
    params(
        ("X-Screen-Session" = String, Header, description = "Screen session id")
    ),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 500, description = "Export failed, no file produced")
    )
)]
pub async fn export_visits(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ScreenSession(session): ScreenSession,
) -> AppResult<impl IntoResponse> {
    let file = state.services.visits.export(&session, &caller).await?;

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.file_name),
            ),
        ],
        file.bytes,
    ))
}
