//! API handlers for Visitdesk REST endpoints

pub mod health;
pub mod openapi;
pub mod visits;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post, put},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::{Caller, Role},
    AppState,
};

pub const ROLE_HEADER: &str = "x-user-role";
pub const TEAM_HEADER: &str = "x-team-id";
pub const SCREEN_SESSION_HEADER: &str = "x-screen-session";

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Extractor for the caller identity supplied by the auth collaborator
pub struct AuthenticatedCaller(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::AuthMissing("Missing bearer token".to_string()))?;

        let token = bearer.token().trim();
        if token.is_empty() {
            return Err(AppError::AuthMissing("Missing bearer token".to_string()));
        }

        let role = header_value(parts, ROLE_HEADER)
            .map(Role::from)
            .unwrap_or_else(|| Role::Other(String::new()));

        let team_id = header_value(parts, TEAM_HEADER)
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid team id: {}", raw)))
            })
            .transpose()?;

        Ok(AuthenticatedCaller(Caller {
            token: token.to_string(),
            role,
            team_id,
        }))
    }
}

/// Screen session id of a mounted visit screen
pub struct ScreenSession(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ScreenSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_value(parts, SCREEN_SESSION_HEADER)
            .map(|id| ScreenSession(id.to_string()))
            .ok_or_else(|| AppError::BadRequest("Missing X-Screen-Session header".to_string()))
    }
}

/// Screen session id when the client already has one
pub struct OptionalScreenSession(pub Option<String>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OptionalScreenSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalScreenSession(
            header_value(parts, SCREEN_SESSION_HEADER).map(str::to_string),
        ))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Screen lifecycle
        .route(
            "/visits/session",
            post(visits::mount_screen).delete(visits::unmount_screen),
        )
        .route("/visits/session/checkpoint", post(visits::checkpoint_screen))
        .route("/visits/navigation", put(visits::set_navigation_context))
        // Visit list
        .route("/visits", get(visits::current_page))
        .route("/visits/board", get(visits::get_board))
        .route("/visits/retry", post(visits::retry))
        .route("/visits/date-range", put(visits::set_date_range))
        .route(
            "/visits/filters",
            put(visits::apply_filters).delete(visits::clear_filters),
        )
        .route("/visits/sort", put(visits::set_sort))
        .route("/visits/page", put(visits::set_page))
        .route(
            "/visits/columns",
            get(visits::list_columns).put(visits::set_columns),
        )
        // Export
        .route("/visits/export", get(visits::export_visits))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
