//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, visits};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Visitdesk API",
        version = "1.0.0",
        description = "Field visit query and export REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Screen lifecycle
        visits::mount_screen,
        visits::unmount_screen,
        visits::checkpoint_screen,
        visits::set_navigation_context,
        // Visit list
        visits::current_page,
        visits::get_board,
        visits::retry,
        visits::set_date_range,
        visits::apply_filters,
        visits::clear_filters,
        visits::set_sort,
        visits::set_page,
        visits::list_columns,
        visits::set_columns,
        // Export
        visits::export_visits,
    ),
    components(
        schemas(
            // Visits
            visits::DateRangeRequest,
            visits::SortRequest,
            visits::PageRequest,
            visits::ColumnsRequest,
            visits::ColumnInfo,
            crate::services::visits::VisitBoard,
            crate::models::FilterState,
            crate::models::FilterPatch,
            crate::models::NavigationContext,
            crate::models::VisitRecord,
            crate::models::VisitRow,
            crate::models::VisitStatus,
            crate::models::ColumnKey,
            crate::models::SortColumn,
            crate::models::SortDirection,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "visits", description = "Visit list, filters and export")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
