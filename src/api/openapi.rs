//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{delivery_slots, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catering Delivery Slots API",
        version = "1.0.0",
        description = "Delivery time-slot scheduling for the catering platform"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Administration
        delivery_slots::block_full_date,
        delivery_slots::block_time_slots,
        delivery_slots::unblock_date,
        delivery_slots::unblock_time_slots,
        delivery_slots::bulk_block_dates,
        delivery_slots::create_default_slots,
        delivery_slots::list_all,
        // Public
        delivery_slots::get_blocked_dates,
        delivery_slots::get_available_slots,
    ),
    components(
        schemas(
            crate::models::delivery_slot::TimeWindow,
            crate::models::delivery_slot::DaySchedule,
            crate::models::delivery_slot::DayAvailability,
            crate::models::delivery_slot::BlockedDate,
            crate::models::delivery_slot::BulkBlockResult,
            crate::models::delivery_slot::ListMeta,
            crate::models::delivery_slot::DaySchedulePage,
            crate::models::delivery_slot::BlockWindow,
            crate::models::delivery_slot::UnblockWindow,
            crate::models::delivery_slot::CustomWindow,
            crate::models::delivery_slot::BlockDateRequest,
            crate::models::delivery_slot::BlockTimeSlotsRequest,
            crate::models::delivery_slot::UnblockDateRequest,
            crate::models::delivery_slot::UnblockTimeSlotsRequest,
            crate::models::delivery_slot::BulkBlockRequest,
            crate::models::delivery_slot::CreateDefaultSlotsRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "delivery_slots", description = "Delivery time-slot scheduling")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_delivery_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/delivery-slots/block-date"));
        assert!(doc.paths.paths.contains_key("/delivery-slots/available-time-slots"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
