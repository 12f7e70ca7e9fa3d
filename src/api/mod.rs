//! API handlers for the delivery slots REST endpoints

pub mod delivery_slots;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use validator::Validate;

use crate::{error::AppError, models::user::UserClaims, timeutil, AppResult, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Run derive-based request validation
pub(crate) fn validate_request<T: Validate>(data: &T) -> AppResult<()> {
    data.validate()
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// Parse and normalize a date parameter against the reference time zone
pub(crate) fn parse_date_param(state: &AppState, name: &str, value: &str) -> AppResult<NaiveDate> {
    timeutil::parse_date(value, &state.config.scheduling.reference_offset())
        .ok_or_else(|| AppError::Validation(format!("Invalid {}: '{}'", name, value)))
}

pub(crate) fn parse_optional_date(
    state: &AppState,
    name: &str,
    value: Option<&str>,
) -> AppResult<Option<NaiveDate>> {
    value.map(|v| parse_date_param(state, name, v)).transpose()
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let delivery = Router::new()
        // Administration
        .route("/block-date", post(delivery_slots::block_full_date))
        .route("/block-time-slots", post(delivery_slots::block_time_slots))
        .route("/unblock-date", post(delivery_slots::unblock_date))
        .route("/unblock-time-slots", post(delivery_slots::unblock_time_slots))
        .route("/bulk-block", post(delivery_slots::bulk_block_dates))
        .route("/create-default", post(delivery_slots::create_default_slots))
        .route("/all", get(delivery_slots::list_all))
        // Public
        .route("/blocked-dates", get(delivery_slots::get_blocked_dates))
        .route("/available-time-slots", get(delivery_slots::get_available_slots));

    let api_v1 = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/delivery-slots", delivery)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
