//! Delivery slot API endpoints (blocking, default schedules, availability)

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::delivery_slot::{
        AvailableSlots, AvailableSlotsQuery, BlockDateRequest, BlockTimeSlotsRequest, BlockedDate,
        BlockedDatesQuery, BulkBlockRequest, BulkBlockResult, CreateDefaultSlotsRequest,
        DaySchedule, DaySchedulePage, DaySchedulesQuery, PageRequest,
        ScheduleFilter, SortField, SortOrder, UnblockDateRequest, UnblockTimeSlotsRequest,
    },
    AppState,
};

use super::{parse_date_param, parse_optional_date, validate_request, AuthenticatedUser};

// ---- Administration ----

/// Block a full date
#[utoipa::path(
    post,
    path = "/delivery-slots/block-date",
    tag = "delivery_slots",
    security(("bearer_auth" = [])),
    request_body = BlockDateRequest,
    responses(
        (status = 200, description = "Date blocked", body = DaySchedule),
        (status = 400, description = "Invalid or past date", body = crate::error::ErrorResponse)
    )
)]
pub async fn block_full_date(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<BlockDateRequest>,
) -> AppResult<Json<DaySchedule>> {
    claims.require_admin()?;
    validate_request(&data)?;
    let date = parse_date_param(&state, "date", &data.date)?;
    let schedule = state
        .services
        .delivery_slots
        .block_full_date(date, &data.reason, Some(claims.user_id))
        .await?;
    Ok(Json(schedule))
}

/// Block specific windows of a date
#[utoipa::path(
    post,
    path = "/delivery-slots/block-time-slots",
    tag = "delivery_slots",
    security(("bearer_auth" = [])),
    request_body = BlockTimeSlotsRequest,
    responses(
        (status = 200, description = "Windows blocked", body = DaySchedule),
        (status = 409, description = "Requested windows overlap", body = crate::error::ErrorResponse)
    )
)]
pub async fn block_time_slots(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<BlockTimeSlotsRequest>,
) -> AppResult<Json<DaySchedule>> {
    claims.require_admin()?;
    validate_request(&data)?;
    let date = parse_date_param(&state, "date", &data.date)?;
    let schedule = state
        .services
        .delivery_slots
        .block_time_slots(date, &data.time_slots, Some(claims.user_id))
        .await?;
    Ok(Json(schedule))
}

/// Unblock a full date
#[utoipa::path(
    post,
    path = "/delivery-slots/unblock-date",
    tag = "delivery_slots",
    security(("bearer_auth" = [])),
    request_body = UnblockDateRequest,
    responses(
        (status = 200, description = "Date unblocked", body = DaySchedule),
        (status = 404, description = "No schedule for this date", body = crate::error::ErrorResponse)
    )
)]
pub async fn unblock_date(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<UnblockDateRequest>,
) -> AppResult<Json<DaySchedule>> {
    claims.require_admin()?;
    validate_request(&data)?;
    let date = parse_date_param(&state, "date", &data.date)?;
    let schedule = state.services.delivery_slots.unblock_date(date).await?;
    Ok(Json(schedule))
}

/// Unblock specific windows of a date
#[utoipa::path(
    post,
    path = "/delivery-slots/unblock-time-slots",
    tag = "delivery_slots",
    security(("bearer_auth" = [])),
    request_body = UnblockTimeSlotsRequest,
    responses(
        (status = 200, description = "Windows unblocked", body = DaySchedule),
        (status = 404, description = "No schedule for this date", body = crate::error::ErrorResponse)
    )
)]
pub async fn unblock_time_slots(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<UnblockTimeSlotsRequest>,
) -> AppResult<Json<DaySchedule>> {
    claims.require_admin()?;
    validate_request(&data)?;
    let date = parse_date_param(&state, "date", &data.date)?;
    let schedule = state
        .services
        .delivery_slots
        .unblock_time_slots(date, &data.time_slots)
        .await?;
    Ok(Json(schedule))
}

/// Block several full dates
#[utoipa::path(
    post,
    path = "/delivery-slots/bulk-block",
    tag = "delivery_slots",
    security(("bearer_auth" = [])),
    request_body = BulkBlockRequest,
    responses(
        (status = 200, description = "Dates blocked", body = BulkBlockResult),
        (status = 400, description = "A date is invalid or past", body = crate::error::ErrorResponse)
    )
)]
pub async fn bulk_block_dates(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<BulkBlockRequest>,
) -> AppResult<Json<BulkBlockResult>> {
    claims.require_admin()?;
    validate_request(&data)?;
    let dates = data
        .dates
        .iter()
        .map(|d| parse_date_param(&state, "date", d))
        .collect::<AppResult<Vec<_>>>()?;
    let result = state
        .services
        .delivery_slots
        .bulk_block_dates(&dates, &data.reason, Some(claims.user_id))
        .await?;
    Ok(Json(result))
}

/// Create the schedule of a date
#[utoipa::path(
    post,
    path = "/delivery-slots/create-default",
    tag = "delivery_slots",
    security(("bearer_auth" = [])),
    request_body = CreateDefaultSlotsRequest,
    responses(
        (status = 201, description = "Schedule created", body = DaySchedule),
        (status = 409, description = "Schedule already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_default_slots(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateDefaultSlotsRequest>,
) -> AppResult<(StatusCode, Json<DaySchedule>)> {
    claims.require_admin()?;
    validate_request(&data)?;
    let date = parse_date_param(&state, "date", &data.date)?;
    let schedule = state
        .services
        .delivery_slots
        .create_default_slots(date, Some(claims.user_id), data.default_slots.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// List stored schedules with filters and pagination
#[utoipa::path(
    get,
    path = "/delivery-slots/all",
    tag = "delivery_slots",
    security(("bearer_auth" = [])),
    params(DaySchedulesQuery),
    responses(
        (status = 200, description = "Schedules page", body = DaySchedulePage)
    )
)]
pub async fn list_all(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<DaySchedulesQuery>,
) -> AppResult<Json<DaySchedulePage>> {
    claims.require_admin()?;

    let sort_by = match query.sort_by.as_deref() {
        Some(s) => s.parse::<SortField>().map_err(AppError::Validation)?,
        None => SortField::CreatedAt,
    };
    let sort_order = match query.sort_order.as_deref() {
        Some(s) => s.parse::<SortOrder>().map_err(AppError::Validation)?,
        None => SortOrder::Desc,
    };
    let page = PageRequest::new(query.page, query.limit, sort_by, sort_order);

    let filter = ScheduleFilter {
        start_date: parse_optional_date(&state, "start_date", query.start_date.as_deref())?,
        end_date: parse_optional_date(&state, "end_date", query.end_date.as_deref())?,
        is_blocked: query.is_blocked,
    };

    let listing = state.services.delivery_slots.list_all(page, filter).await?;
    Ok(Json(listing))
}

// ---- Public ----

/// Fully blocked dates of a range
#[utoipa::path(
    get,
    path = "/delivery-slots/blocked-dates",
    tag = "delivery_slots",
    params(BlockedDatesQuery),
    responses(
        (status = 200, description = "Blocked dates", body = Vec<BlockedDate>)
    )
)]
pub async fn get_blocked_dates(
    State(state): State<AppState>,
    Query(query): Query<BlockedDatesQuery>,
) -> AppResult<Json<Vec<BlockedDate>>> {
    let start = parse_date_param(&state, "start_date", &query.start_date)?;
    let end = parse_date_param(&state, "end_date", &query.end_date)?;
    let dates = state.services.delivery_slots.get_blocked_dates(start, end).await?;
    Ok(Json(dates))
}

/// Available windows of a date, or of every stored date of a range
#[utoipa::path(
    get,
    path = "/delivery-slots/available-time-slots",
    tag = "delivery_slots",
    params(AvailableSlotsQuery),
    responses(
        (status = 200, description = "One day for `date`, an array of days for a range", body = crate::models::delivery_slot::DayAvailability),
        (status = 400, description = "Neither a date nor a full range given", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_available_slots(
    State(state): State<AppState>,
    Query(query): Query<AvailableSlotsQuery>,
) -> AppResult<Json<AvailableSlots>> {
    let date = parse_optional_date(&state, "date", query.date.as_deref())?;
    let start = parse_optional_date(&state, "start_date", query.start_date.as_deref())?;
    let end = parse_optional_date(&state, "end_date", query.end_date.as_deref())?;
    let slots = state
        .services
        .delivery_slots
        .get_available_slots(date, start, end)
        .await?;
    Ok(Json(slots))
}
