//! Delivery time slot models (day schedules, windows, requests)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::timeutil::{self, TimeOfDay};

// ---------------------------------------------------------------------------
// TimeWindow
// ---------------------------------------------------------------------------

/// A delivery window within a day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeWindow {
    /// Window start (HH:mm)
    #[schema(value_type = String, example = "09:00")]
    pub start_time: TimeOfDay,
    /// Window end (HH:mm), exclusive
    #[schema(value_type = String, example = "10:00")]
    pub end_time: TimeOfDay,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<i32>,
    /// Bookings recorded by the order subsystem
    #[serde(default)]
    pub current_bookings: i32,
}

impl TimeWindow {
    /// Unblocked window with no bookings
    pub fn open(start_time: TimeOfDay, end_time: TimeOfDay) -> Self {
        Self {
            start_time,
            end_time,
            is_blocked: false,
            blocked_reason: None,
            max_capacity: None,
            current_bookings: 0,
        }
    }

    /// Blocked window with no bookings
    pub fn blocked(start_time: TimeOfDay, end_time: TimeOfDay, reason: String) -> Self {
        let mut window = Self::open(start_time, end_time);
        window.block(reason);
        window
    }

    pub fn overlaps(&self, start: TimeOfDay, end: TimeOfDay) -> bool {
        timeutil::overlaps(self.start_time, self.end_time, start, end)
    }

    pub fn block(&mut self, reason: String) {
        self.is_blocked = true;
        self.blocked_reason = Some(reason);
    }

    pub fn unblock(&mut self) {
        self.is_blocked = false;
        self.blocked_reason = None;
    }
}

// ---------------------------------------------------------------------------
// DaySchedule
// ---------------------------------------------------------------------------

/// Delivery schedule of one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DaySchedule {
    /// Store identifier, absent until persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    /// Normalized date (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Windows ascending by start time, never overlapping
    pub time_slots: Vec<TimeWindow>,
    pub is_full_day_blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    /// Administrator who first created the record
    pub created_by: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DaySchedule {
    /// Unsaved schedule with the given windows
    pub fn new(date: NaiveDate, mut time_slots: Vec<TimeWindow>, created_by: Option<i32>) -> Self {
        time_slots.sort_by_key(|w| (w.start_time, w.end_time));
        Self {
            id: None,
            date,
            time_slots,
            is_full_day_blocked: false,
            blocked_reason: None,
            created_by,
            created_at: None,
            updated_at: None,
        }
    }

    /// Unsaved schedule seeded with the default windows
    pub fn seeded(date: NaiveDate, created_by: Option<i32>) -> Self {
        Self::new(date, timeutil::default_schedule(), created_by)
    }

    /// Insert a window keeping start-time order.
    /// The caller guarantees it overlaps no existing window.
    pub fn insert_window(&mut self, window: TimeWindow) {
        let idx = self
            .time_slots
            .partition_point(|w| (w.start_time, w.end_time) < (window.start_time, window.end_time));
        self.time_slots.insert(idx, window);
    }

    pub fn has_blocked_window(&self) -> bool {
        self.time_slots.iter().any(|w| w.is_blocked)
    }

    /// Whether any two windows overlap
    pub fn has_overlap(&self) -> bool {
        let intervals: Vec<_> = self
            .time_slots
            .iter()
            .map(|w| (w.start_time, w.end_time))
            .collect();
        timeutil::has_pairwise_overlap(&intervals)
    }

    pub fn set_day_block(&mut self, reason: String) {
        self.is_full_day_blocked = true;
        self.blocked_reason = Some(reason);
    }

    pub fn clear_day_block(&mut self) {
        self.is_full_day_blocked = false;
        self.blocked_reason = None;
    }

    /// Public view restricted to unblocked windows
    pub fn availability(&self) -> DayAvailability {
        DayAvailability {
            date: self.date,
            time_slots: self
                .time_slots
                .iter()
                .filter(|w| !w.is_blocked)
                .cloned()
                .collect(),
            is_full_day_blocked: self.is_full_day_blocked,
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Available windows of one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub time_slots: Vec<TimeWindow>,
    pub is_full_day_blocked: bool,
}

/// Availability for a single date or for every stored date of a range
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AvailableSlots {
    Day(DayAvailability),
    Range(Vec<DayAvailability>),
}

/// A fully blocked date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BlockedDate {
    pub date: NaiveDate,
    pub blocked_reason: Option<String>,
}

/// Outcome of a bulk block
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkBlockResult {
    pub count: usize,
    pub results: Vec<DaySchedule>,
}

/// Pagination metadata of the admin listing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub sort_by: String,
    pub sort_order: String,
}

/// Admin listing page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DaySchedulePage {
    pub meta: ListMeta,
    pub data: Vec<DaySchedule>,
}

// ---------------------------------------------------------------------------
// Store filters
// ---------------------------------------------------------------------------

/// Filters of the admin listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Matches `is_full_day_blocked`
    pub is_blocked: Option<bool>,
}

impl ScheduleFilter {
    pub fn matches(&self, schedule: &DaySchedule) -> bool {
        self.start_date.map_or(true, |s| schedule.date >= s)
            && self.end_date.map_or(true, |e| schedule.date <= e)
            && self.is_blocked.map_or(true, |b| schedule.is_full_day_blocked == b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Date,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Date => "date",
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(SortField::Date),
            "createdAt" | "created_at" => Ok(SortField::CreatedAt),
            "updatedAt" | "updated_at" => Ok(SortField::UpdatedAt),
            _ => Err(format!("Invalid sort field: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(format!("Invalid sort order: {}", s)),
        }
    }
}

/// Resolved pagination of the admin listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>, sort_by: SortField, sort_order: SortOrder) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
            sort_by,
            sort_order,
        }
    }

    /// Rows skipped before this page; saturates instead of overflowing
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None, SortField::CreatedAt, SortOrder::Desc)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A window to block (times as HH:mm)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlockWindow {
    pub start_time: String,
    pub end_time: String,
    /// Defaults to "Blocked"
    pub reason: Option<String>,
}

/// A window to unblock (times as HH:mm)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnblockWindow {
    pub start_time: String,
    pub end_time: String,
}

/// A window of a custom default schedule
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomWindow {
    pub start_time: String,
    pub end_time: String,
    pub is_blocked: Option<bool>,
    pub blocked_reason: Option<String>,
    pub max_capacity: Option<i32>,
    pub current_bookings: Option<i32>,
}

/// Block a full date
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BlockDateRequest {
    /// Date (YYYY-MM-DD or RFC 3339)
    #[validate(length(min = 1, message = "Date is required"))]
    pub date: String,
    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
}

/// Block specific windows of a date
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BlockTimeSlotsRequest {
    #[validate(length(min = 1, message = "Date is required"))]
    pub date: String,
    #[validate(length(min = 1, message = "At least one time slot is required"))]
    pub time_slots: Vec<BlockWindow>,
}

/// Unblock a full date
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UnblockDateRequest {
    #[validate(length(min = 1, message = "Date is required"))]
    pub date: String,
}

/// Unblock specific windows of a date
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UnblockTimeSlotsRequest {
    #[validate(length(min = 1, message = "Date is required"))]
    pub date: String,
    #[validate(length(min = 1, message = "At least one time slot is required"))]
    pub time_slots: Vec<UnblockWindow>,
}

/// Block several full dates
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkBlockRequest {
    #[validate(length(min = 1, message = "At least one date is required"))]
    pub dates: Vec<String>,
    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
}

/// Create the schedule of a date
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDefaultSlotsRequest {
    #[validate(length(min = 1, message = "Date is required"))]
    pub date: String,
    /// Custom windows replacing the 09:00-21:00 hourly default
    pub default_slots: Option<Vec<CustomWindow>>,
}

/// Query parameters for available windows
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AvailableSlotsQuery {
    /// Single date (YYYY-MM-DD)
    pub date: Option<String>,
    /// Range start (YYYY-MM-DD), requires end_date
    pub start_date: Option<String>,
    /// Range end (YYYY-MM-DD), requires start_date
    pub end_date: Option<String>,
}

/// Query parameters for blocked dates
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BlockedDatesQuery {
    /// Range start (YYYY-MM-DD)
    pub start_date: String,
    /// Range end (YYYY-MM-DD)
    pub end_date: String,
}

/// Query parameters for the admin listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct DaySchedulesQuery {
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page
    pub limit: Option<i64>,
    /// date, createdAt or updatedAt
    pub sort_by: Option<String>,
    /// asc or desc
    pub sort_order: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Filter by full-day block
    pub is_blocked: Option<bool>,
}
