//! Repository layer for delivery schedule persistence

pub mod delivery_slots;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::delivery_slot::{DaySchedule, PageRequest, ScheduleFilter},
};

/// Persistence of day schedules, keyed by normalized date
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Schedule stored for a date
    async fn find_by_date(&self, date: NaiveDate) -> AppResult<Option<DaySchedule>>;

    /// Schedules between two dates (inclusive), ascending by date,
    /// optionally restricted by their full-day block flag
    async fn find_by_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        full_day_blocked: Option<bool>,
    ) -> AppResult<Vec<DaySchedule>>;

    /// Create or replace the schedule of its date. `created_by` of an
    /// existing record is kept.
    async fn upsert(&self, schedule: &DaySchedule) -> AppResult<DaySchedule>;

    /// Insert a schedule; `Conflict` if its date already has one
    async fn create(&self, schedule: &DaySchedule) -> AppResult<DaySchedule>;

    async fn count_by_filter(&self, filter: &ScheduleFilter) -> AppResult<i64>;

    /// One page of schedules matching the filter
    async fn list(&self, filter: &ScheduleFilter, page: &PageRequest) -> AppResult<Vec<DaySchedule>>;

    /// Connectivity check
    async fn ping(&self) -> AppResult<()>;
}

/// Main repository struct holding the schedule store
#[derive(Clone)]
pub struct Repository {
    pub delivery_slots: Arc<dyn SlotStore>,
}

impl Repository {
    /// Create a repository backed by PostgreSQL
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self::with_store(Arc::new(delivery_slots::DeliverySlotsRepository::new(pool)))
    }

    /// Create a repository backed by process memory
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(memory::MemorySlotStore::default()))
    }

    pub fn with_store(store: Arc<dyn SlotStore>) -> Self {
        Self { delivery_slots: store }
    }
}
