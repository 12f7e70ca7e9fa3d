//! Delivery slot scheduling service
//!
//! Every mutation runs fetch-or-seed, mutate, persist while holding the lock
//! of its date, so concurrent edits of one date are serialized and edits of
//! different dates never wait on each other. Reads take no lock.

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{AppError, AppResult},
    models::delivery_slot::{
        AvailableSlots, BlockWindow, BlockedDate, BulkBlockResult, CustomWindow, DaySchedule,
        DaySchedulePage, ListMeta, PageRequest, ScheduleFilter, TimeWindow, UnblockWindow,
    },
    repository::Repository,
    timeutil::{self, Clock, TimeOfDay, DEFAULT_BLOCK_REASON},
};

type DateLocks = DashMap<NaiveDate, Arc<Mutex<()>>>;

/// Exclusive hold on one date; the map entry is dropped once nobody waits on it
struct DateLock {
    locks: Arc<DateLocks>,
    date: NaiveDate,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DateLock {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.date, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

fn parse_interval(start: &str, end: &str) -> AppResult<(TimeOfDay, TimeOfDay)> {
    let (start_time, end_time) = match (start.parse::<TimeOfDay>(), end.parse::<TimeOfDay>()) {
        (Ok(s), Ok(e)) => (s, e),
        _ => {
            return Err(AppError::Validation(
                "Invalid time format. Use HH:mm format".to_string(),
            ))
        }
    };
    if start_time >= end_time {
        return Err(AppError::Validation(format!(
            "Start time must be before end time for slot {}-{}",
            start, end
        )));
    }
    Ok((start_time, end_time))
}

fn ensure_disjoint(intervals: &[(TimeOfDay, TimeOfDay)]) -> AppResult<()> {
    if timeutil::has_pairwise_overlap(intervals) {
        return Err(AppError::Conflict("Time slots cannot overlap".to_string()));
    }
    Ok(())
}

fn require_reason(reason: &str) -> AppResult<()> {
    if reason.trim().is_empty() {
        return Err(AppError::Validation("Reason is required".to_string()));
    }
    Ok(())
}

fn custom_window(input: &CustomWindow) -> AppResult<TimeWindow> {
    let (start_time, end_time) = parse_interval(&input.start_time, &input.end_time)?;
    let current_bookings = input.current_bookings.unwrap_or(0);
    if current_bookings < 0 || input.max_capacity.is_some_and(|c| c < 0) {
        return Err(AppError::Validation(format!(
            "Capacity and bookings must not be negative for slot {}-{}",
            input.start_time, input.end_time
        )));
    }

    let is_blocked = input.is_blocked.unwrap_or(false);
    Ok(TimeWindow {
        start_time,
        end_time,
        is_blocked,
        blocked_reason: if is_blocked { input.blocked_reason.clone() } else { None },
        max_capacity: input.max_capacity,
        current_bookings,
    })
}

#[derive(Clone)]
pub struct DeliverySlotsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    locks: Arc<DateLocks>,
}

impl DeliverySlotsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            locks: Arc::new(DashMap::new()),
        }
    }

    async fn lock_date(&self, date: NaiveDate) -> DateLock {
        let mutex = self.locks.entry(date).or_default().value().clone();
        tracing::debug!("Waiting for schedule lock on {}", date);
        let guard = mutex.lock_owned().await;
        DateLock {
            locks: self.locks.clone(),
            date,
            guard: Some(guard),
        }
    }

    fn ensure_not_past(&self, date: NaiveDate, message: &str) -> AppResult<()> {
        if timeutil::is_past(date, self.clock.as_ref()) {
            tracing::warn!("Rejected past date {}: {}", date, message);
            return Err(AppError::TemporalViolation(message.to_string()));
        }
        Ok(())
    }

    /// Stored schedule, or an unsaved default one
    async fn fetch_or_seed(&self, date: NaiveDate, actor: Option<i32>) -> AppResult<DaySchedule> {
        Ok(self
            .repository
            .delivery_slots
            .find_by_date(date)
            .await?
            .unwrap_or_else(|| DaySchedule::seeded(date, actor)))
    }

    async fn fetch_existing(&self, date: NaiveDate) -> AppResult<DaySchedule> {
        self.repository
            .delivery_slots
            .find_by_date(date)
            .await?
            .ok_or_else(|| AppError::NotFound("No delivery slot found for this date".to_string()))
    }

    /// Block every window of a date and mark the whole day blocked
    pub async fn block_full_date(
        &self,
        date: NaiveDate,
        reason: &str,
        actor: Option<i32>,
    ) -> AppResult<DaySchedule> {
        self.ensure_not_past(date, "Cannot block dates in the past")?;
        require_reason(reason)?;

        let _lock = self.lock_date(date).await;
        let mut schedule = self.fetch_or_seed(date, actor).await?;
        for window in &mut schedule.time_slots {
            window.block(reason.to_string());
        }
        schedule.set_day_block(reason.to_string());

        let saved = self.repository.delivery_slots.upsert(&schedule).await?;
        tracing::info!("Blocked full date {} ({} windows)", date, saved.time_slots.len());
        Ok(saved)
    }

    /// Block the windows of a date overlapped by the requested ones.
    ///
    /// An existing window overlapped even partially is blocked as a whole;
    /// a requested window overlapping nothing is added as a new blocked one.
    pub async fn block_time_slots(
        &self,
        date: NaiveDate,
        windows: &[BlockWindow],
        actor: Option<i32>,
    ) -> AppResult<DaySchedule> {
        self.ensure_not_past(date, "Cannot block dates in the past")?;
        if windows.is_empty() {
            return Err(AppError::Validation("At least one time slot is required".to_string()));
        }

        let intervals = windows
            .iter()
            .map(|w| parse_interval(&w.start_time, &w.end_time))
            .collect::<AppResult<Vec<_>>>()?;
        ensure_disjoint(&intervals)?;

        let _lock = self.lock_date(date).await;
        let mut schedule = self.fetch_or_seed(date, actor).await?;
        let mut added = 0;

        for (request, &(start, end)) in windows.iter().zip(&intervals) {
            let reason = request
                .reason
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string());

            let mut matched = false;
            for window in schedule.time_slots.iter_mut().filter(|w| w.overlaps(start, end)) {
                window.block(reason.clone());
                matched = true;
            }

            if !matched {
                schedule.insert_window(TimeWindow::blocked(start, end, reason));
                added += 1;
            }
        }

        let saved = self.repository.delivery_slots.upsert(&schedule).await?;
        tracing::info!(
            "Blocked {} requested windows on {} ({} new)",
            windows.len(),
            date,
            added
        );
        Ok(saved)
    }

    /// Clear every block of a date
    pub async fn unblock_date(&self, date: NaiveDate) -> AppResult<DaySchedule> {
        let _lock = self.lock_date(date).await;
        let mut schedule = self.fetch_existing(date).await?;
        for window in &mut schedule.time_slots {
            window.unblock();
        }
        schedule.clear_day_block();

        let saved = self.repository.delivery_slots.upsert(&schedule).await?;
        tracing::info!("Unblocked date {}", date);
        Ok(saved)
    }

    /// Unblock the windows of a date overlapped by the given ones. The day
    /// block is lifted once no window remains blocked.
    pub async fn unblock_time_slots(
        &self,
        date: NaiveDate,
        windows: &[UnblockWindow],
    ) -> AppResult<DaySchedule> {
        if windows.is_empty() {
            return Err(AppError::Validation("At least one time slot is required".to_string()));
        }
        let intervals = windows
            .iter()
            .map(|w| parse_interval(&w.start_time, &w.end_time))
            .collect::<AppResult<Vec<_>>>()?;

        let _lock = self.lock_date(date).await;
        let mut schedule = self.fetch_existing(date).await?;
        for &(start, end) in &intervals {
            for window in schedule.time_slots.iter_mut().filter(|w| w.overlaps(start, end)) {
                window.unblock();
            }
        }
        if !schedule.has_blocked_window() {
            schedule.clear_day_block();
        }

        let saved = self.repository.delivery_slots.upsert(&schedule).await?;
        tracing::info!("Unblocked {} requested windows on {}", windows.len(), date);
        Ok(saved)
    }

    /// Block several dates one after the other. All dates are checked before
    /// any is touched; a later failure stops the batch.
    pub async fn bulk_block_dates(
        &self,
        dates: &[NaiveDate],
        reason: &str,
        actor: Option<i32>,
    ) -> AppResult<BulkBlockResult> {
        if dates.is_empty() {
            return Err(AppError::Validation("At least one date is required".to_string()));
        }
        require_reason(reason)?;
        for date in dates {
            self.ensure_not_past(*date, &format!("Cannot block past date: {}", date))?;
        }

        let mut results = Vec::with_capacity(dates.len());
        for date in dates {
            results.push(self.block_full_date(*date, reason, actor).await?);
        }

        tracing::info!("Successfully blocked {} dates", results.len());
        Ok(BulkBlockResult {
            count: results.len(),
            results,
        })
    }

    /// Create the schedule of a date from custom windows or the default day.
    /// Never overwrites an existing schedule.
    pub async fn create_default_slots(
        &self,
        date: NaiveDate,
        actor: Option<i32>,
        custom_slots: Option<&[CustomWindow]>,
    ) -> AppResult<DaySchedule> {
        self.ensure_not_past(date, "Cannot create slots for dates in the past")?;

        let windows = match custom_slots {
            Some(custom) => {
                let windows = custom.iter().map(custom_window).collect::<AppResult<Vec<_>>>()?;
                let intervals: Vec<_> = windows.iter().map(|w| (w.start_time, w.end_time)).collect();
                ensure_disjoint(&intervals)?;
                windows
            }
            None => timeutil::default_schedule(),
        };

        let _lock = self.lock_date(date).await;
        if self.repository.delivery_slots.find_by_date(date).await?.is_some() {
            tracing::warn!("Schedule for {} already exists", date);
            return Err(AppError::Conflict(
                "Time slots already exist for this date".to_string(),
            ));
        }

        let created = self
            .repository
            .delivery_slots
            .create(&DaySchedule::new(date, windows, actor))
            .await?;
        tracing::info!("Created schedule for {} with {} windows", date, created.time_slots.len());
        Ok(created)
    }

    /// Unblocked windows of one date, or of every stored date of a range.
    ///
    /// A single date without a record gets the default day (not persisted);
    /// a range simply omits dates without a record.
    pub async fn get_available_slots(
        &self,
        date: Option<NaiveDate>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AppResult<AvailableSlots> {
        match (date, start_date, end_date) {
            (Some(date), None, None) => {
                let view = match self.repository.delivery_slots.find_by_date(date).await? {
                    Some(schedule) => schedule.availability(),
                    None => DaySchedule::seeded(date, None).availability(),
                };
                Ok(AvailableSlots::Day(view))
            }
            (None, Some(start), Some(end)) => {
                if !timeutil::valid_range(start, end) {
                    return Err(AppError::Validation(
                        "Start date must be before or equal to end date".to_string(),
                    ));
                }
                let schedules = self
                    .repository
                    .delivery_slots
                    .find_by_range(start, end, None)
                    .await?;
                Ok(AvailableSlots::Range(
                    schedules.iter().map(DaySchedule::availability).collect(),
                ))
            }
            _ => Err(AppError::Validation(
                "Either date or both startDate and endDate must be provided".to_string(),
            )),
        }
    }

    /// Fully blocked dates of a range, ascending
    pub async fn get_blocked_dates(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<BlockedDate>> {
        if !timeutil::valid_range(start_date, end_date) {
            return Err(AppError::Validation(
                "Start date must be before or equal to end date".to_string(),
            ));
        }
        let schedules = self
            .repository
            .delivery_slots
            .find_by_range(start_date, end_date, Some(true))
            .await?;
        Ok(schedules
            .into_iter()
            .map(|s| BlockedDate {
                date: s.date,
                blocked_reason: s.blocked_reason,
            })
            .collect())
    }

    /// Admin listing of stored schedules
    pub async fn list_all(&self, page: PageRequest, filter: ScheduleFilter) -> AppResult<DaySchedulePage> {
        let data = self.repository.delivery_slots.list(&filter, &page).await?;
        let total = self.repository.delivery_slots.count_by_filter(&filter).await?;

        Ok(DaySchedulePage {
            meta: ListMeta {
                page: page.page,
                limit: page.limit,
                total,
                sort_by: page.sort_by.as_str().to_string(),
                sort_order: page.sort_order.as_str().to_string(),
            },
            data,
        })
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.repository.delivery_slots.ping().await
    }
}
