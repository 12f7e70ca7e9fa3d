//! In-process store for delivery schedules

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use super::SlotStore;
use crate::{
    error::{AppError, AppResult},
    models::delivery_slot::{DaySchedule, PageRequest, ScheduleFilter, SortField, SortOrder},
};

#[derive(Default)]
struct MemoryState {
    schedules: BTreeMap<NaiveDate, DaySchedule>,
    next_id: i32,
}

impl MemoryState {
    fn insert_new(&mut self, schedule: &DaySchedule) -> DaySchedule {
        self.next_id += 1;
        let now = Utc::now();
        let stored = DaySchedule {
            id: Some(self.next_id),
            created_at: Some(now),
            updated_at: Some(now),
            ..schedule.clone()
        };
        self.schedules.insert(stored.date, stored.clone());
        stored
    }
}

/// Schedules held in a date-ordered map; each call is atomic
#[derive(Default)]
pub struct MemorySlotStore {
    state: RwLock<MemoryState>,
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn find_by_date(&self, date: NaiveDate) -> AppResult<Option<DaySchedule>> {
        Ok(self.state.read().await.schedules.get(&date).cloned())
    }

    async fn find_by_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        full_day_blocked: Option<bool>,
    ) -> AppResult<Vec<DaySchedule>> {
        if start > end {
            return Ok(Vec::new());
        }
        let state = self.state.read().await;
        Ok(state
            .schedules
            .range(start..=end)
            .map(|(_, s)| s)
            .filter(|s| full_day_blocked.map_or(true, |b| s.is_full_day_blocked == b))
            .cloned()
            .collect())
    }

    async fn upsert(&self, schedule: &DaySchedule) -> AppResult<DaySchedule> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.schedules.get_mut(&schedule.date) {
            existing.time_slots = schedule.time_slots.clone();
            existing.is_full_day_blocked = schedule.is_full_day_blocked;
            existing.blocked_reason = schedule.blocked_reason.clone();
            existing.updated_at = Some(Utc::now());
            return Ok(existing.clone());
        }
        Ok(state.insert_new(schedule))
    }

    async fn create(&self, schedule: &DaySchedule) -> AppResult<DaySchedule> {
        let mut state = self.state.write().await;
        if state.schedules.contains_key(&schedule.date) {
            return Err(AppError::Conflict(
                "Time slots already exist for this date".to_string(),
            ));
        }
        Ok(state.insert_new(schedule))
    }

    async fn count_by_filter(&self, filter: &ScheduleFilter) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state.schedules.values().filter(|s| filter.matches(s)).count() as i64)
    }

    async fn list(&self, filter: &ScheduleFilter, page: &PageRequest) -> AppResult<Vec<DaySchedule>> {
        let state = self.state.read().await;
        let mut rows: Vec<&DaySchedule> = state.schedules.values().filter(|s| filter.matches(s)).collect();

        // Values come out date-ascending, so a stable sort keeps date as the tie-breaker
        rows.sort_by(|a, b| {
            let ordering = match page.sort_by {
                SortField::Date => a.date.cmp(&b.date),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            };
            match page.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        Ok(rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_keeps_creator_and_id() {
        let store = MemorySlotStore::default();
        let first = store.upsert(&DaySchedule::seeded(day(1), Some(3))).await.unwrap();
        assert_eq!(first.id, Some(1));

        let mut changed = DaySchedule::seeded(day(1), Some(99));
        changed.set_day_block("storm".into());
        let second = store.upsert(&changed).await.unwrap();
        assert_eq!(second.id, Some(1));
        assert_eq!(second.created_by, Some(3));
        assert!(second.is_full_day_blocked);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_create_rejects_existing_date() {
        let store = MemorySlotStore::default();
        store.create(&DaySchedule::seeded(day(2), None)).await.unwrap();
        let err = store.create(&DaySchedule::seeded(day(2), None)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_range_is_inclusive_and_ordered() {
        let store = MemorySlotStore::default();
        for d in [5, 1, 3, 9] {
            let mut s = DaySchedule::seeded(day(d), None);
            if d == 3 {
                s.set_day_block("holiday".into());
            }
            store.upsert(&s).await.unwrap();
        }

        let all = store.find_by_range(day(1), day(5), None).await.unwrap();
        let dates: Vec<_> = all.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![day(1), day(3), day(5)]);

        let blocked = store.find_by_range(day(1), day(9), Some(true)).await.unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].date, day(3));

        assert!(store.find_by_range(day(9), day(1), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_pages_and_counts() {
        let store = MemorySlotStore::default();
        for d in 1..=5 {
            store.upsert(&DaySchedule::seeded(day(d), None)).await.unwrap();
        }

        let filter = ScheduleFilter {
            start_date: Some(day(2)),
            ..Default::default()
        };
        assert_eq!(store.count_by_filter(&filter).await.unwrap(), 4);

        let page = PageRequest::new(Some(2), Some(3), SortField::Date, SortOrder::Desc);
        let rows = store.list(&filter, &page).await.unwrap();
        let dates: Vec<_> = rows.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![day(2)]);
    }
}
