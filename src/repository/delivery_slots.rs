//! PostgreSQL store for delivery schedules

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{types::Json, FromRow, Pool, Postgres};

use super::SlotStore;
use crate::{
    error::{AppError, AppResult},
    models::delivery_slot::{DaySchedule, PageRequest, ScheduleFilter, SortField, TimeWindow},
};

#[derive(Debug, FromRow)]
struct DayScheduleRow {
    id: i32,
    slot_date: NaiveDate,
    time_slots: Json<Vec<TimeWindow>>,
    is_full_day_blocked: bool,
    blocked_reason: Option<String>,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DayScheduleRow> for DaySchedule {
    fn from(row: DayScheduleRow) -> Self {
        Self {
            id: Some(row.id),
            date: row.slot_date,
            time_slots: row.time_slots.0,
            is_full_day_blocked: row.is_full_day_blocked,
            blocked_reason: row.blocked_reason,
            created_by: row.created_by,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::Date => "slot_date",
        SortField::CreatedAt => "created_at",
        SortField::UpdatedAt => "updated_at",
    }
}

/// WHERE clause of a listing filter, with placeholders starting at $1
fn filter_clause(filter: &ScheduleFilter) -> String {
    let mut conditions = Vec::new();
    let mut idx = 1;

    if filter.start_date.is_some() {
        conditions.push(format!("slot_date >= ${}", idx));
        idx += 1;
    }
    if filter.end_date.is_some() {
        conditions.push(format!("slot_date <= ${}", idx));
        idx += 1;
    }
    if filter.is_blocked.is_some() {
        conditions.push(format!("is_full_day_blocked = ${}", idx));
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

#[derive(Clone)]
pub struct DeliverySlotsRepository {
    pool: Pool<Postgres>,
}

impl DeliverySlotsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SlotStore for DeliverySlotsRepository {
    async fn find_by_date(&self, date: NaiveDate) -> AppResult<Option<DaySchedule>> {
        let row = sqlx::query_as::<_, DayScheduleRow>(
            "SELECT * FROM delivery_time_slots WHERE slot_date = $1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DaySchedule::from))
    }

    async fn find_by_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        full_day_blocked: Option<bool>,
    ) -> AppResult<Vec<DaySchedule>> {
        let blocked_clause = if full_day_blocked.is_some() {
            " AND is_full_day_blocked = $3"
        } else {
            ""
        };
        let query = format!(
            "SELECT * FROM delivery_time_slots WHERE slot_date >= $1 AND slot_date <= $2{} ORDER BY slot_date",
            blocked_clause
        );

        let mut builder = sqlx::query_as::<_, DayScheduleRow>(&query).bind(start).bind(end);
        if let Some(blocked) = full_day_blocked {
            builder = builder.bind(blocked);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(DaySchedule::from).collect())
    }

    async fn upsert(&self, schedule: &DaySchedule) -> AppResult<DaySchedule> {
        let row = sqlx::query_as::<_, DayScheduleRow>(
            r#"
            INSERT INTO delivery_time_slots
                (slot_date, time_slots, is_full_day_blocked, blocked_reason, created_by)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (slot_date) DO UPDATE SET
                time_slots = EXCLUDED.time_slots,
                is_full_day_blocked = EXCLUDED.is_full_day_blocked,
                blocked_reason = EXCLUDED.blocked_reason,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(schedule.date)
        .bind(Json(&schedule.time_slots))
        .bind(schedule.is_full_day_blocked)
        .bind(&schedule.blocked_reason)
        .bind(schedule.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn create(&self, schedule: &DaySchedule) -> AppResult<DaySchedule> {
        let result = sqlx::query_as::<_, DayScheduleRow>(
            r#"
            INSERT INTO delivery_time_slots
                (slot_date, time_slots, is_full_day_blocked, blocked_reason, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(schedule.date)
        .bind(Json(&schedule.time_slots))
        .bind(schedule.is_full_day_blocked)
        .bind(&schedule.blocked_reason)
        .bind(schedule.created_by)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(AppError::Conflict(
                "Time slots already exist for this date".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn count_by_filter(&self, filter: &ScheduleFilter) -> AppResult<i64> {
        let query = format!("SELECT COUNT(*) FROM delivery_time_slots {}", filter_clause(filter));

        let mut builder = sqlx::query_scalar::<_, i64>(&query);
        if let Some(sd) = filter.start_date { builder = builder.bind(sd); }
        if let Some(ed) = filter.end_date { builder = builder.bind(ed); }
        if let Some(b) = filter.is_blocked { builder = builder.bind(b); }

        let total = builder.fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn list(&self, filter: &ScheduleFilter, page: &PageRequest) -> AppResult<Vec<DaySchedule>> {
        // Sort column and direction come from closed enums, never from raw input
        let query = format!(
            "SELECT * FROM delivery_time_slots {} ORDER BY {} {}, slot_date ASC LIMIT {} OFFSET {}",
            filter_clause(filter),
            sort_column(page.sort_by),
            page.sort_order.as_str().to_uppercase(),
            page.limit,
            page.offset()
        );

        let mut builder = sqlx::query_as::<_, DayScheduleRow>(&query);
        if let Some(sd) = filter.start_date { builder = builder.bind(sd); }
        if let Some(ed) = filter.end_date { builder = builder.bind(ed); }
        if let Some(b) = filter.is_blocked { builder = builder.bind(b); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(DaySchedule::from).collect())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_clause_placeholders() {
        assert_eq!(filter_clause(&ScheduleFilter::default()), "");

        let filter = ScheduleFilter {
            start_date: NaiveDate::from_ymd_opt(2030, 1, 1),
            end_date: None,
            is_blocked: Some(true),
        };
        assert_eq!(
            filter_clause(&filter),
            "WHERE slot_date >= $1 AND is_full_day_blocked = $2"
        );
    }

    #[test]
    fn test_sort_columns() {
        assert_eq!(sort_column(SortField::Date), "slot_date");
        assert_eq!(sort_column(SortField::UpdatedAt), "updated_at");
    }
}
