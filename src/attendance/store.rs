use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlPool;
use tracing::{debug, info};

use crate::attendance::calendar::DateRange;
use crate::attendance::engine::{DayEvent, DayFacts};
use crate::error::{AttendanceError, Result};
use crate::model::attendance::AttendanceRecord;

/// Durable per-employee, per-day attendance facts.
///
/// Every write validates the transition with [`DayFacts::apply`] and persists
/// the derived record in one atomic step per `(employee_id, day)`.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Create the day's record if needed and set the check-in time.
    /// `Conflict` if the day already has a check-in.
    async fn upsert_check_in(
        &self,
        employee_id: u64,
        day: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord>;

    /// Set the check-out time. `State` if there is no check-in yet or the day
    /// is already closed; never creates a record.
    async fn upsert_check_out(
        &self,
        employee_id: u64,
        day: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord>;

    /// Idempotent leave overlay.
    async fn mark_leave(&self, employee_id: u64, day: NaiveDate) -> Result<AttendanceRecord>;

    /// Materialize an `ABSENT` record if the day has none; otherwise return
    /// the existing record unchanged.
    async fn record_absence(&self, employee_id: u64, day: NaiveDate) -> Result<AttendanceRecord>;

    async fn find_for_day(
        &self,
        employee_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>>;

    /// Records in `range` for the given employees, newest day first, then by
    /// employee id.
    async fn find_by_range_and_employees(
        &self,
        range: DateRange,
        employee_ids: &[u64],
    ) -> Result<Vec<AttendanceRecord>>;
}

/// Keep `IN (...)` lists well under MySQL's placeholder limit.
const MAX_IDS_PER_QUERY: usize = 1000;

const RECORD_COLUMNS: &str =
    "id, employee_id, date, check_in_time, check_out_time, on_leave, work_hours, status";

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Apply `event` (or just ensure the row exists when `None`) inside one
    /// transaction holding the row lock.
    async fn write(
        &self,
        employee_id: u64,
        day: NaiveDate,
        event: Option<DayEvent>,
    ) -> Result<AttendanceRecord> {
        match self.write_once(employee_id, day, event).await {
            // Lost the first-insert race, either on the unique key or as the
            // deadlock victim of two gap locks. The winner's row exists now, so
            // one more pass applies the event to it: a second check-in becomes
            // `Conflict`, the idempotent writes land on the existing row.
            Err(e) if is_insert_race(&e) => {
                debug!(employee_id, %day, error = %e, "Lost insert race, re-applying on existing row");
                self.write_once(employee_id, day, event).await
            }
            other => other,
        }
    }

    async fn write_once(
        &self,
        employee_id: u64,
        day: NaiveDate,
        event: Option<DayEvent>,
    ) -> Result<AttendanceRecord> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ? FOR UPDATE"
        ))
        .bind(employee_id)
        .bind(day)
        .fetch_optional(&mut *tx)
        .await?;

        let record = match (current, event) {
            (Some(existing), None) => existing,
            (Some(existing), Some(event)) => {
                let updated = DayFacts::of(&existing)
                    .apply(event)?
                    .into_record(existing.id, employee_id, day);

                if updated != existing {
                    sqlx::query(
                        r#"
                        UPDATE attendance
                        SET check_in_time = ?, check_out_time = ?, on_leave = ?,
                            work_hours = ?, status = ?
                        WHERE id = ?
                        "#,
                    )
                    .bind(updated.check_in_time)
                    .bind(updated.check_out_time)
                    .bind(updated.on_leave)
                    .bind(updated.work_hours)
                    .bind(updated.status.as_str())
                    .bind(updated.id)
                    .execute(&mut *tx)
                    .await?;
                }
                updated
            }
            (None, event) => {
                let facts = match event {
                    Some(event) => DayFacts::default().apply(event)?,
                    None => DayFacts::default(),
                };
                let draft = facts.into_record(0, employee_id, day);

                let result = sqlx::query(
                    r#"
                    INSERT INTO attendance
                        (employee_id, date, check_in_time, check_out_time, on_leave, work_hours, status)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(employee_id)
                .bind(day)
                .bind(draft.check_in_time)
                .bind(draft.check_out_time)
                .bind(draft.on_leave)
                .bind(draft.work_hours)
                .bind(draft.status.as_str())
                .execute(&mut *tx)
                .await?;

                AttendanceRecord {
                    id: result.last_insert_id(),
                    ..draft
                }
            }
        };

        tx.commit().await?;

        info!(
            employee_id,
            %day,
            status = %record.status,
            "Attendance record written"
        );
        Ok(record)
    }
}

/// SQLSTATE of a duplicate key (1062) and of a deadlock victim (1213).
const DUPLICATE_KEY: &str = "23000";
const DEADLOCK: &str = "40001";

fn is_insert_race(e: &AttendanceError) -> bool {
    match e {
        AttendanceError::Store(sqlx::Error::Database(db_err)) => {
            matches!(db_err.code().as_deref(), Some(DUPLICATE_KEY | DEADLOCK))
        }
        _ => false,
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn upsert_check_in(
        &self,
        employee_id: u64,
        day: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        self.write(employee_id, day, Some(DayEvent::CheckIn(at))).await
    }

    async fn upsert_check_out(
        &self,
        employee_id: u64,
        day: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        self.write(employee_id, day, Some(DayEvent::CheckOut(at))).await
    }

    async fn mark_leave(&self, employee_id: u64, day: NaiveDate) -> Result<AttendanceRecord> {
        self.write(employee_id, day, Some(DayEvent::Leave)).await
    }

    async fn record_absence(&self, employee_id: u64, day: NaiveDate) -> Result<AttendanceRecord> {
        self.write(employee_id, day, None).await
    }

    async fn find_for_day(
        &self,
        employee_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ?"
        ))
        .bind(employee_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_range_and_employees(
        &self,
        range: DateRange,
        employee_ids: &[u64],
    ) -> Result<Vec<AttendanceRecord>> {
        let mut records = Vec::new();

        for chunk in employee_ids.chunks(MAX_IDS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                r#"
                SELECT {RECORD_COLUMNS}
                FROM attendance
                WHERE date BETWEEN ? AND ?
                AND employee_id IN ({placeholders})
                ORDER BY date DESC, employee_id ASC
                "#
            );
            debug!(
                start = %range.start(),
                end = %range.end(),
                employees = chunk.len(),
                "Fetching attendance range"
            );

            let mut query = sqlx::query_as::<_, AttendanceRecord>(&sql)
                .bind(range.start())
                .bind(range.end());
            for id in chunk {
                query = query.bind(*id);
            }

            records.extend(query.fetch_all(&self.pool).await?);
        }

        if employee_ids.len() > MAX_IDS_PER_QUERY {
            records.sort_by(|a, b| b.date.cmp(&a.date).then(a.employee_id.cmp(&b.employee_id)));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::fmt;

    #[derive(Debug)]
    struct ServerError {
        sqlstate: &'static str,
    }

    impl fmt::Display for ServerError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "server error {}", self.sqlstate)
        }
    }

    impl std::error::Error for ServerError {}

    impl DatabaseError for ServerError {
        fn message(&self) -> &str {
            "server error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.sqlstate))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn server(sqlstate: &'static str) -> AttendanceError {
        AttendanceError::Store(sqlx::Error::Database(Box::new(ServerError { sqlstate })))
    }

    #[test]
    fn duplicate_key_and_deadlock_are_insert_races() {
        assert!(is_insert_race(&server("23000")));
        assert!(is_insert_race(&server("40001")));
    }

    #[test]
    fn other_failures_are_not_retried_as_races() {
        assert!(!is_insert_race(&server("42S02")));
        assert!(!is_insert_race(&AttendanceError::Store(sqlx::Error::PoolTimedOut)));
        assert!(!is_insert_race(&AttendanceError::conflict("Already checked in today")));
    }
}
