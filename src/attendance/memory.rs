use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::attendance::calendar::DateRange;
use crate::attendance::engine::{DayEvent, DayFacts};
use crate::attendance::store::AttendanceStore;
use crate::error::Result;
use crate::model::attendance::AttendanceRecord;

#[derive(Default)]
struct Rows {
    by_key: BTreeMap<(u64, NaiveDate), AttendanceRecord>,
    last_id: u64,
}

/// Process-local store. The map key is the uniqueness constraint and the
/// mutex makes every read-validate-write a single step.
#[derive(Default)]
pub struct InMemoryAttendanceStore {
    rows: Mutex<Rows>,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> MutexGuard<'_, Rows> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(
        &self,
        employee_id: u64,
        day: NaiveDate,
        event: Option<DayEvent>,
    ) -> Result<AttendanceRecord> {
        let mut rows = self.rows();

        let (id, facts) = match rows.by_key.get(&(employee_id, day)).cloned() {
            Some(existing) => match event {
                Some(event) => (existing.id, DayFacts::of(&existing).apply(event)?),
                None => return Ok(existing),
            },
            None => {
                let facts = match event {
                    Some(event) => DayFacts::default().apply(event)?,
                    None => DayFacts::default(),
                };
                rows.last_id += 1;
                (rows.last_id, facts)
            }
        };

        let record = facts.into_record(id, employee_id, day);
        rows.by_key.insert((employee_id, day), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl AttendanceStore for InMemoryAttendanceStore {
    async fn upsert_check_in(
        &self,
        employee_id: u64,
        day: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        self.write(employee_id, day, Some(DayEvent::CheckIn(at)))
    }

    async fn upsert_check_out(
        &self,
        employee_id: u64,
        day: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        self.write(employee_id, day, Some(DayEvent::CheckOut(at)))
    }

    async fn mark_leave(&self, employee_id: u64, day: NaiveDate) -> Result<AttendanceRecord> {
        self.write(employee_id, day, Some(DayEvent::Leave))
    }

    async fn record_absence(&self, employee_id: u64, day: NaiveDate) -> Result<AttendanceRecord> {
        self.write(employee_id, day, None)
    }

    async fn find_for_day(
        &self,
        employee_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        Ok(self.rows().by_key.get(&(employee_id, day)).cloned())
    }

    async fn find_by_range_and_employees(
        &self,
        range: DateRange,
        employee_ids: &[u64],
    ) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<_> = self
            .rows()
            .by_key
            .values()
            .filter(|r| range.contains(r.date) && employee_ids.contains(&r.employee_id))
            .cloned()
            .collect();

        records.sort_by(|a, b| b.date.cmp(&a.date).then(a.employee_id.cmp(&b.employee_id)));
        Ok(records)
    }
}
