//! Employee self-service check-in/out, and the leave entry point used by the
//! leave-approval side of the application.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::actor::Actor;
use crate::attendance::calendar::{DateRange, DayBoundary, ExpansionLimits};
use crate::attendance::engine::{DayFacts, DayState};
use crate::attendance::store::AttendanceStore;
use crate::error::{AttendanceError, Result};
use crate::model::attendance::AttendanceRecord;
use crate::model::role::Role;

/// What an employee's own view renders from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayAttendance {
    pub date: NaiveDate,
    pub state: DayState,
    pub record: Option<AttendanceRecord>,
}

pub struct AttendanceController {
    store: Arc<dyn AttendanceStore>,
    max_leave_days: u64,
}

impl AttendanceController {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self {
            store,
            max_leave_days: ExpansionLimits::default().max_leave_days,
        }
    }

    pub fn with_max_leave_days(mut self, days: u64) -> Self {
        self.max_leave_days = days;
        self
    }

    #[instrument(name = "attendance_check_in", skip(self, actor, boundary), fields(user_id = actor.user_id))]
    pub async fn check_in(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
        boundary: DayBoundary,
    ) -> Result<AttendanceRecord> {
        let employee_id = actor.require_employee()?;
        let day = boundary.day_of(now);

        let record = self.store.upsert_check_in(employee_id, day, now).await.inspect_err(|e| {
            info!(error = %e, employee_id, %day, "Check-in rejected");
        })?;

        info!(employee_id, %day, "Checked in");
        Ok(record)
    }

    #[instrument(name = "attendance_check_out", skip(self, actor, boundary), fields(user_id = actor.user_id))]
    pub async fn check_out(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
        boundary: DayBoundary,
    ) -> Result<AttendanceRecord> {
        let employee_id = actor.require_employee()?;
        let day = boundary.day_of(now);

        let record = self.store.upsert_check_out(employee_id, day, now).await.inspect_err(|e| {
            info!(error = %e, employee_id, %day, "Check-out rejected");
        })?;

        info!(employee_id, %day, work_hours = ?record.work_hours, "Checked out");
        Ok(record)
    }

    /// The persisted state of the actor's current day.
    pub async fn today(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
        boundary: DayBoundary,
    ) -> Result<TodayAttendance> {
        let employee_id = actor.require_employee()?;
        let date = boundary.day_of(now);
        let record = self.store.find_for_day(employee_id, date).await?;

        let state = record
            .as_ref()
            .map(|r| DayFacts::of(r).state())
            .unwrap_or(DayState::NotStarted);

        Ok(TodayAttendance {
            date,
            state,
            record,
        })
    }

    /// Mark every day of `[start, end]` as leave for `employee_id`. Callable
    /// by the system account or by HR for employees in scope. Each day is its
    /// own atomic write, so a failed call can be repeated safely.
    #[instrument(name = "attendance_mark_leave", skip(self, actor), fields(user_id = actor.user_id))]
    pub async fn mark_leave(
        &self,
        actor: &Actor,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        match actor.role {
            Role::System => {}
            Role::Hr if actor.can_see(employee_id) => {}
            Role::Hr => {
                return Err(AttendanceError::authorization(format!(
                    "Employee {employee_id} is outside your scope"
                )));
            }
            _ => return Err(AttendanceError::authorization("HR/System only")),
        }
        let range = DateRange::new(start, end)?;
        if range.len_days() > self.max_leave_days {
            return Err(AttendanceError::RangeTooLarge {
                what: "leave days",
                requested: range.len_days(),
                limit: self.max_leave_days,
            });
        }

        let mut records = Vec::new();
        for day in range.days() {
            records.push(self.store.mark_leave(employee_id, day).await?);
        }

        info!(employee_id, %start, %end, days = records.len(), "Leave marked");
        Ok(records)
    }

    /// Materialize an explicit absence for an employee in the HR actor's scope.
    #[instrument(name = "attendance_record_absence", skip(self, actor), fields(user_id = actor.user_id))]
    pub async fn record_absence(
        &self,
        actor: &Actor,
        employee_id: u64,
        day: NaiveDate,
    ) -> Result<AttendanceRecord> {
        actor.require_hr()?;
        if !actor.can_see(employee_id) {
            return Err(AttendanceError::authorization(format!(
                "Employee {employee_id} is outside your scope"
            )));
        }

        self.store.record_absence(employee_id, day).await
    }
}
