//! HR reporting over attendance records.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::actor::Actor;
use crate::attendance::calendar::{DateRange, ExpansionLimits};
use crate::attendance::retry::RetryPolicy;
use crate::attendance::store::AttendanceStore;
use crate::directory::EmployeeDirectory;
use crate::error::{AttendanceError, Result};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::employee::EmployeeProfile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Case-insensitive substring over name, email and employee code.
    pub search: Option<String>,
    /// Narrow the report to these employees; all must be in scope.
    pub employee_ids: Option<Vec<u64>>,
    /// Report days without a record as [`AttendanceEntry::Missing`].
    pub fill_gaps: bool,
}

impl AttendanceQuery {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            search: None,
            employee_ids: None,
            fill_gaps: false,
        }
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn employees(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.employee_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn fill_gaps(mut self, fill: bool) -> Self {
        self.fill_gaps = fill;
        self
    }

    /// Lowercased needle, or `None` when the text is blank.
    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// One line of an HR report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttendanceEntry {
    /// A stored record, including explicitly materialized absences.
    Recorded {
        record: AttendanceRecord,
        employee: EmployeeProfile,
    },
    /// No record exists for this employee-day.
    Missing {
        date: NaiveDate,
        employee: EmployeeProfile,
    },
}

impl AttendanceEntry {
    pub fn date(&self) -> NaiveDate {
        match self {
            AttendanceEntry::Recorded { record, .. } => record.date,
            AttendanceEntry::Missing { date, .. } => *date,
        }
    }

    pub fn employee(&self) -> &EmployeeProfile {
        match self {
            AttendanceEntry::Recorded { employee, .. } | AttendanceEntry::Missing { employee, .. } => {
                employee
            }
        }
    }

    pub fn record(&self) -> Option<&AttendanceRecord> {
        match self {
            AttendanceEntry::Recorded { record, .. } => Some(record),
            AttendanceEntry::Missing { .. } => None,
        }
    }

    /// Stored status, or the implied `ABSENT` of a gap.
    pub fn status(&self) -> AttendanceStatus {
        self.record()
            .map(|r| r.status)
            .unwrap_or(AttendanceStatus::Absent)
    }
}

/// Records of a range joined with the identities they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedRecords {
    /// Employees that passed scope and text filtering.
    pub employees: Vec<EmployeeProfile>,
    pub entries: Vec<AttendanceEntry>,
}

pub struct HrQueryService {
    store: Arc<dyn AttendanceStore>,
    directory: Arc<dyn EmployeeDirectory>,
    retry: RetryPolicy,
    max_fill_gap_cells: u64,
}

impl HrQueryService {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        directory: Arc<dyn EmployeeDirectory>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            directory,
            retry,
            max_fill_gap_cells: ExpansionLimits::default().max_fill_gap_cells,
        }
    }

    pub fn with_max_fill_gap_cells(mut self, cells: u64) -> Self {
        self.max_fill_gap_cells = cells;
        self
    }

    /// Attendance for the actor's employees over an inclusive range, newest
    /// day first, then by employee name.
    #[instrument(
        name = "hr_query_attendance",
        skip(self, actor, query),
        fields(
            hr_user_id = actor.user_id,
            start = %query.start_date,
            end = %query.end_date,
            fill_gaps = query.fill_gaps
        )
    )]
    pub async fn query_attendance(
        &self,
        actor: &Actor,
        query: &AttendanceQuery,
    ) -> Result<Vec<AttendanceEntry>> {
        actor.require_hr()?;
        let range = DateRange::new(query.start_date, query.end_date)?;

        let scope: Vec<u64> = match &query.employee_ids {
            Some(requested) => {
                if let Some(outside) = requested.iter().find(|id| !actor.can_see(**id)) {
                    return Err(AttendanceError::authorization(format!(
                        "Employee {outside} is outside your scope"
                    )));
                }
                requested
                    .iter()
                    .copied()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            }
            None => actor.visible_employee_ids.iter().copied().collect(),
        };

        // Checked against the whole scope so nothing is read when over.
        if query.fill_gaps {
            let cells = (scope.len() as u64).saturating_mul(range.len_days());
            if cells > self.max_fill_gap_cells {
                return Err(AttendanceError::RangeTooLarge {
                    what: "gap-filled employee days",
                    requested: cells,
                    limit: self.max_fill_gap_cells,
                });
            }
        }

        let ScopedRecords {
            employees,
            mut entries,
        } = self
            .find_by_range_and_employees(range, &scope, query.needle().as_deref())
            .await?;

        if query.fill_gaps {
            let recorded: BTreeSet<(u64, NaiveDate)> = entries
                .iter()
                .map(|e| (e.employee().id, e.date()))
                .collect();

            for employee in &employees {
                for date in range.days() {
                    if !recorded.contains(&(employee.id, date)) {
                        entries.push(AttendanceEntry::Missing {
                            date,
                            employee: employee.clone(),
                        });
                    }
                }
            }
            sort_entries(&mut entries);
        }

        debug!(
            employees = employees.len(),
            entries = entries.len(),
            "HR attendance query complete"
        );
        Ok(entries)
    }

    /// Records in `range` for `employee_ids`, restricted to employees whose
    /// name, email or code contains `needle` (already lowercased), joined with
    /// their identity and ordered by date desc, name asc.
    pub async fn find_by_range_and_employees(
        &self,
        range: DateRange,
        employee_ids: &[u64],
        needle: Option<&str>,
    ) -> Result<ScopedRecords> {
        if employee_ids.is_empty() {
            return Ok(ScopedRecords {
                employees: Vec::new(),
                entries: Vec::new(),
            });
        }

        let mut employees = self
            .retry
            .read("employee_profiles", || {
                self.directory.employees_by_ids(employee_ids)
            })
            .await?;
        // Only ids that were asked for, even if the directory returns more.
        employees.retain(|p| employee_ids.contains(&p.id));
        if let Some(needle) = needle {
            employees.retain(|p| p.matches(needle));
        }
        employees.sort_by_cached_key(|p| (p.name.to_lowercase(), p.id));

        let matched: Vec<u64> = employees.iter().map(|p| p.id).collect();
        if matched.is_empty() {
            return Ok(ScopedRecords {
                employees,
                entries: Vec::new(),
            });
        }

        let records = self
            .retry
            .read("attendance_range", || {
                self.store.find_by_range_and_employees(range, &matched)
            })
            .await?;

        let by_id: HashMap<u64, &EmployeeProfile> = employees.iter().map(|p| (p.id, p)).collect();
        let mut entries: Vec<AttendanceEntry> = records
            .into_iter()
            .filter(|r| range.contains(r.date))
            .filter_map(|record| {
                let employee = (*by_id.get(&record.employee_id)?).clone();
                Some(AttendanceEntry::Recorded { record, employee })
            })
            .collect();
        sort_entries(&mut entries);

        Ok(ScopedRecords { employees, entries })
    }
}

fn sort_entries(entries: &mut [AttendanceEntry]) {
    entries.sort_by_cached_key(|e| {
        (
            Reverse(e.date()),
            e.employee().name.to_lowercase(),
            e.employee().id,
        )
    });
}
