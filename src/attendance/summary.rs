use std::collections::BTreeMap;

use serde::Serialize;

use crate::attendance::query::AttendanceEntry;
use crate::model::attendance::AttendanceStatus;
use crate::model::employee::EmployeeProfile;

/// Per-employee totals over one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeSummary {
    pub employee: EmployeeProfile,
    pub present_days: u32,
    /// Stored `ABSENT` records only.
    pub absent_days: u32,
    pub leave_days: u32,
    /// Days with no record (only counted when gaps were filled).
    pub missing_days: u32,
    /// Sum of closed days, full precision.
    pub total_work_hours: f64,
}

impl EmployeeSummary {
    fn new(employee: EmployeeProfile) -> Self {
        Self {
            employee,
            present_days: 0,
            absent_days: 0,
            leave_days: 0,
            missing_days: 0,
            total_work_hours: 0.0,
        }
    }
}

/// Summaries ordered by employee name.
pub fn summarize(entries: &[AttendanceEntry]) -> Vec<EmployeeSummary> {
    let mut by_employee: BTreeMap<u64, EmployeeSummary> = BTreeMap::new();

    for entry in entries {
        let summary = by_employee
            .entry(entry.employee().id)
            .or_insert_with(|| EmployeeSummary::new(entry.employee().clone()));

        match entry.record() {
            None => summary.missing_days += 1,
            Some(record) => match record.status {
                AttendanceStatus::Present => {
                    summary.present_days += 1;
                    summary.total_work_hours += record.work_hours.unwrap_or(0.0);
                }
                AttendanceStatus::Absent => summary.absent_days += 1,
                AttendanceStatus::OnLeave => summary.leave_days += 1,
            },
        }
    }

    let mut summaries: Vec<_> = by_employee.into_values().collect();
    summaries.sort_by_cached_key(|s| (s.employee.name.to_lowercase(), s.employee.id));
    summaries
}
