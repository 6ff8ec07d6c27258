use crate::attendance::controller::TodayAttendance;
use crate::attendance::engine::round_for_display;
use crate::attendance::query::{AttendanceEntry, AttendanceQuery};
use crate::attendance::summary::{EmployeeSummary, summarize};
use crate::auth::auth::AuthUser;
use crate::model::attendance::AttendanceRecord;
use crate::model::employee::EmployeeProfile;
use crate::state::AppState;
use actix_web::{HttpResponse, Responder, error::ErrorBadRequest, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "date": "2024-03-04",
    "check_in_time": "2024-03-04T09:00:00Z",
    "check_out_time": "2024-03-04T17:30:00Z",
    "work_hours": 8.5,
    "status": "PRESENT"
}))]
pub struct AttendanceResponse {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "2024-03-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub check_in_time: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub check_out_time: Option<DateTime<Utc>>,
    /// Rounded to one decimal
    pub work_hours: Option<f64>,
    #[schema(example = "PRESENT")]
    pub status: String,
}

impl From<AttendanceRecord> for AttendanceResponse {
    fn from(r: AttendanceRecord) -> Self {
        Self {
            id: r.id,
            employee_id: r.employee_id,
            date: r.date,
            check_in_time: r.check_in_time,
            check_out_time: r.check_out_time,
            work_hours: r.work_hours.map(round_for_display),
            status: r.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayResponse {
    #[schema(example = "2024-03-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// NOT_STARTED, CHECKED_IN, CHECKED_OUT or ON_LEAVE
    #[schema(example = "CHECKED_IN")]
    pub state: String,
    pub record: Option<AttendanceResponse>,
}

impl From<TodayAttendance> for TodayResponse {
    fn from(today: TodayAttendance) -> Self {
        Self {
            date: today.date,
            state: today.state.to_string(),
            record: today.record.map(AttendanceResponse::from),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct HrAttendanceFilter {
    /// First day, inclusive
    #[schema(example = "2024-03-01", format = "date", value_type = String)]
    #[param(value_type = String)]
    pub start_date: NaiveDate,
    /// Last day, inclusive
    #[schema(example = "2024-03-31", format = "date", value_type = String)]
    #[param(value_type = String)]
    pub end_date: NaiveDate,
    /// Search by name, email or employee code
    #[schema(example = "jane")]
    pub search: Option<String>,
    /// Comma separated employee ids to narrow the report to
    #[schema(example = "1,2")]
    pub employee_ids: Option<String>,
    /// Include days without any record as implicit absences
    pub fill_gaps: Option<bool>,
    /// Include per-employee totals
    pub summary: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HrAttendanceRow {
    /// "recorded" for stored records, "missing" for filled gaps
    #[schema(example = "recorded")]
    pub kind: String,
    pub id: Option<u64>,
    #[schema(example = "2024-03-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub check_in_time: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub check_out_time: Option<DateTime<Utc>>,
    pub work_hours: Option<f64>,
    #[schema(example = "PRESENT")]
    pub status: String,
    pub user: EmployeeProfile,
}

impl From<AttendanceEntry> for HrAttendanceRow {
    fn from(entry: AttendanceEntry) -> Self {
        let status = entry.status().as_str().to_string();
        match entry {
            AttendanceEntry::Recorded { record, employee } => Self {
                kind: "recorded".into(),
                id: Some(record.id),
                date: record.date,
                check_in_time: record.check_in_time,
                check_out_time: record.check_out_time,
                work_hours: record.work_hours.map(round_for_display),
                status,
                user: employee,
            },
            AttendanceEntry::Missing { date, employee } => Self {
                kind: "missing".into(),
                id: None,
                date,
                check_in_time: None,
                check_out_time: None,
                work_hours: None,
                status,
                user: employee,
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryResponse {
    pub employee_id: u64,
    pub name: String,
    pub present_days: u32,
    pub absent_days: u32,
    pub leave_days: u32,
    pub missing_days: u32,
    pub total_work_hours: f64,
}

impl From<EmployeeSummary> for SummaryResponse {
    fn from(s: EmployeeSummary) -> Self {
        Self {
            employee_id: s.employee.id,
            name: s.employee.name,
            present_days: s.present_days,
            absent_days: s.absent_days,
            leave_days: s.leave_days,
            missing_days: s.missing_days,
            total_work_hours: round_for_display(s.total_work_hours),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HrAttendanceResponse {
    pub data: Vec<HrAttendanceRow>,
    #[schema(example = 1)]
    pub total: usize,
    pub summary: Option<Vec<SummaryResponse>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkLeaveRequest {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2024-03-04", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-03-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordAbsenceRequest {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2024-03-04", format = "date", value_type = String)]
    pub date: NaiveDate,
}

/// `None` when the list is empty, so `employee_ids=` does not narrow.
fn parse_employee_ids(raw: &str) -> actix_web::Result<Option<Vec<u64>>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| ErrorBadRequest(json!({ "message": format!("Invalid employee id: {s}") })))
        })
        .collect::<actix_web::Result<Vec<u64>>>()?;

    Ok((!ids.is_empty()).then_some(ids))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully"
        })),
        (status = 400, description = "Day is marked as leave", body = Object, example = json!({
            "message": "Day is marked as leave; attendance cannot be recorded"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.into_actor(state.directory.as_ref()).await?;
    let record = state
        .controller
        .check_in(&actor, Utc::now(), state.day_boundary)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked in successfully",
        "data": AttendanceResponse::from(record)
    })))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully"
        })),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.into_actor(state.directory.as_ref()).await?;
    let record = state
        .controller
        .check_out(&actor, Utc::now(), state.day_boundary)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "data": AttendanceResponse::from(record)
    })))
}

/// Today's attendance for the calling employee
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's record and state", body = TodayResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.into_actor(state.directory.as_ref()).await?;
    let today = state
        .controller
        .today(&actor, Utc::now(), state.day_boundary)
        .await?;

    Ok(HttpResponse::Ok().json(TodayResponse::from(today)))
}

/// HR attendance report
#[utoipa::path(
    get,
    path = "/api/attendance/hr",
    params(HrAttendanceFilter),
    responses(
        (status = 200, description = "Attendance of the HR user's employees", body = HrAttendanceResponse),
        (status = 400, description = "start_date after end_date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR only, or employee outside scope")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn hr_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    filter: web::Query<HrAttendanceFilter>,
) -> actix_web::Result<impl Responder> {
    let filter = filter.into_inner();
    let actor = auth.into_actor(state.directory.as_ref()).await?;

    let mut query = AttendanceQuery::new(filter.start_date, filter.end_date)
        .fill_gaps(filter.fill_gaps.unwrap_or(false));
    if let Some(search) = filter.search {
        query = query.search(search);
    }
    let narrowed = match filter.employee_ids.as_deref() {
        Some(raw) => parse_employee_ids(raw)?,
        None => None,
    };
    if let Some(ids) = narrowed {
        query = query.employees(ids);
    }

    let entries = state.queries.query_attendance(&actor, &query).await?;

    let summary = filter
        .summary
        .unwrap_or(false)
        .then(|| summarize(&entries).into_iter().map(SummaryResponse::from).collect());
    let data: Vec<HrAttendanceRow> = entries.into_iter().map(HrAttendanceRow::from).collect();

    Ok(HttpResponse::Ok().json(HrAttendanceResponse {
        total: data.len(),
        data,
        summary,
    }))
}

/// Mark a date range as leave (leave-approval side)
#[utoipa::path(
    put,
    path = "/api/attendance/leave",
    request_body(
        content = MarkLeaveRequest,
        description = "Employee and inclusive date range",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave marked", body = Object, example = json!({
            "message": "Leave marked",
            "days": 3
        })),
        (status = 400, description = "start_date after end_date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/System only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mark_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<MarkLeaveRequest>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.into_actor(state.directory.as_ref()).await?;
    let records = state
        .controller
        .mark_leave(&actor, payload.employee_id, payload.start_date, payload.end_date)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave marked",
        "days": records.len()
    })))
}

/// Record an explicit absence
#[utoipa::path(
    put,
    path = "/api/attendance/absence",
    request_body = RecordAbsenceRequest,
    responses(
        (status = 200, description = "Absence recorded, or the existing record", body = AttendanceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR only, or employee outside scope")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn record_absence(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<RecordAbsenceRequest>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.into_actor(state.directory.as_ref()).await?;
    let record = state
        .controller
        .record_absence(&actor, payload.employee_id, payload.date)
        .await?;

    Ok(HttpResponse::Ok().json(AttendanceResponse::from(record)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_id_lists_tolerate_spaces_and_reject_garbage() {
        assert_eq!(parse_employee_ids(" 1, 2,,3 ").unwrap(), Some(vec![1, 2, 3]));
        assert!(parse_employee_ids("1,x").is_err());
    }

    #[test]
    fn empty_employee_id_list_does_not_narrow() {
        assert_eq!(parse_employee_ids("").unwrap(), None);
        assert_eq!(parse_employee_ids(" , ,").unwrap(), None);
    }
}
