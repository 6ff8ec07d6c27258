use crate::api::attendance::{
    AttendanceResponse, HrAttendanceFilter, HrAttendanceResponse, HrAttendanceRow,
    MarkLeaveRequest, RecordAbsenceRequest, SummaryResponse, TodayResponse,
};
use crate::model::employee::EmployeeProfile;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance tracking

Daily check-in/check-out for employees and attendance reporting for HR.

### Features
- **Self service**
  - Check in, check out and view today's state
- **HR reporting**
  - Filter by date range, free text and employee, optionally with missing days and per-employee totals
- **Leave and absence**
  - Mark approved leave ranges and record explicit absences

### Security
All endpoints require a **JWT Bearer** access token.
HR endpoints only expose employees managed by the calling HR user.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::hr_attendance,
        crate::api::attendance::mark_leave,
        crate::api::attendance::record_absence
    ),
    components(
        schemas(
            AttendanceResponse,
            TodayResponse,
            HrAttendanceFilter,
            HrAttendanceRow,
            HrAttendanceResponse,
            SummaryResponse,
            MarkLeaveRequest,
            RecordAbsenceRequest,
            EmployeeProfile
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
