use std::sync::Arc;

use crate::attendance::calendar::{DayBoundary, ExpansionLimits};
use crate::attendance::controller::AttendanceController;
use crate::attendance::query::HrQueryService;
use crate::attendance::retry::RetryPolicy;
use crate::attendance::store::AttendanceStore;
use crate::directory::EmployeeDirectory;

/// Shared by all HTTP workers. Holds no per-request state.
pub struct AppState {
    pub controller: AttendanceController,
    pub queries: HrQueryService,
    pub directory: Arc<dyn EmployeeDirectory>,
    pub day_boundary: DayBoundary,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        directory: Arc<dyn EmployeeDirectory>,
        day_boundary: DayBoundary,
        read_retry: RetryPolicy,
        limits: ExpansionLimits,
    ) -> Self {
        Self {
            controller: AttendanceController::new(store.clone())
                .with_max_leave_days(limits.max_leave_days),
            queries: HrQueryService::new(store, directory.clone(), read_retry)
                .with_max_fill_gap_cells(limits.max_fill_gap_cells),
            directory,
            day_boundary,
        }
    }
}
