use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Per-day classification of an employee's attendance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    OnLeave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::OnLeave => "ON_LEAVE",
        }
    }
}

impl TryFrom<String> for AttendanceStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One row of the `attendance` table: the facts for one employee on one day.
///
/// `status` and `work_hours` are derived from the time fields and the leave
/// overlay; only the engine writes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub on_leave: bool,
    pub work_hours: Option<f64>,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_screaming_snake_case_on_the_wire() {
        assert_eq!(AttendanceStatus::OnLeave.as_str(), "ON_LEAVE");
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Present).unwrap(),
            "\"PRESENT\""
        );
        assert_eq!(
            AttendanceStatus::try_from("ABSENT".to_string()).unwrap(),
            AttendanceStatus::Absent
        );
        assert_eq!(AttendanceStatus::OnLeave.to_string(), "ON_LEAVE");
        assert!(AttendanceStatus::try_from("LATE".to_string()).is_err());
    }
}
