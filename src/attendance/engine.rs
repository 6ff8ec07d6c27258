//! Status and work-hours derivation, plus the per-day transition rules every
//! store applies inside its atomic write.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use strum_macros::Display;

use crate::error::{AttendanceError, Result};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};

/// The caller-supplied facts of one employee-day. Everything else on an
/// [`AttendanceRecord`] is derived from these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayFacts {
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub on_leave: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayEvent {
    CheckIn(DateTime<Utc>),
    CheckOut(DateTime<Utc>),
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DayState {
    NotStarted,
    CheckedIn,
    CheckedOut,
    OnLeave,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub status: AttendanceStatus,
    pub work_hours: Option<f64>,
}

impl DayFacts {
    pub fn of(record: &AttendanceRecord) -> Self {
        Self {
            check_in_time: record.check_in_time,
            check_out_time: record.check_out_time,
            on_leave: record.on_leave,
        }
    }

    pub fn state(&self) -> DayState {
        match (self.on_leave, self.check_in_time, self.check_out_time) {
            (true, _, _) => DayState::OnLeave,
            (false, None, _) => DayState::NotStarted,
            (false, Some(_), None) => DayState::CheckedIn,
            (false, Some(_), Some(_)) => DayState::CheckedOut,
        }
    }

    /// Validate `event` against the current state and return the new facts.
    /// On error `self` is untouched and nothing must be written.
    pub fn apply(self, event: DayEvent) -> Result<DayFacts> {
        match (self.state(), event) {
            (_, DayEvent::Leave) => Ok(DayFacts {
                on_leave: true,
                ..self
            }),
            (DayState::OnLeave, _) => Err(AttendanceError::state(
                "Day is marked as leave; attendance cannot be recorded",
            )),
            (DayState::NotStarted, DayEvent::CheckIn(at)) => Ok(DayFacts {
                check_in_time: Some(at),
                ..self
            }),
            (DayState::CheckedIn | DayState::CheckedOut, DayEvent::CheckIn(_)) => {
                Err(AttendanceError::conflict("Already checked in today"))
            }
            (DayState::NotStarted, DayEvent::CheckOut(_)) => Err(AttendanceError::state(
                "No active check-in found for today",
            )),
            (DayState::CheckedOut, DayEvent::CheckOut(_)) => {
                Err(AttendanceError::state("Already checked out today"))
            }
            (DayState::CheckedIn, DayEvent::CheckOut(at)) => {
                // CheckedIn guarantees a check-in time.
                match self.check_in_time {
                    Some(check_in) if at < check_in => Err(AttendanceError::state(
                        "Check-out cannot be earlier than check-in",
                    )),
                    _ => Ok(DayFacts {
                        check_out_time: Some(at),
                        ..self
                    }),
                }
            }
        }
    }

    pub fn derive(&self) -> Derived {
        if self.on_leave {
            return Derived {
                status: AttendanceStatus::OnLeave,
                work_hours: None,
            };
        }

        match (self.check_in_time, self.check_out_time) {
            (None, _) => Derived {
                status: AttendanceStatus::Absent,
                work_hours: None,
            },
            (Some(_), None) => Derived {
                status: AttendanceStatus::Present,
                work_hours: None,
            },
            (Some(check_in), Some(check_out)) => Derived {
                status: AttendanceStatus::Present,
                work_hours: Some(work_hours_between(check_in, check_out)),
            },
        }
    }

    /// Build the full record for these facts, derived fields included.
    pub fn into_record(self, id: u64, employee_id: u64, date: NaiveDate) -> AttendanceRecord {
        let derived = self.derive();
        AttendanceRecord {
            id,
            employee_id,
            date,
            check_in_time: self.check_in_time,
            check_out_time: self.check_out_time,
            on_leave: self.on_leave,
            work_hours: derived.work_hours,
            status: derived.status,
        }
    }
}

/// Elapsed hours at full precision; never negative.
pub fn work_hours_between(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> f64 {
    (check_out - check_in)
        .to_std()
        .map(|d| d.as_secs_f64() / 3600.0)
        .unwrap_or(0.0)
}

/// One decimal place, for display only.
pub fn round_for_display(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    #[test]
    fn day_states_render_in_wire_form() {
        assert_eq!(DayState::NotStarted.to_string(), "NOT_STARTED");
        assert_eq!(
            serde_json::to_value(DayState::CheckedOut).unwrap(),
            serde_json::json!("CHECKED_OUT")
        );
    }

    #[test]
    fn nine_to_half_past_five_is_eight_and_a_half_hours() {
        let facts = DayFacts::default()
            .apply(DayEvent::CheckIn(at(9, 0)))
            .unwrap()
            .apply(DayEvent::CheckOut(at(17, 30)))
            .unwrap();

        let derived = facts.derive();
        assert_eq!(derived.status, AttendanceStatus::Present);
        assert!((derived.work_hours.unwrap() - 8.5).abs() < 1e-9);
    }

    #[test]
    fn open_day_is_present_without_hours() {
        let facts = DayFacts::default().apply(DayEvent::CheckIn(at(9, 0))).unwrap();
        assert_eq!(facts.state(), DayState::CheckedIn);
        assert_eq!(
            facts.derive(),
            Derived {
                status: AttendanceStatus::Present,
                work_hours: None
            }
        );
    }

    #[test]
    fn no_check_in_is_absent() {
        assert_eq!(
            DayFacts::default().derive(),
            Derived {
                status: AttendanceStatus::Absent,
                work_hours: None
            }
        );
    }

    #[test]
    fn same_instant_check_out_is_zero_hours() {
        let facts = DayFacts::default()
            .apply(DayEvent::CheckIn(at(12, 0)))
            .unwrap()
            .apply(DayEvent::CheckOut(at(12, 0)))
            .unwrap();
        assert_eq!(facts.derive().work_hours, Some(0.0));
    }

    #[test]
    fn second_check_in_conflicts_and_keeps_the_first() {
        let first = DayFacts::default().apply(DayEvent::CheckIn(at(9, 0))).unwrap();
        let err = first.apply(DayEvent::CheckIn(at(10, 0))).unwrap_err();
        assert!(matches!(err, AttendanceError::Conflict(_)));
        assert_eq!(first.check_in_time, Some(at(9, 0)));

        let closed = first.apply(DayEvent::CheckOut(at(17, 0))).unwrap();
        assert!(matches!(
            closed.apply(DayEvent::CheckIn(at(18, 0))),
            Err(AttendanceError::Conflict(_))
        ));
    }

    #[test]
    fn check_out_out_of_order_is_a_state_error() {
        assert!(matches!(
            DayFacts::default().apply(DayEvent::CheckOut(at(17, 0))),
            Err(AttendanceError::State(_))
        ));

        let open = DayFacts::default().apply(DayEvent::CheckIn(at(9, 0))).unwrap();
        assert!(matches!(
            open.apply(DayEvent::CheckOut(at(8, 0))),
            Err(AttendanceError::State(_))
        ));

        let closed = open.apply(DayEvent::CheckOut(at(17, 0))).unwrap();
        assert!(matches!(
            closed.apply(DayEvent::CheckOut(at(18, 0))),
            Err(AttendanceError::State(_))
        ));
    }

    #[test]
    fn leave_overrides_times_and_is_terminal() {
        let worked = DayFacts::default()
            .apply(DayEvent::CheckIn(at(9, 0)))
            .unwrap()
            .apply(DayEvent::CheckOut(at(17, 0)))
            .unwrap();

        let leave = worked.apply(DayEvent::Leave).unwrap();
        assert_eq!(leave.check_in_time, worked.check_in_time);
        assert_eq!(
            leave.derive(),
            Derived {
                status: AttendanceStatus::OnLeave,
                work_hours: None
            }
        );
        assert_eq!(leave.apply(DayEvent::Leave).unwrap(), leave);

        let fresh_leave = DayFacts::default().apply(DayEvent::Leave).unwrap();
        assert!(matches!(
            fresh_leave.apply(DayEvent::CheckIn(at(9, 0))),
            Err(AttendanceError::State(_))
        ));
    }

    #[test]
    fn display_rounding_keeps_one_decimal() {
        assert_eq!(round_for_display(8.25), 8.3);
        assert_eq!(round_for_display(7.9999), 8.0);
        assert_eq!(round_for_display(0.04), 0.0);
    }

    proptest! {
        #[test]
        fn hours_match_elapsed_time(start in 0i64..86_400, secs in 0i64..86_400) {
            let check_in = at(0, 0) + Duration::seconds(start);
            let check_out = check_in + Duration::seconds(secs);
            let facts = DayFacts::default()
                .apply(DayEvent::CheckIn(check_in))
                .unwrap()
                .apply(DayEvent::CheckOut(check_out))
                .unwrap();
            let derived = facts.derive();

            prop_assert_eq!(derived.status, AttendanceStatus::Present);
            let hours = derived.work_hours.unwrap();
            prop_assert!(hours >= 0.0);
            prop_assert!((hours - secs as f64 / 3600.0).abs() < 1e-9);
        }

        #[test]
        fn leave_always_wins(check_in in proptest::option::of(0i64..43_200), worked in proptest::option::of(0i64..43_200)) {
            let facts = DayFacts {
                check_in_time: check_in.map(|s| at(0, 0) + Duration::seconds(s)),
                check_out_time: check_in
                    .zip(worked)
                    .map(|(s, w)| at(0, 0) + Duration::seconds(s + w)),
                on_leave: false,
            };
            let once = facts.apply(DayEvent::Leave).unwrap();
            let twice = once.apply(DayEvent::Leave).unwrap();

            prop_assert_eq!(once, twice);
            prop_assert_eq!(once.derive().status, AttendanceStatus::OnLeave);
            prop_assert_eq!(once.derive().work_hours, None);
        }
    }
}
