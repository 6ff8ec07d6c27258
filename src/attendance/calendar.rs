use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

use crate::error::{AttendanceError, Result};

/// Which calendar day a moment belongs to. Supplied by the caller; the core
/// never decides this from the host clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary {
    offset: FixedOffset,
}

impl DayBoundary {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::new)
    }

    pub fn day_of(&self, moment: DateTime<Utc>) -> NaiveDate {
        moment.with_timezone(&self.offset).date_naive()
    }
}

impl Default for DayBoundary {
    fn default() -> Self {
        Self::utc()
    }
}

/// Inclusive `[start, end]` range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AttendanceError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    /// Number of days in the range, both ends included.
    pub fn len_days(&self) -> u64 {
        self.end.signed_duration_since(self.start).num_days() as u64 + 1
    }
}

/// Caps on work that grows with the requested range rather than with the
/// stored records. Plain record reads are never capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionLimits {
    /// Employees times days a gap-filled report may synthesize.
    pub max_fill_gap_cells: u64,
    /// Days a single leave request may mark.
    pub max_leave_days: u64,
}

impl Default for ExpansionLimits {
    fn default() -> Self {
        Self {
            max_fill_gap_cells: 500_000,
            max_leave_days: 366,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn boundary_shifts_late_utc_moments_into_the_next_day() {
        let moment = Utc.with_ymd_and_hms(2024, 3, 4, 22, 30, 0).unwrap();
        assert_eq!(DayBoundary::utc().day_of(moment), day(2024, 3, 4));

        let dhaka = DayBoundary::from_offset_minutes(6 * 60).unwrap();
        assert_eq!(dhaka.day_of(moment), day(2024, 3, 5));

        let new_york = DayBoundary::from_offset_minutes(-5 * 60).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 3, 5, 3, 0, 0).unwrap();
        assert_eq!(new_york.day_of(early), day(2024, 3, 4));
    }

    #[test]
    fn out_of_range_offsets_are_rejected() {
        assert!(DayBoundary::from_offset_minutes(24 * 60).is_none());
        assert!(DayBoundary::from_offset_minutes(i32::MAX).is_none());
    }

    #[test]
    fn inverted_range_is_invalid() {
        let err = DateRange::new(day(2024, 3, 31), day(2024, 3, 1)).unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidRange { .. }));
    }

    #[test]
    fn range_spans_months_without_truncation() {
        let range = DateRange::new(day(2024, 1, 30), day(2024, 3, 2)).unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(days.len(), 33);
        assert_eq!(days.first(), Some(&day(2024, 1, 30)));
        assert_eq!(days.last(), Some(&day(2024, 3, 2)));
        assert!(range.contains(day(2024, 2, 29)));
        assert!(!range.contains(day(2024, 3, 3)));
        assert_eq!(range.len_days(), 33);
    }

    #[test]
    fn single_day_and_extreme_ranges_count_without_iterating() {
        let one = DateRange::new(day(2024, 3, 4), day(2024, 3, 4)).unwrap();
        assert_eq!(one.len_days(), 1);

        let huge = DateRange::new(day(1000, 1, 1), day(9999, 12, 31)).unwrap();
        assert_eq!(huge.len_days(), 3_287_182);
    }
}
