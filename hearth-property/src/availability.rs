use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PropertyError;

/// A planned stay, `[check_in, check_out)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StayWindow {
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
}

impl StayWindow {
    pub fn new(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Result<Self, PropertyError> {
        if check_out <= check_in {
            return Err(PropertyError::InvalidStay(
                "check-out must be after check-in".to_string(),
            ));
        }
        Ok(Self { check_in, check_out })
    }

    /// Builds a window from optional query bounds. Both or neither must be given.
    pub fn from_bounds(
        check_in: Option<DateTime<Utc>>,
        check_out: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>, PropertyError> {
        match (check_in, check_out) {
            (Some(ci), Some(co)) => Self::new(ci, co).map(Some),
            (None, None) => Ok(None),
            _ => Err(PropertyError::InvalidStay(
                "checkIn and checkOut must be supplied together".to_string(),
            )),
        }
    }

    /// Three-case overlap test against an existing stay:
    /// the new check-in falls inside it, the new check-out falls inside it,
    /// or the new window fully contains it.
    pub fn overlaps(&self, existing: &StayWindow) -> bool {
        let check_in_inside =
            existing.check_in <= self.check_in && self.check_in < existing.check_out;
        let check_out_inside =
            existing.check_in < self.check_out && self.check_out <= existing.check_out;
        let contains = self.check_in <= existing.check_in && existing.check_out <= self.check_out;
        check_in_inside || check_out_inside || contains
    }

    /// Whole nights covered, rounded up.
    pub fn nights(&self) -> u32 {
        ceil_days(self.check_out - self.check_in)
    }
}

/// Number of days in `span`, rounded up; negative spans count as zero.
pub fn ceil_days(span: chrono::Duration) -> u32 {
    let millis = span.num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    ((millis + DAY_MS - 1) / DAY_MS) as u32
}

/// True when `candidate` overlaps none of the `existing` stays.
pub fn is_free<'a, I>(candidate: &StayWindow, existing: I) -> bool
where
    I: IntoIterator<Item = &'a StayWindow>,
{
    existing.into_iter().all(|stay| !candidate.overlaps(stay))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 14, 0, 0).unwrap()
    }

    fn window(a: u32, b: u32) -> StayWindow {
        StayWindow::new(day(a), day(b)).unwrap()
    }

    #[test]
    fn test_overlap_cases() {
        let existing = window(10, 15);
        assert!(window(12, 18).overlaps(&existing)); // check-in inside
        assert!(window(8, 12).overlaps(&existing)); // check-out inside
        assert!(window(8, 20).overlaps(&existing)); // contains
        assert!(window(11, 13).overlaps(&existing)); // contained
        assert!(window(10, 15).overlaps(&existing));
    }

    #[test]
    fn test_back_to_back_stays_do_not_overlap() {
        let existing = window(10, 15);
        assert!(!window(15, 18).overlaps(&existing));
        assert!(!window(5, 10).overlaps(&existing));
    }

    #[test]
    fn test_three_case_matches_half_open_intervals() {
        for a in 1..8u32 {
            for b in (a + 1)..9 {
                for c in 1..8u32 {
                    for d in (c + 1)..9 {
                        let x = window(a, b);
                        let y = window(c, d);
                        let half_open = x.check_in < y.check_out && y.check_in < x.check_out;
                        assert_eq!(x.overlaps(&y), half_open, "{a}-{b} vs {c}-{d}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_window_validation() {
        assert!(StayWindow::new(day(5), day(5)).is_err());
        assert!(StayWindow::from_bounds(Some(day(5)), None).is_err());
        assert!(StayWindow::from_bounds(None, None).unwrap().is_none());
    }

    #[test]
    fn test_ceil_days() {
        assert_eq!(ceil_days(Duration::days(3)), 3);
        assert_eq!(ceil_days(Duration::days(3) + Duration::seconds(1)), 4);
        assert_eq!(ceil_days(Duration::hours(2)), 1);
        assert_eq!(ceil_days(Duration::hours(-2)), 0);
        assert_eq!(window(1, 4).nights(), 3);
    }

    #[test]
    fn test_is_free() {
        let stays = vec![window(1, 3), window(5, 7)];
        assert!(is_free(&window(3, 5), &stays));
        assert!(!is_free(&window(2, 6), &stays));
    }
}
