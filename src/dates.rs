use chrono::NaiveDate;
use std::fmt;

use crate::model::WorkoutDetailsContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// No workout was recorded on this day.
    NotSelectable(NaiveDate),
    Unparseable(String),
}

impl fmt::Display for DateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateError::NotSelectable(d) => write!(f, "No workouts recorded on {d}"),
            DateError::Unparseable(s) => write!(f, "Invalid workout date: {s}"),
        }
    }
}

impl std::error::Error for DateError {}

/// Result of a successful selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSelection {
    Changed(NaiveDate),
    Unchanged,
}

/// Parse a reference date. The backend sends `YYYY-MM-DD`, but full
/// timestamps are accepted and truncated to their calendar day.
pub fn parse_workout_date(raw: &str) -> Result<NaiveDate, DateError> {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .ok_or_else(|| DateError::Unparseable(raw.to_string()))
}

/// Known workout dates and the date the user picked.
#[derive(Debug, Default)]
pub struct DateController {
    dates: Vec<NaiveDate>,
    total_workouts: usize,
    selected: Option<NaiveDate>,
}

impl DateController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the reference list. Unparseable entries are skipped; the result
    /// is sorted ascending without duplicates.
    pub fn set_reference_dates(&mut self, ctx: &WorkoutDetailsContext) {
        let mut dates: Vec<NaiveDate> = ctx
            .workout_dates
            .iter()
            .filter_map(|raw| match parse_workout_date(raw) {
                Ok(d) => Some(d),
                Err(e) => {
                    log::warn!("{e}");
                    None
                }
            })
            .collect();
        dates.sort();
        dates.dedup();
        log::info!("Loaded {} workout dates", dates.len());
        self.dates = dates;
        self.total_workouts = ctx.total_workouts;
    }

    pub fn is_valid_date(&self, day: NaiveDate) -> bool {
        self.dates.binary_search(&day).is_ok()
    }

    /// Select `day` if a workout exists on it. Re-selecting the current date
    /// reports [`DateSelection::Unchanged`].
    pub fn select(&mut self, day: NaiveDate) -> Result<DateSelection, DateError> {
        if !self.is_valid_date(day) {
            return Err(DateError::NotSelectable(day));
        }
        if self.selected == Some(day) {
            return Ok(DateSelection::Unchanged);
        }
        self.selected = Some(day);
        Ok(DateSelection::Changed(day))
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn total_workouts(&self) -> usize {
        self.total_workouts
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Closest date with a workout, preferring the earlier one on ties.
    pub fn nearest_valid_date(&self, day: NaiveDate) -> Option<NaiveDate> {
        self.dates
            .iter()
            .copied()
            .min_by_key(|d| ((*d - day).num_days().abs(), *d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn controller(dates: &[&str]) -> DateController {
        let mut c = DateController::new();
        c.set_reference_dates(&WorkoutDetailsContext {
            status_code: 200,
            total_workouts: dates.len(),
            workout_dates: dates.iter().map(|s| s.to_string()).collect(),
            errors: Vec::new(),
        });
        c
    }

    #[test]
    fn only_reference_days_are_selectable() {
        let mut c = controller(&["2024-01-03", "2024-01-01"]);
        assert_eq!(c.dates(), [date("2024-01-01"), date("2024-01-03")]);
        assert!(!c.is_valid_date(date("2024-01-02")));
        assert_eq!(
            c.select(date("2024-01-02")),
            Err(DateError::NotSelectable(date("2024-01-02")))
        );
        assert_eq!(c.selected(), None);
        assert_eq!(
            c.select(date("2024-01-03")),
            Ok(DateSelection::Changed(date("2024-01-03")))
        );
        assert_eq!(c.selected(), Some(date("2024-01-03")));
    }

    #[test]
    fn reselecting_is_a_no_op() {
        let mut c = controller(&["2024-01-01"]);
        c.select(date("2024-01-01")).unwrap();
        assert_eq!(c.select(date("2024-01-01")), Ok(DateSelection::Unchanged));
        c.clear();
        assert_eq!(
            c.select(date("2024-01-01")),
            Ok(DateSelection::Changed(date("2024-01-01")))
        );
    }

    #[test]
    fn timestamps_and_junk_in_reference_list() {
        let c = controller(&["2024-02-10 06:30:00 -0500", "nope", "2024-02-10"]);
        assert_eq!(c.dates(), [date("2024-02-10")]);
        assert_eq!(c.total_workouts(), 3);
    }

    #[test]
    fn bounds_and_nearest() {
        let c = controller(&["2024-01-01", "2024-01-05", "2024-01-09"]);
        assert_eq!(c.first_date(), Some(date("2024-01-01")));
        assert_eq!(c.last_date(), Some(date("2024-01-09")));
        assert_eq!(c.nearest_valid_date(date("2024-01-07")), Some(date("2024-01-05")));
        assert_eq!(c.nearest_valid_date(date("2024-03-01")), Some(date("2024-01-09")));
        assert_eq!(DateController::new().nearest_valid_date(date("2024-01-01")), None);
    }
}
