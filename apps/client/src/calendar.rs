//! Month grid for the date step: six Sunday-first weeks.

use chrono::{Datelike, NaiveDate};

pub const GRID_CELLS: usize = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCell {
    /// Padding before the 1st or after the last day of the month.
    Blank,
    Day { date: NaiveDate, enabled: bool },
}

impl DayCell {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DayCell::Day { date, .. } => Some(*date),
            DayCell::Blank => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, DayCell::Day { enabled: true, .. })
    }
}

/// First day of the month `delta` months away from (year, month).
pub fn shift_month(year: i32, month: u32, delta: i32) -> Option<(i32, u32)> {
    let index = year * 12 + month as i32 - 1 + delta;
    let first = NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)?;
    Some((first.year(), first.month()))
}

/// The 42 cells of `month`. Days before `today` or after `horizon` are
/// disabled. `None` for an invalid month.
pub fn month_grid(year: i32, month: u32, today: NaiveDate, horizon: Option<NaiveDate>) -> Option<Vec<DayCell>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) = shift_month(year, month, 1)?;
    let days_in_month = NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .signed_duration_since(first)
        .num_days() as usize;
    let leading = first.weekday().num_days_from_sunday() as usize;

    let mut cells = vec![DayCell::Blank; leading];
    cells.extend(first.iter_days().take(days_in_month).map(|date| DayCell::Day {
        date,
        enabled: date >= today && horizon.map_or(true, |h| date <= h),
    }));
    cells.resize(GRID_CELLS, DayCell::Blank);
    Some(cells)
}
