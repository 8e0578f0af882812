use chrono::NaiveDate;

use crate::clock::{ClockTime, Interval};
use crate::schedule::WorkingSchedule;

/// Bookable start times for one barber on one date.
///
/// Candidates come from the day's allow-list. A candidate survives when the
/// block `[start, start + reservation)` overlaps neither the active lunch
/// window nor any interval in `booked`. When `after` is set, candidates at or
/// before it are dropped (used for "today"). The result is chronological.
pub fn resolve_start_times(
    schedule: &WorkingSchedule,
    date: NaiveDate,
    reservation: u32,
    booked: &[Interval],
    after: Option<ClockTime>,
) -> Vec<ClockTime> {
    let day = schedule.day_for(date);
    let lunch = schedule.lunch_window();

    day.start_times()
        .into_iter()
        .filter(|start| after.map_or(true, |cutoff| *start > cutoff))
        .filter(|start| {
            let block = start.span(reservation);
            let hits_lunch = lunch.is_some_and(|l| block.overlaps(&l));
            !hits_lunch && !booked.iter().any(|b| block.overlaps(b))
        })
        .collect()
}
