//! Stale-response guard for availability queries.
//!
//! Every change of service, barber or date issues a new [`Ticket`] with a
//! higher generation. A response is applied only if its ticket is the latest
//! one, so a slow answer for an old date can never overwrite the slots of
//! the date currently selected.

use barberia_agenda::ClockTime;
use chrono::NaiveDate;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotQuery {
    pub servicio_id: i64,
    pub barbero_id: i64,
    pub fecha: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    pub query: SlotQuery,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SlotState {
    #[default]
    Idle,
    Loading,
    Ready(Vec<ClockTime>),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    generation: u64,
    state: SlotState,
}

impl AvailabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a query; anything still in flight becomes stale.
    pub fn request(&mut self, query: SlotQuery) -> Ticket {
        self.generation += 1;
        self.state = SlotState::Loading;
        Ticket {
            generation: self.generation,
            query,
        }
    }

    /// Apply a response. Returns `false` and leaves the state untouched
    /// when the ticket has been superseded.
    pub fn resolve(&mut self, ticket: Ticket, result: Result<Vec<ClockTime>, ClientError>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                "dropping stale availability for {} (generation {} < {})",
                ticket.query.fecha,
                ticket.generation,
                self.generation
            );
            return false;
        }
        self.state = match result {
            Ok(times) => SlotState::Ready(times),
            Err(e) => SlotState::Failed(e.to_string()),
        };
        true
    }

    /// Forget the current slots and invalidate any in-flight query.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = SlotState::Idle;
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SlotState::Loading
    }

    /// Resolved start times; empty unless the latest query succeeded.
    pub fn times(&self) -> &[ClockTime] {
        match &self.state {
            SlotState::Ready(times) => times,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_query(day: u32) -> SlotQuery {
        SlotQuery {
            servicio_id: 1,
            barbero_id: 2,
            fecha: NaiveDate::from_ymd_opt(2099, 3, day).unwrap(),
        }
    }

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_latest_response_wins() {
        let mut tracker = AvailabilityTracker::new();
        let first = tracker.request(make_query(2));
        let second = tracker.request(make_query(3));
        assert!(tracker.is_loading());

        assert!(tracker.resolve(second, Ok(vec![t("11:00")])));
        // The slower answer for the previous date arrives afterwards
        assert!(!tracker.resolve(first, Ok(vec![t("09:00")])));
        assert_eq!(tracker.times(), &[t("11:00")]);
    }

    #[test]
    fn test_failure_keeps_server_message() {
        let mut tracker = AvailabilityTracker::new();
        let ticket = tracker.request(make_query(2));
        let err = ClientError::from_response_body(400, r#"{"mensaje":"No se pueden consultar fechas pasadas"}"#);
        tracker.resolve(ticket, Err(err));
        assert_eq!(
            tracker.state(),
            &SlotState::Failed("No se pueden consultar fechas pasadas".into())
        );
        assert!(tracker.times().is_empty());
    }

    #[test]
    fn test_reset_invalidates_in_flight() {
        let mut tracker = AvailabilityTracker::new();
        let ticket = tracker.request(make_query(2));
        tracker.reset();
        assert!(!tracker.resolve(ticket, Ok(vec![t("09:00")])));
        assert_eq!(tracker.state(), &SlotState::Idle);
    }
}
