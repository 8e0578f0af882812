//! Scheduling domain shared by the barbershop server and its clients.
//!
//! Nothing in here performs I/O: clock arithmetic, the reservation rounding
//! rule, weekly working schedules, availability resolution and the
//! appointment status machine, plus the JSON shapes exchanged over HTTP.

pub mod availability;
pub mod clock;
pub mod error;
pub mod role;
pub mod schedule;
pub mod status;
pub mod wire;

pub use availability::resolve_start_times;
pub use clock::{
    format_minutes_of_day, parse_duration, reservation_minutes, ClockTime, Interval,
    RESERVATION_STEP_MINUTES,
};
pub use error::AgendaError;
pub use role::Role;
pub use schedule::{
    weekday_key, LunchBreak, ScheduleException, WorkingDay, WorkingSchedule, WEEKDAY_KEYS,
};
pub use status::AppointmentStatus;
