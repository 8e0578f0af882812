//! Client side of the barbershop agenda: an HTTP API client bound to an
//! injected [`Session`], plus the booking wizard, appointment board and
//! schedule editor controllers that drive it.

pub mod api;
pub mod board;
pub mod calendar;
pub mod error;
pub mod schedule_editor;
pub mod session;
pub mod tracker;
pub mod wizard;

pub use api::ApiClient;
pub use board::{AppointmentBoard, CancelOutcome, Layout, PendingCancel, StatusFilter, Viewport};
pub use calendar::{month_grid, DayCell, GRID_CELLS};
pub use error::ClientError;
pub use schedule_editor::ScheduleEditor;
pub use session::Session;
pub use tracker::{AvailabilityTracker, SlotQuery, SlotState, Ticket};
pub use wizard::{BookingWizard, ClientChoice, Review, Step, StepPlan, WizardError};
