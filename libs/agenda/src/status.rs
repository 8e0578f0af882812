use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AgendaError;

/// Lifecycle of an appointment.
///
/// `Pendiente` is the initial state. Everything except `Pendiente` and
/// `Confirmada` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    #[serde(rename = "Pendiente")]
    Pending,
    #[serde(rename = "Confirmada")]
    Confirmed,
    #[serde(rename = "Completa", alias = "Completada")]
    Completed,
    #[serde(rename = "Cancelada")]
    Cancelled,
    #[serde(rename = "Expirada")]
    Expired,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Completed,
        Self::Cancelled,
        Self::Expired,
    ];

    /// Statuses that still occupy the barber's time.
    pub const ACTIVE: [AppointmentStatus; 2] = [Self::Pending, Self::Confirmed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pendiente",
            Self::Confirmed => "Confirmada",
            Self::Completed => "Completa",
            Self::Cancelled => "Cancelada",
            Self::Expired => "Expirada",
        }
    }

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Users may only cancel appointments that have not settled yet.
    pub fn is_cancellable(self) -> bool {
        self.is_active()
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, Expired)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, Expired)
        )
    }

    pub fn transition(self, next: AppointmentStatus) -> Result<AppointmentStatus, AgendaError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AgendaError::IllegalTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; accepts `Completada` as a synonym of `Completa`.
impl FromStr for AppointmentStatus {
    type Err = AgendaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pendiente" => Ok(Self::Pending),
            "confirmada" => Ok(Self::Confirmed),
            "completa" | "completada" => Ok(Self::Completed),
            "cancelada" => Ok(Self::Cancelled),
            "expirada" => Ok(Self::Expired),
            _ => Err(AgendaError::UnknownStatus(s.to_string())),
        }
    }
}
