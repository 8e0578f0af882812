use thiserror::Error;

use crate::status::AppointmentStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgendaError {
    #[error("Hora inválida: {0}")]
    InvalidTime(String),

    #[error("Duración inválida: {0}")]
    InvalidDuration(String),

    #[error("Fecha inválida: {0}")]
    InvalidDate(String),

    #[error("Día de la semana desconocido: {0}")]
    UnknownWeekday(String),

    #[error("Estado de cita desconocido: {0}")]
    UnknownStatus(String),

    #[error("La hora de fin del almuerzo debe ser posterior a la de inicio")]
    LunchEndBeforeStart,

    #[error("El horario de almuerzo debe durar al menos 30 minutos")]
    LunchTooShort,

    #[error("Una cita {} no puede pasar a {}", .from.as_str(), .to.as_str())]
    IllegalTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}
