use axum::{http::StatusCode, Json};
use barberia_agenda::{
    format_minutes_of_day, parse_duration, reservation_minutes,
    wire::{CitaDetalle, Mensaje, Servicio},
    AgendaError, AppointmentStatus, ClockTime,
};
use serde::Deserialize;

// ── Errors ──

/// Handler error: status plus a `{ "mensaje": ... }` body shown verbatim to users.
pub type ApiError = (StatusCode, Json<Mensaje>);

pub fn api_error(status: StatusCode, mensaje: impl Into<String>) -> ApiError {
    (status, Json(Mensaje::new(mensaje)))
}

pub fn bad_request(mensaje: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, mensaje)
}

pub fn not_found(mensaje: impl Into<String>) -> ApiError {
    api_error(StatusCode::NOT_FOUND, mensaje)
}

pub fn conflict(mensaje: impl Into<String>) -> ApiError {
    api_error(StatusCode::CONFLICT, mensaje)
}

pub fn forbidden() -> ApiError {
    api_error(StatusCode::FORBIDDEN, "Acceso denegado")
}

/// Malformed query strings and JSON bodies get the same `{ "mensaje" }`
/// shape as every other error.
pub fn rejection(e: impl std::fmt::Display) -> ApiError {
    tracing::warn!("rejected request: {}", e);
    bad_request("Solicitud inválida: revisa los datos enviados")
}

/// Log a database failure with context and hide the details from the caller.
pub fn db_error(context: &str, e: impl std::fmt::Display) -> ApiError {
    tracing::error!("{}: {}", context, e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos")
}

// ── Database rows ──

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: i64,
    pub nombre: String,
    pub precio: f64,
    pub duracion_maxima: String,
}

impl ServiceRow {
    /// Minutes this service blocks on the agenda.
    pub fn reservation(&self) -> Result<u32, AgendaError> {
        parse_duration(&self.duracion_maxima).map(reservation_minutes)
    }

    pub fn into_wire(self) -> Result<Servicio, AgendaError> {
        let intervalo_reserva = self.reservation()?;
        Ok(Servicio {
            id: self.id,
            nombre: self.nombre,
            precio: self.precio,
            duracion_maxima: self.duracion_maxima,
            intervalo_reserva,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentRow {
    pub id: i64,
    pub servicio_id: i64,
    pub servicio_nombre: String,
    pub precio: f64,
    pub barbero_id: i64,
    pub barbero_nombre: String,
    pub paciente_id: Option<i64>,
    pub paciente_nombre: String,
    pub paciente_telefono: Option<String>,
    pub fecha: String,
    pub hora: String,
    pub minutos_reservados: i64,
    pub direccion: String,
    pub estado: String,
}

impl TryFrom<AppointmentRow> for CitaDetalle {
    type Error = AgendaError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let estado: AppointmentStatus = row.estado.parse()?;
        let start: ClockTime = row.hora.parse()?;
        let end = start.minutes() + row.minutos_reservados.max(0) as u32;
        Ok(CitaDetalle {
            id: row.id,
            servicio_id: row.servicio_id,
            servicio_nombre: row.servicio_nombre,
            precio: row.precio,
            barbero_id: row.barbero_id,
            barbero_nombre: row.barbero_nombre,
            paciente_id: row.paciente_id,
            paciente_nombre: row.paciente_nombre,
            paciente_telefono: row.paciente_telefono,
            fecha: row.fecha,
            hora: row.hora,
            hora_fin: format_minutes_of_day(end),
            direccion: row.direccion,
            estado,
        })
    }
}

/// Appointment columns needed for authorization and state changes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentState {
    pub id: i64,
    pub barbero_id: i64,
    pub paciente_id: Option<i64>,
    pub estado: String,
}

// ── API request types ──

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub nombre: String,
    #[serde(default)]
    pub precio: f64,
    #[serde(rename = "duracionMaxima")]
    pub duracion_maxima: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub nombre: Option<String>,
    pub precio: Option<f64>,
    #[serde(rename = "duracionMaxima")]
    pub duracion_maxima: Option<String>,
}
