//! JSON bodies exchanged between the server and its clients.

use serde::{Deserialize, Serialize};

use crate::role::Role;
use crate::status::AppointmentStatus;

pub const DEFAULT_ADDRESS: &str = "En barbería";

/// Error and acknowledgement body: `{ "mensaje": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mensaje {
    pub mensaje: String,
}

impl Mensaje {
    pub fn new(mensaje: impl Into<String>) -> Self {
        Self {
            mensaje: mensaje.into(),
        }
    }
}

/// Claim set of the bearer token (HS256 JWT). `exp` is seconds since the epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub rol: Role,
    pub nombre: String,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Servicio {
    pub id: i64,
    pub nombre: String,
    pub precio: f64,
    #[serde(rename = "duracionMaxima")]
    pub duracion_maxima: String,
    /// Minutes the service blocks on the barber's agenda.
    #[serde(rename = "intervaloReserva")]
    pub intervalo_reserva: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barbero {
    pub id: i64,
    pub nombre: String,
    pub telefono: Option<String>,
    pub verificado: bool,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cliente {
    pub id: i64,
    pub nombre: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisponibilidadQuery {
    #[serde(rename = "servicioID")]
    pub servicio_id: i64,
    #[serde(rename = "barberoID")]
    pub barbero_id: i64,
    pub fecha: String,
}

/// Appointment creation body. Carries either `pacienteID` or
/// `pacienteTemporalNombre`, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrearCitaRequest {
    #[serde(rename = "servicioID")]
    pub servicio_id: i64,
    #[serde(rename = "barberoID")]
    pub barbero_id: i64,
    pub fecha: String,
    pub hora: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
    #[serde(rename = "pacienteID", default, skip_serializing_if = "Option::is_none")]
    pub paciente_id: Option<i64>,
    #[serde(rename = "pacienteTemporalNombre", default, skip_serializing_if = "Option::is_none")]
    pub paciente_temporal_nombre: Option<String>,
    #[serde(rename = "pacienteTemporalTelefono", default, skip_serializing_if = "Option::is_none")]
    pub paciente_temporal_telefono: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelarCitaRequest {
    #[serde(rename = "zonaHoraria")]
    pub zona_horaria: String,
}

/// Appointment as listed to users, with names already joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitaDetalle {
    pub id: i64,
    #[serde(rename = "servicioID")]
    pub servicio_id: i64,
    #[serde(rename = "servicioNombre")]
    pub servicio_nombre: String,
    pub precio: f64,
    #[serde(rename = "barberoID")]
    pub barbero_id: i64,
    #[serde(rename = "barberoNombre")]
    pub barbero_nombre: String,
    #[serde(rename = "pacienteID")]
    pub paciente_id: Option<i64>,
    #[serde(rename = "pacienteNombre")]
    pub paciente_nombre: String,
    #[serde(rename = "pacienteTelefono")]
    pub paciente_telefono: Option<String>,
    pub fecha: String,
    pub hora: String,
    #[serde(rename = "horaFin")]
    pub hora_fin: String,
    pub direccion: String,
    pub estado: AppointmentStatus,
}

impl CitaDetalle {
    /// Walk-in customers have no registered account.
    pub fn is_temporary_client(&self) -> bool {
        self.paciente_id.is_none()
    }
}
