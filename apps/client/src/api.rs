//! Thin async wrapper over the server's JSON endpoints.

use barberia_agenda::{
    wire::{Barbero, CancelarCitaRequest, CitaDetalle, Cliente, CrearCitaRequest, DisponibilidadQuery, Mensaje, Servicio},
    ClockTime, Role, WorkingSchedule,
};
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::session::Session;

/// Listing endpoint for each role: clients see their own appointments,
/// barbers their agenda, admins everything.
pub fn listing_path(role: Role) -> &'static str {
    match role {
        Role::Cliente => "/citas/patient-dates",
        Role::Barbero => "/citas/by-barber",
        Role::Admin => "/citas",
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    session: Session,
}

impl ApiClient {
    pub fn new(session: Session) -> Self {
        Self {
            http: Client::new(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.session.base_url, path)
    }

    /// Attach the bearer token, send, and decode a 2xx body. Other statuses
    /// become [`ClientError::Server`] carrying the server's message.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let resp = request.bearer_auth(&self.session.token).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let err = ClientError::from_response_body(status.as_u16(), &body);
            tracing::warn!("request failed: {} - {}", status, err);
            return Err(err);
        }

        Ok(resp.json().await?)
    }

    pub async fn servicios(&self) -> Result<Vec<Servicio>, ClientError> {
        self.send(self.http.get(self.url("/servicios"))).await
    }

    pub async fn barberos(&self) -> Result<Vec<Barbero>, ClientError> {
        self.send(self.http.get(self.url("/barberos"))).await
    }

    pub async fn clientes(&self) -> Result<Vec<Cliente>, ClientError> {
        self.send(self.http.get(self.url("/clientes"))).await
    }

    pub async fn disponibilidad(
        &self,
        servicio_id: i64,
        barbero_id: i64,
        fecha: NaiveDate,
    ) -> Result<Vec<ClockTime>, ClientError> {
        let query = DisponibilidadQuery {
            servicio_id,
            barbero_id,
            fecha: fecha.format("%Y-%m-%d").to_string(),
        };
        self.send(self.http.get(self.url("/citas/disponibilidad")).query(&query))
            .await
    }

    pub async fn crear_cita(&self, request: &CrearCitaRequest) -> Result<CitaDetalle, ClientError> {
        let cita: CitaDetalle = self
            .send(self.http.post(self.url("/citas")).json(request))
            .await?;
        tracing::info!("appointment {} created for {} {}", cita.id, cita.fecha, cita.hora);
        Ok(cita)
    }

    pub async fn cancelar_cita(&self, id: i64, zona_horaria: &str) -> Result<Mensaje, ClientError> {
        let body = CancelarCitaRequest {
            zona_horaria: zona_horaria.to_string(),
        };
        self.send(
            self.http
                .put(self.url(&format!("/citas/cancelar-cita/{id}")))
                .json(&body),
        )
        .await
    }

    /// Appointments visible to the session's role.
    pub async fn listar_citas(&self) -> Result<Vec<CitaDetalle>, ClientError> {
        self.send(self.http.get(self.url(listing_path(self.session.role))))
            .await
    }

    pub async fn horario(&self, barbero_id: i64) -> Result<WorkingSchedule, ClientError> {
        self.send(self.http.get(self.url(&format!("/barberos/{barbero_id}/horario"))))
            .await
    }

    /// Replace the whole schedule. Invalid lunch windows and hours are
    /// rejected before any request is made.
    pub async fn guardar_horario(
        &self,
        barbero_id: i64,
        schedule: &WorkingSchedule,
    ) -> Result<WorkingSchedule, ClientError> {
        schedule.validate()?;
        self.send(
            self.http
                .put(self.url(&format!("/barberos/{barbero_id}/horario")))
                .json(schedule),
        )
        .await
    }
}
