//! Booking wizard: collects a creation request step by step.
//!
//! The step sequence is fixed per [`StepPlan`]. Clients booking for
//! themselves skip the client step; staff booking on someone's behalf must
//! pick a registered client or enter a walk-in. Moving back and forth keeps
//! every selection; dropping the wizard discards them.

use barberia_agenda::{
    format_minutes_of_day,
    wire::{Barbero, CitaDetalle, Cliente, CrearCitaRequest, Servicio},
    ClockTime, Role,
};
use chrono::NaiveDate;
use thiserror::Error;

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::session::Session;
use crate::tracker::{AvailabilityTracker, SlotQuery, SlotState, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Servicio,
    Barbero,
    Cliente,
    FechaHora,
    Revision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPlan {
    SelfBooking,
    OnBehalf,
}

impl StepPlan {
    pub fn for_role(role: Role) -> Self {
        if role.is_staff() {
            StepPlan::OnBehalf
        } else {
            StepPlan::SelfBooking
        }
    }

    pub fn steps(self) -> &'static [Step] {
        match self {
            StepPlan::SelfBooking => &[Step::Servicio, Step::Barbero, Step::FechaHora, Step::Revision],
            StepPlan::OnBehalf => &[
                Step::Servicio,
                Step::Barbero,
                Step::Cliente,
                Step::FechaHora,
                Step::Revision,
            ],
        }
    }
}

/// The client an on-behalf booking is for. One value holds either kind,
/// so a registered client and a walk-in can never both be set.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientChoice {
    Registered(Cliente),
    Temporary { nombre: String, telefono: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("Selecciona un servicio")]
    MissingService,

    #[error("Selecciona un barbero")]
    MissingBarber,

    #[error("Selecciona un cliente o ingresa el nombre del cliente temporal")]
    MissingClient,

    #[error("Selecciona una fecha")]
    MissingDate,

    #[error("Selecciona una hora")]
    MissingTime,

    #[error("No se pueden seleccionar fechas pasadas")]
    PastDate,

    #[error("El horario {0} no está disponible")]
    TimeUnavailable(ClockTime),
}

impl From<WizardError> for ClientError {
    fn from(e: WizardError) -> Self {
        ClientError::Validation(e.to_string())
    }
}

/// Read-only recap shown before submitting.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub servicio: String,
    pub precio: f64,
    pub barbero: String,
    pub cliente: Option<String>,
    pub telefono: Option<String>,
    pub fecha: NaiveDate,
    pub hora: ClockTime,
    pub hora_fin: String,
    pub minutos_reservados: u32,
}

impl Review {
    /// Display lines; the phone line only appears when a phone is known.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Servicio: {} (${:.2})", self.servicio, self.precio),
            format!("Barbero: {}", self.barbero),
        ];
        if let Some(cliente) = &self.cliente {
            lines.push(format!("Cliente: {}", cliente));
        }
        if let Some(telefono) = &self.telefono {
            lines.push(format!("Teléfono: {}", telefono));
        }
        lines.push(format!("Fecha: {}", self.fecha.format("%d/%m/%Y")));
        lines.push(format!(
            "Horario reservado: {} - {} ({} min)",
            self.hora, self.hora_fin, self.minutos_reservados
        ));
        lines
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

pub fn filter_barbers<'a>(barberos: &'a [Barbero], query: &str) -> Vec<&'a Barbero> {
    barberos
        .iter()
        .filter(|b| contains_ignore_case(&b.nombre, query))
        .collect()
}

pub fn filter_clients<'a>(clientes: &'a [Cliente], query: &str) -> Vec<&'a Cliente> {
    clientes
        .iter()
        .filter(|c| {
            contains_ignore_case(&c.nombre, query)
                || c.email.as_deref().is_some_and(|e| contains_ignore_case(e, query))
        })
        .collect()
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[derive(Debug)]
pub struct BookingWizard {
    plan: StepPlan,
    position: usize,
    servicio: Option<Servicio>,
    barbero: Option<Barbero>,
    cliente: Option<ClientChoice>,
    fecha: Option<NaiveDate>,
    hora: Option<ClockTime>,
    direccion: Option<String>,
    slots: AvailabilityTracker,
}

impl BookingWizard {
    pub fn new(plan: StepPlan) -> Self {
        Self {
            plan,
            position: 0,
            servicio: None,
            barbero: None,
            cliente: None,
            fecha: None,
            hora: None,
            direccion: None,
            slots: AvailabilityTracker::new(),
        }
    }

    pub fn for_session(session: &Session) -> Self {
        Self::new(StepPlan::for_role(session.role))
    }

    pub fn plan(&self) -> StepPlan {
        self.plan
    }

    pub fn step(&self) -> Step {
        self.plan.steps()[self.position]
    }

    pub fn is_last_step(&self) -> bool {
        self.position + 1 == self.plan.steps().len()
    }

    // ── Navigation ──

    /// Whether the current step has what it needs to move on.
    pub fn check_step(&self, step: Step) -> Result<(), WizardError> {
        match step {
            Step::Servicio => self.servicio.as_ref().map(|_| ()).ok_or(WizardError::MissingService),
            Step::Barbero => self.barbero.as_ref().map(|_| ()).ok_or(WizardError::MissingBarber),
            Step::Cliente => match &self.cliente {
                Some(ClientChoice::Registered(_)) => Ok(()),
                Some(ClientChoice::Temporary { nombre, .. }) if !nombre.trim().is_empty() => Ok(()),
                _ => Err(WizardError::MissingClient),
            },
            Step::FechaHora => {
                self.fecha.ok_or(WizardError::MissingDate)?;
                self.hora.map(|_| ()).ok_or(WizardError::MissingTime)
            }
            Step::Revision => self
                .plan
                .steps()
                .iter()
                .filter(|s| **s != Step::Revision)
                .try_for_each(|s| self.check_step(*s)),
        }
    }

    pub fn can_advance(&self) -> bool {
        !self.is_last_step() && self.check_step(self.step()).is_ok()
    }

    pub fn next(&mut self) -> Result<Step, WizardError> {
        self.check_step(self.step())?;
        if !self.is_last_step() {
            self.position += 1;
        }
        Ok(self.step())
    }

    pub fn back(&mut self) -> Step {
        self.position = self.position.saturating_sub(1);
        self.step()
    }

    // ── Selections ──

    pub fn servicio(&self) -> Option<&Servicio> {
        self.servicio.as_ref()
    }

    pub fn barbero(&self) -> Option<&Barbero> {
        self.barbero.as_ref()
    }

    pub fn cliente(&self) -> Option<&ClientChoice> {
        self.cliente.as_ref()
    }

    pub fn fecha(&self) -> Option<NaiveDate> {
        self.fecha
    }

    pub fn hora(&self) -> Option<ClockTime> {
        self.hora
    }

    pub fn slots(&self) -> &SlotState {
        self.slots.state()
    }

    /// Selecting a different service changes the reserved block, so the
    /// slot list is re-queried. Returns the ticket to fetch with, if any.
    pub fn select_service(&mut self, servicio: Servicio) -> Option<Ticket> {
        let changed = self.servicio.as_ref().map(|s| s.id) != Some(servicio.id);
        self.servicio = Some(servicio);
        changed.then(|| self.requery()).flatten()
    }

    pub fn select_barber(&mut self, barbero: Barbero) -> Option<Ticket> {
        let changed = self.barbero.as_ref().map(|b| b.id) != Some(barbero.id);
        self.barbero = Some(barbero);
        changed.then(|| self.requery()).flatten()
    }

    /// Pick a date. Past dates are refused; a new date clears the time.
    pub fn select_date(&mut self, fecha: NaiveDate, today: NaiveDate) -> Result<Option<Ticket>, WizardError> {
        if fecha < today {
            return Err(WizardError::PastDate);
        }
        if self.fecha == Some(fecha) {
            return Ok(None);
        }
        self.fecha = Some(fecha);
        Ok(self.requery())
    }

    /// Only times from the latest resolved slot list can be chosen.
    pub fn select_time(&mut self, hora: ClockTime) -> Result<(), WizardError> {
        self.fecha.ok_or(WizardError::MissingDate)?;
        if !self.slots.times().contains(&hora) {
            return Err(WizardError::TimeUnavailable(hora));
        }
        self.hora = Some(hora);
        Ok(())
    }

    pub fn select_client(&mut self, cliente: Cliente) {
        self.cliente = Some(ClientChoice::Registered(cliente));
    }

    /// Switch to a walk-in client, dropping any registered selection.
    pub fn set_temporary_client(&mut self, nombre: &str, telefono: &str) {
        self.cliente = Some(ClientChoice::Temporary {
            nombre: nombre.to_string(),
            telefono: telefono.to_string(),
        });
    }

    pub fn clear_client(&mut self) {
        self.cliente = None;
    }

    pub fn set_address(&mut self, direccion: &str) {
        self.direccion = non_blank(direccion);
    }

    fn slot_query(&self) -> Option<SlotQuery> {
        Some(SlotQuery {
            servicio_id: self.servicio.as_ref()?.id,
            barbero_id: self.barbero.as_ref()?.id,
            fecha: self.fecha?,
        })
    }

    /// Invalidate the chosen time and current slots after a change to
    /// service, barber or date.
    fn requery(&mut self) -> Option<Ticket> {
        self.hora = None;
        match self.slot_query() {
            Some(query) => Some(self.slots.request(query)),
            None => {
                self.slots.reset();
                None
            }
        }
    }

    /// Apply an availability response; stale tickets are ignored.
    pub fn receive_slots(&mut self, ticket: Ticket, result: Result<Vec<ClockTime>, ClientError>) -> bool {
        self.slots.resolve(ticket, result)
    }

    /// Fetch and apply slots for a ticket.
    pub async fn load_slots(&mut self, api: &ApiClient, ticket: Ticket) -> bool {
        let q = ticket.query;
        let result = api.disponibilidad(q.servicio_id, q.barbero_id, q.fecha).await;
        self.receive_slots(ticket, result)
    }

    // ── Submission ──

    pub fn review(&self) -> Result<Review, WizardError> {
        self.check_step(Step::Revision)?;
        let servicio = self.servicio.as_ref().ok_or(WizardError::MissingService)?;
        let barbero = self.barbero.as_ref().ok_or(WizardError::MissingBarber)?;
        let fecha = self.fecha.ok_or(WizardError::MissingDate)?;
        let hora = self.hora.ok_or(WizardError::MissingTime)?;

        let (cliente, telefono) = match (self.plan, &self.cliente) {
            (StepPlan::OnBehalf, Some(ClientChoice::Registered(c))) => (Some(c.nombre.clone()), c.telefono.clone()),
            (StepPlan::OnBehalf, Some(ClientChoice::Temporary { nombre, telefono })) => {
                (non_blank(nombre), non_blank(telefono))
            }
            _ => (None, None),
        };

        Ok(Review {
            servicio: servicio.nombre.clone(),
            precio: servicio.precio,
            barbero: barbero.nombre.clone(),
            cliente,
            telefono,
            fecha,
            hora,
            hora_fin: format_minutes_of_day(hora.minutes() + servicio.intervalo_reserva),
            minutos_reservados: servicio.intervalo_reserva,
        })
    }

    /// The creation body. Carries exactly one of `pacienteID` or
    /// `pacienteTemporalNombre` for on-behalf bookings and neither for
    /// self-bookings.
    pub fn build_request(&self) -> Result<CrearCitaRequest, WizardError> {
        let review = self.review()?;
        let servicio = self.servicio.as_ref().ok_or(WizardError::MissingService)?;
        let barbero = self.barbero.as_ref().ok_or(WizardError::MissingBarber)?;

        let mut request = CrearCitaRequest {
            servicio_id: servicio.id,
            barbero_id: barbero.id,
            fecha: review.fecha.format("%Y-%m-%d").to_string(),
            hora: review.hora.to_string(),
            direccion: self.direccion.clone(),
            paciente_id: None,
            paciente_temporal_nombre: None,
            paciente_temporal_telefono: None,
        };
        if self.plan == StepPlan::OnBehalf {
            match &self.cliente {
                Some(ClientChoice::Registered(c)) => request.paciente_id = Some(c.id),
                Some(ClientChoice::Temporary { nombre, telefono }) => {
                    request.paciente_temporal_nombre = non_blank(nombre);
                    request.paciente_temporal_telefono = non_blank(telefono);
                }
                None => return Err(WizardError::MissingClient),
            }
        }
        Ok(request)
    }

    pub async fn submit(&self, api: &ApiClient) -> Result<CitaDetalle, ClientError> {
        let request = self.build_request()?;
        api.crear_cita(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2099, 3, day).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2099, 3, 1).unwrap()
    }

    fn make_service(id: i64) -> Servicio {
        Servicio {
            id,
            nombre: "Corte clásico".into(),
            precio: 150.0,
            duracion_maxima: "00:45".into(),
            intervalo_reserva: 60,
        }
    }

    fn make_barber(id: i64, nombre: &str) -> Barbero {
        Barbero {
            id,
            nombre: nombre.into(),
            telefono: None,
            verificado: true,
            email: None,
        }
    }

    fn make_client(id: i64, nombre: &str) -> Cliente {
        Cliente {
            id,
            nombre: nombre.into(),
            email: Some(format!("{}@correo.mx", nombre.to_lowercase())),
            telefono: Some("5551234".into()),
        }
    }

    /// Drive a wizard up to a chosen time with slots 09:00 and 11:00.
    fn make_ready(plan: StepPlan) -> BookingWizard {
        let mut wizard = BookingWizard::new(plan);
        wizard.select_service(make_service(1));
        wizard.select_barber(make_barber(2, "Juan"));
        let ticket = wizard.select_date(d(2), today()).unwrap().unwrap();
        assert!(wizard.receive_slots(ticket, Ok(vec![t("09:00"), t("11:00")])));
        wizard.select_time(t("11:00")).unwrap();
        wizard
    }

    #[test]
    fn test_step_plans() {
        assert_eq!(StepPlan::for_role(Role::Cliente), StepPlan::SelfBooking);
        assert_eq!(StepPlan::for_role(Role::Barbero), StepPlan::OnBehalf);
        assert!(!StepPlan::SelfBooking.steps().contains(&Step::Cliente));
        assert_eq!(StepPlan::OnBehalf.steps()[2], Step::Cliente);
    }

    #[test]
    fn test_next_blocked_until_selection() {
        let mut wizard = BookingWizard::new(StepPlan::SelfBooking);
        assert!(!wizard.can_advance());
        assert_eq!(wizard.next(), Err(WizardError::MissingService));
        wizard.select_service(make_service(1));
        assert_eq!(wizard.next(), Ok(Step::Barbero));
        assert_eq!(wizard.back(), Step::Servicio);
        // Selection survives navigation
        assert_eq!(wizard.servicio().map(|s| s.id), Some(1));
    }

    #[test]
    fn test_date_change_clears_time_and_requeries() {
        let mut wizard = make_ready(StepPlan::SelfBooking);
        assert_eq!(wizard.hora(), Some(t("11:00")));

        let ticket = wizard.select_date(d(3), today()).unwrap();
        assert!(ticket.is_some());
        assert_eq!(wizard.hora(), None);
        assert_eq!(wizard.slots(), &SlotState::Loading);
        assert_eq!(wizard.select_time(t("11:00")), Err(WizardError::TimeUnavailable(t("11:00"))));
    }

    #[test]
    fn test_stale_slots_are_ignored() {
        let mut wizard = BookingWizard::new(StepPlan::SelfBooking);
        wizard.select_service(make_service(1));
        wizard.select_barber(make_barber(2, "Juan"));
        let old = wizard.select_date(d(2), today()).unwrap().unwrap();
        let new = wizard.select_date(d(3), today()).unwrap().unwrap();
        assert!(wizard.receive_slots(new, Ok(vec![t("14:00")])));
        assert!(!wizard.receive_slots(old, Ok(vec![t("09:00")])));
        assert_eq!(wizard.slots(), &SlotState::Ready(vec![t("14:00")]));
    }

    #[test]
    fn test_past_date_rejected() {
        let mut wizard = BookingWizard::new(StepPlan::SelfBooking);
        let yesterday = today().pred_opt().unwrap();
        assert_eq!(wizard.select_date(yesterday, today()), Err(WizardError::PastDate));
        assert_eq!(wizard.select_time(t("09:00")), Err(WizardError::MissingDate));
    }

    #[test]
    fn test_registered_and_temporary_are_exclusive() {
        let mut wizard = make_ready(StepPlan::OnBehalf);
        wizard.set_temporary_client("Pedro", "555");
        wizard.select_client(make_client(9, "Ana"));
        let request = wizard.build_request().unwrap();
        assert_eq!(request.paciente_id, Some(9));
        assert_eq!(request.paciente_temporal_nombre, None);
        assert_eq!(request.paciente_temporal_telefono, None);

        wizard.set_temporary_client("Pedro", "");
        let request = wizard.build_request().unwrap();
        assert_eq!(request.paciente_id, None);
        assert_eq!(request.paciente_temporal_nombre.as_deref(), Some("Pedro"));
    }

    #[test]
    fn test_on_behalf_requires_client() {
        let mut wizard = make_ready(StepPlan::OnBehalf);
        assert_eq!(wizard.build_request(), Err(WizardError::MissingClient));
        wizard.set_temporary_client("   ", "555");
        assert_eq!(wizard.build_request(), Err(WizardError::MissingClient));
    }

    #[test]
    fn test_temporary_client_review_without_phone() {
        let mut wizard = make_ready(StepPlan::OnBehalf);
        wizard.set_temporary_client("Pedro Gómez", "");
        let review = wizard.review().unwrap();
        assert_eq!(review.cliente.as_deref(), Some("Pedro Gómez"));
        assert_eq!(review.telefono, None);
        assert_eq!(review.hora_fin, "12:00");

        let lines = review.lines();
        assert!(lines.contains(&"Cliente: Pedro Gómez".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Teléfono")));
        assert!(lines.contains(&"Horario reservado: 11:00 - 12:00 (60 min)".to_string()));
    }

    #[test]
    fn test_self_booking_request_has_no_patient() {
        let wizard = make_ready(StepPlan::SelfBooking);
        let request = wizard.build_request().unwrap();
        assert_eq!(request.paciente_id, None);
        assert_eq!(request.paciente_temporal_nombre, None);
        assert_eq!(request.fecha, "2099-03-02");
        assert_eq!(request.hora, "11:00");
    }

    #[test]
    fn test_name_filters() {
        let barberos = vec![make_barber(1, "Juan Pérez"), make_barber(2, "Luis")];
        assert_eq!(filter_barbers(&barberos, "JUAN").len(), 1);
        assert_eq!(filter_barbers(&barberos, "").len(), 2);

        let clientes = vec![make_client(1, "Ana"), make_client(2, "Beto")];
        assert_eq!(filter_clients(&clientes, "beto@").len(), 1);
    }
}
