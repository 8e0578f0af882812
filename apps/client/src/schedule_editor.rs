use barberia_agenda::{AgendaError, ClockTime, LunchBreak, WorkingDay, WorkingSchedule, WEEKDAY_KEYS};

use crate::api::ApiClient;
use crate::error::ClientError;

/// Local edits to one barber's weekly schedule. Saving sends the whole
/// schedule and then reloads it from the server.
#[derive(Debug, Clone)]
pub struct ScheduleEditor {
    barbero_id: i64,
    schedule: WorkingSchedule,
    dirty: bool,
}

impl ScheduleEditor {
    pub fn new(barbero_id: i64, schedule: WorkingSchedule) -> Self {
        Self {
            barbero_id,
            schedule,
            dirty: false,
        }
    }

    pub async fn load(api: &ApiClient, barbero_id: i64) -> Result<Self, ClientError> {
        Ok(Self::new(barbero_id, api.horario(barbero_id).await?))
    }

    pub fn schedule(&self) -> &WorkingSchedule {
        &self.schedule
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn day_mut(&mut self, key: &str) -> Result<&mut WorkingDay, AgendaError> {
        if !WEEKDAY_KEYS.contains(&key) {
            return Err(AgendaError::UnknownWeekday(key.to_string()));
        }
        self.dirty = true;
        Ok(self.schedule.dias_laborales.entry(key.to_string()).or_default())
    }

    /// Flip a day on or off, returning the new state. Hours are kept.
    pub fn toggle_day(&mut self, key: &str) -> Result<bool, AgendaError> {
        let day = self.day_mut(key)?;
        day.activo = !day.activo;
        Ok(day.activo)
    }

    pub fn add_hour(&mut self, key: &str, hora: ClockTime) -> Result<(), AgendaError> {
        let day = self.day_mut(key)?;
        let hora = hora.to_string();
        if !day.horas.contains(&hora) {
            day.horas.push(hora);
            day.horas.sort();
        }
        Ok(())
    }

    pub fn remove_hour(&mut self, key: &str, hora: ClockTime) -> Result<bool, AgendaError> {
        let day = self.day_mut(key)?;
        let hora = hora.to_string();
        let before = day.horas.len();
        day.horas.retain(|h| *h != hora);
        Ok(day.horas.len() != before)
    }

    /// Replace the lunch window. Checked on save, not here, so the user can
    /// type the two ends in any order.
    pub fn set_lunch(&mut self, inicio: ClockTime, fin: ClockTime, activo: bool) {
        self.schedule.horario_almuerzo = LunchBreak {
            inicio: inicio.to_string(),
            fin: fin.to_string(),
            activo,
        };
        self.dirty = true;
    }

    /// The full-replace body, validated and normalized.
    pub fn payload(&self) -> Result<WorkingSchedule, AgendaError> {
        self.schedule.validate()?;
        let mut payload = self.schedule.clone();
        payload.normalize();
        Ok(payload)
    }

    pub async fn save(&mut self, api: &ApiClient) -> Result<(), ClientError> {
        let payload = self.payload()?;
        api.guardar_horario(self.barbero_id, &payload).await?;
        self.schedule = api.horario(self.barbero_id).await?;
        self.dirty = false;
        tracing::info!("schedule for barber {} saved", self.barbero_id);
        Ok(())
    }
}
