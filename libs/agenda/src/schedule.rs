//! Weekly working hours of a barber.
//!
//! Each weekday carries an explicit allow-list of bookable start times rather
//! than an open/close range. A single lunch window applies to every day, and
//! date-specific exceptions can override a day's activation and hours.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::{ClockTime, Interval, RESERVATION_STEP_MINUTES};
use crate::error::AgendaError;

/// Weekday keys in Monday-first order.
pub const WEEKDAY_KEYS: [&str; 7] = [
    "lunes",
    "martes",
    "miercoles",
    "jueves",
    "viernes",
    "sabado",
    "domingo",
];

pub fn weekday_key(date: NaiveDate) -> &'static str {
    WEEKDAY_KEYS[date.weekday().num_days_from_monday() as usize]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkingDay {
    pub activo: bool,
    #[serde(default)]
    pub horas: Vec<String>,
}

impl WorkingDay {
    /// Parsed start times; entries that fail to parse are skipped.
    pub fn start_times(&self) -> Vec<ClockTime> {
        if !self.activo {
            return Vec::new();
        }
        let mut times: Vec<ClockTime> = self.horas.iter().filter_map(|h| h.parse().ok()).collect();
        times.sort();
        times.dedup();
        times
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LunchBreak {
    pub inicio: String,
    pub fin: String,
    pub activo: bool,
}

impl LunchBreak {
    /// Checks `fin > inicio` and a minimum length of 30 minutes.
    pub fn validate(&self) -> Result<Interval, AgendaError> {
        let inicio: ClockTime = self.inicio.parse()?;
        let fin: ClockTime = self.fin.parse()?;
        if fin <= inicio {
            return Err(AgendaError::LunchEndBeforeStart);
        }
        let window = Interval::new(inicio.minutes(), fin.minutes());
        if window.len() < RESERVATION_STEP_MINUTES {
            return Err(AgendaError::LunchTooShort);
        }
        Ok(window)
    }
}

impl Default for LunchBreak {
    fn default() -> Self {
        Self {
            inicio: "14:00".into(),
            fin: "15:00".into(),
            activo: true,
        }
    }
}

/// Override for one calendar date. Fields other than `fecha`, `activo` and
/// `horas` are kept as-is so editors can round-trip them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleException {
    pub fecha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activo: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horas: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingSchedule {
    #[serde(rename = "diasLaborales")]
    pub dias_laborales: BTreeMap<String, WorkingDay>,
    #[serde(rename = "horarioAlmuerzo")]
    pub horario_almuerzo: LunchBreak,
    #[serde(default)]
    pub excepciones: Vec<ScheduleException>,
}

impl Default for WorkingSchedule {
    /// Monday to Saturday every half hour from 09:00 to 18:30, Sunday off.
    fn default() -> Self {
        let horas: Vec<String> = (9 * 60..19 * 60)
            .step_by(RESERVATION_STEP_MINUTES as usize)
            .filter_map(ClockTime::from_minutes)
            .map(|t| t.to_string())
            .collect();

        let dias_laborales = WEEKDAY_KEYS
            .iter()
            .map(|key| {
                let day = WorkingDay {
                    activo: *key != "domingo",
                    horas: horas.clone(),
                };
                (key.to_string(), day)
            })
            .collect();

        Self {
            dias_laborales,
            horario_almuerzo: LunchBreak::default(),
            excepciones: Vec::new(),
        }
    }
}

impl WorkingSchedule {
    /// Validate everything a save must satisfy.
    pub fn validate(&self) -> Result<(), AgendaError> {
        for (key, day) in &self.dias_laborales {
            if !WEEKDAY_KEYS.contains(&key.as_str()) {
                return Err(AgendaError::UnknownWeekday(key.clone()));
            }
            for hora in &day.horas {
                hora.parse::<ClockTime>()?;
            }
        }
        for exception in &self.excepciones {
            if NaiveDate::parse_from_str(&exception.fecha, "%Y-%m-%d").is_err() {
                return Err(AgendaError::InvalidDate(exception.fecha.clone()));
            }
            for hora in exception.horas.iter().flatten() {
                hora.parse::<ClockTime>()?;
            }
        }
        self.horario_almuerzo.validate()?;
        Ok(())
    }

    /// Sort and de-duplicate every hour list into `HH:MM` form.
    pub fn normalize(&mut self) {
        for day in self.dias_laborales.values_mut() {
            day.horas = normalized_hours(&day.horas);
        }
        for exception in &mut self.excepciones {
            if let Some(horas) = exception.horas.as_mut() {
                *horas = normalized_hours(horas);
            }
        }
    }

    /// The effective working day for `date`, exceptions applied.
    /// Missing weekday entries count as inactive.
    pub fn day_for(&self, date: NaiveDate) -> WorkingDay {
        let mut day = self
            .dias_laborales
            .get(weekday_key(date))
            .cloned()
            .unwrap_or_default();

        let fecha = date.format("%Y-%m-%d").to_string();
        if let Some(exception) = self.excepciones.iter().find(|e| e.fecha == fecha) {
            if let Some(activo) = exception.activo {
                day.activo = activo;
            }
            if let Some(horas) = &exception.horas {
                day.horas = horas.clone();
            }
        }
        day
    }

    /// Lunch window to subtract, if active and well-formed.
    pub fn lunch_window(&self) -> Option<Interval> {
        if !self.horario_almuerzo.activo {
            return None;
        }
        self.horario_almuerzo.validate().ok()
    }
}

fn normalized_hours(horas: &[String]) -> Vec<String> {
    let mut times: Vec<ClockTime> = horas.iter().filter_map(|h| h.parse().ok()).collect();
    times.sort();
    times.dedup();
    times.into_iter().map(|t| t.to_string()).collect()
}
