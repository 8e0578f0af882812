//! Server-driven appointment transitions.
//!
//! `Pendiente` appointments whose start time has passed become `Expirada`;
//! `Confirmada` appointments whose reserved block has ended become `Completa`.

use barberia_agenda::{AppointmentStatus, ClockTime};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub expired: u64,
    pub completed: u64,
}

/// Where an active appointment should move to at `now`, if anywhere.
pub fn due_transition(
    estado: AppointmentStatus,
    start: NaiveDateTime,
    reserved_minutes: i64,
    now: NaiveDateTime,
) -> Option<AppointmentStatus> {
    match estado {
        AppointmentStatus::Pending if now >= start => Some(AppointmentStatus::Expired),
        AppointmentStatus::Confirmed if now >= start + Duration::minutes(reserved_minutes) => {
            Some(AppointmentStatus::Completed)
        }
        _ => None,
    }
}

pub async fn sweep_appointments(db: &SqlitePool, now: NaiveDateTime) -> anyhow::Result<SweepOutcome> {
    let today = now.date().format("%Y-%m-%d").to_string();
    let rows: Vec<(i64, String, String, i64, String)> = sqlx::query_as(
        "SELECT id, fecha, hora, minutos_reservados, estado FROM citas
         WHERE estado IN ('Pendiente', 'Confirmada') AND fecha <= ?",
    )
    .bind(&today)
    .fetch_all(db)
    .await?;

    let mut outcome = SweepOutcome::default();
    for (id, fecha, hora, minutos, estado) in rows {
        let (Ok(date), Ok(time), Ok(estado)) = (
            NaiveDate::parse_from_str(&fecha, "%Y-%m-%d"),
            hora.parse::<ClockTime>(),
            estado.parse::<AppointmentStatus>(),
        ) else {
            tracing::warn!("sweep: skipping malformed appointment {}", id);
            continue;
        };
        let start = date.and_time(chrono::NaiveTime::MIN) + Duration::minutes(i64::from(time.minutes()));

        let Some(next) = due_transition(estado, start, minutos, now) else {
            continue;
        };
        let next = estado.transition(next)?;

        // Guard on the old status so a concurrent cancellation wins.
        let updated = sqlx::query("UPDATE citas SET estado = ? WHERE id = ? AND estado = ?")
            .bind(next.as_str())
            .bind(id)
            .bind(estado.as_str())
            .execute(db)
            .await?
            .rows_affected();

        match next {
            AppointmentStatus::Expired => outcome.expired += updated,
            AppointmentStatus::Completed => outcome.completed += updated,
            _ => {}
        }
    }

    if outcome != SweepOutcome::default() {
        tracing::info!(
            "sweep: {} expired, {} completed",
            outcome.expired,
            outcome.completed
        );
    }
    Ok(outcome)
}
