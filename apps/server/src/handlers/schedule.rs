use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use barberia_agenda::{AgendaError, Role, WorkingSchedule};
use std::sync::Arc;

use super::barbers::{barber_id_for_user, ensure_barber_exists};
use crate::{auth, auth::Claims, models::*, AppState};

/// Load a barber's stored schedule, or the default one if none was saved yet.
pub(crate) async fn load_schedule(state: &AppState, barbero_id: i64) -> Result<WorkingSchedule, ApiError> {
    let row: Option<(String, String, String)> = sqlx::query_as(
        "SELECT dias_laborales, horario_almuerzo, excepciones FROM horarios WHERE barbero_id = ?",
    )
    .bind(barbero_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| db_error("load_schedule", e))?;

    let Some((dias, almuerzo, excepciones)) = row else {
        return Ok(WorkingSchedule::default());
    };

    let decode = || -> Result<WorkingSchedule, serde_json::Error> {
        Ok(WorkingSchedule {
            dias_laborales: serde_json::from_str(&dias)?,
            horario_almuerzo: serde_json::from_str(&almuerzo)?,
            excepciones: serde_json::from_str(&excepciones)?,
        })
    };
    decode().map_err(|e| db_error("load_schedule: corrupt schedule JSON", e))
}

/// Admins edit any schedule; barbers only their own.
async fn authorize_schedule_access(state: &AppState, claims: &Claims, barbero_id: i64) -> Result<(), ApiError> {
    if claims.rol == Role::Admin {
        return Ok(());
    }
    if claims.rol == Role::Barbero && barber_id_for_user(state, claims.id).await? == Some(barbero_id) {
        return Ok(());
    }
    Err(forbidden())
}

fn schedule_error(e: AgendaError) -> ApiError {
    tracing::warn!("rejected schedule: {}", e);
    bad_request(e.to_string())
}

/// GET /barberos/:id/horario
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<WorkingSchedule>, ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    ensure_barber_exists(&state, id).await?;
    authorize_schedule_access(&state, &claims, id).await?;

    Ok(Json(load_schedule(&state, id).await?))
}

/// PUT /barberos/:id/horario: replaces the whole schedule
pub async fn put_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    schedule: Result<Json<WorkingSchedule>, JsonRejection>,
) -> Result<Json<WorkingSchedule>, ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    let Json(mut schedule) = schedule.map_err(rejection)?;
    ensure_barber_exists(&state, id).await?;
    authorize_schedule_access(&state, &claims, id).await?;

    schedule.validate().map_err(schedule_error)?;
    schedule.normalize();

    let encode = |value: serde_json::Result<String>| {
        value.map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    };
    let dias = encode(serde_json::to_string(&schedule.dias_laborales))?;
    let almuerzo = encode(serde_json::to_string(&schedule.horario_almuerzo))?;
    let excepciones = encode(serde_json::to_string(&schedule.excepciones))?;

    sqlx::query(
        "INSERT INTO horarios (barbero_id, dias_laborales, horario_almuerzo, excepciones, updated_at)
         VALUES (?, ?, ?, ?, datetime('now'))
         ON CONFLICT(barbero_id) DO UPDATE SET
            dias_laborales = excluded.dias_laborales,
            horario_almuerzo = excluded.horario_almuerzo,
            excepciones = excluded.excepciones,
            updated_at = excluded.updated_at",
    )
    .bind(id)
    .bind(&dias)
    .bind(&almuerzo)
    .bind(&excepciones)
    .execute(&state.db)
    .await
    .map_err(|e| db_error("put_schedule", e))?;

    tracing::info!("schedule for barber {} replaced by user {}", id, claims.id);
    Ok(Json(schedule))
}
