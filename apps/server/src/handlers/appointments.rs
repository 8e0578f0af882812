use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use barberia_agenda::{
    resolve_start_times,
    wire::{CancelarCitaRequest, CitaDetalle, CrearCitaRequest, DisponibilidadQuery, Mensaje, DEFAULT_ADDRESS},
    AppointmentStatus, ClockTime, Interval, Role,
};
use chrono::NaiveDate;
use std::sync::Arc;

use super::barbers::{barber_id_for_user, ensure_barber_exists};
use super::schedule::load_schedule;
use super::services::fetch_service;
use crate::{auth, auth::Claims, models::*, AppState};

// ── Shared queries ──

/// Columns of an appointment with service, barber and client names joined in.
const CITA_DETALLE_SELECT: &str =
    "SELECT c.id, c.servicio_id, s.nombre AS servicio_nombre, s.precio AS precio,
            c.barbero_id, b.nombre AS barbero_nombre,
            c.paciente_id,
            COALESCE(u.nombre, c.paciente_temporal_nombre, '') AS paciente_nombre,
            COALESCE(u.telefono, c.paciente_temporal_telefono) AS paciente_telefono,
            c.fecha, c.hora, c.minutos_reservados, c.direccion, c.estado
     FROM citas c
     JOIN servicios s ON s.id = c.servicio_id
     JOIN barberos b ON b.id = c.barbero_id
     LEFT JOIN usuarios u ON u.id = c.paciente_id";

const CITA_ORDER: &str = "ORDER BY c.fecha DESC, c.hora DESC";

fn to_details(rows: Vec<AppointmentRow>) -> Result<Vec<CitaDetalle>, ApiError> {
    rows.into_iter()
        .map(|row| {
            let id = row.id;
            CitaDetalle::try_from(row).map_err(|e| db_error(&format!("appointment {id} is malformed"), e))
        })
        .collect()
}

async fn fetch_detail(state: &AppState, id: i64) -> Result<CitaDetalle, ApiError> {
    let row = sqlx::query_as::<_, AppointmentRow>(&format!("{} WHERE c.id = ?", CITA_DETALLE_SELECT))
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| db_error("fetch_detail", e))?
        .ok_or_else(|| not_found("Cita no encontrada"))?;
    to_details(vec![row]).map(|mut v| v.remove(0))
}

async fn fetch_state(state: &AppState, id: i64) -> Result<AppointmentState, ApiError> {
    sqlx::query_as::<_, AppointmentState>(
        "SELECT id, barbero_id, paciente_id, estado FROM citas WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| db_error("fetch_state", e))?
    .ok_or_else(|| not_found("Cita no encontrada"))
}

/// Reserved blocks of appointments still occupying the barber on `date`.
async fn booked_intervals(state: &AppState, barbero_id: i64, date: NaiveDate) -> Result<Vec<Interval>, ApiError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT hora, minutos_reservados FROM citas
         WHERE barbero_id = ? AND fecha = ? AND estado IN ('Pendiente', 'Confirmada')",
    )
    .bind(barbero_id)
    .bind(date.format("%Y-%m-%d").to_string())
    .fetch_all(&state.db)
    .await
    .map_err(|e| db_error("booked_intervals", e))?;

    Ok(rows
        .into_iter()
        .filter_map(|(hora, minutos)| {
            let start: ClockTime = hora.parse().ok()?;
            Some(start.span(minutos.max(0) as u32))
        })
        .collect())
}

struct Resolved {
    date: NaiveDate,
    reservation: u32,
    times: Vec<ClockTime>,
}

/// Bookable start times for (service, barber, date) as of the shop's local now.
async fn resolve_availability(
    state: &AppState,
    servicio_id: i64,
    barbero_id: i64,
    fecha: &str,
) -> Result<Resolved, ApiError> {
    let date = NaiveDate::parse_from_str(fecha, "%Y-%m-%d")
        .map_err(|_| bad_request("Formato de fecha inválido, se espera AAAA-MM-DD"))?;
    let now = state.local_now();
    if date < now.date() {
        return Err(bad_request("No se pueden consultar fechas pasadas"));
    }

    let service = fetch_service(state, servicio_id).await?;
    let reservation = service.reservation().map_err(|e| {
        tracing::error!("service {} has a malformed duration: {}", servicio_id, e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Servicio con duración inválida")
    })?;
    ensure_barber_exists(state, barbero_id).await?;

    let schedule = load_schedule(state, barbero_id).await?;
    let booked = booked_intervals(state, barbero_id, date).await?;
    let after = (date == now.date()).then(|| ClockTime::from_naive(now.time()));

    let times = resolve_start_times(&schedule, date, reservation, &booked, after);
    Ok(Resolved {
        date,
        reservation,
        times,
    })
}

// ── Availability ──

/// GET /citas/disponibilidad?servicioID&barberoID&fecha
pub async fn availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<DisponibilidadQuery>, QueryRejection>,
) -> Result<Json<Vec<String>>, ApiError> {
    auth::authenticate(&headers, &state.auth_secret)?;
    let Query(query) = query.map_err(rejection)?;

    let resolved =
        resolve_availability(&state, query.servicio_id, query.barbero_id, &query.fecha).await?;
    Ok(Json(resolved.times.iter().map(ClockTime::to_string).collect()))
}

// ── Creation ──

enum Patient {
    Registered(i64),
    Temporary { nombre: String, telefono: Option<String> },
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Who the appointment is for. Clients always book for themselves; staff pick
/// exactly one of a registered client or a walk-in.
async fn resolve_patient(state: &AppState, claims: &Claims, body: &CrearCitaRequest) -> Result<Patient, ApiError> {
    let temporal = non_blank(body.paciente_temporal_nombre.as_deref());

    if claims.rol == Role::Cliente {
        if temporal.is_some() {
            return Err(api_error(
                StatusCode::FORBIDDEN,
                "Solo el personal puede registrar clientes temporales",
            ));
        }
        if body.paciente_id.is_some_and(|id| id != claims.id) {
            return Err(api_error(
                StatusCode::FORBIDDEN,
                "No puedes reservar a nombre de otro cliente",
            ));
        }
        return Ok(Patient::Registered(claims.id));
    }

    match (body.paciente_id, temporal) {
        (Some(_), Some(_)) => Err(bad_request(
            "Indica un cliente registrado o un cliente temporal, no ambos",
        )),
        (None, None) => Err(bad_request(
            "Selecciona un cliente o ingresa el nombre del cliente temporal",
        )),
        (Some(id), None) => {
            let exists: bool = sqlx::query_scalar(
                "SELECT COUNT(*) > 0 FROM usuarios WHERE id = ? AND rol = 'cliente'",
            )
            .bind(id)
            .fetch_one(&state.db)
            .await
            .map_err(|e| db_error("resolve_patient", e))?;
            if exists {
                Ok(Patient::Registered(id))
            } else {
                Err(not_found("Cliente no encontrado"))
            }
        }
        (None, Some(nombre)) => Ok(Patient::Temporary {
            nombre,
            telefono: non_blank(body.paciente_temporal_telefono.as_deref()),
        }),
    }
}

/// POST /citas
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CrearCitaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CitaDetalle>), ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    let Json(body) = body.map_err(rejection)?;

    let hora: ClockTime = body
        .hora
        .parse()
        .map_err(|_| bad_request("Formato de hora inválido, se espera HH:MM"))?;
    let patient = resolve_patient(&state, &claims, &body).await?;
    let direccion = non_blank(body.direccion.as_deref()).unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

    // Held until the row is inserted so the slot check cannot race another booking.
    let _guard = state.booking_lock.lock().await;

    let resolved = resolve_availability(&state, body.servicio_id, body.barbero_id, &body.fecha).await?;
    if !resolved.times.contains(&hora) {
        tracing::warn!(
            "slot {} {} for barber {} not available",
            body.fecha,
            hora,
            body.barbero_id
        );
        return Err(conflict("El horario seleccionado ya no está disponible"));
    }

    let (paciente_id, temporal_nombre, temporal_telefono) = match patient {
        Patient::Registered(id) => (Some(id), None, None),
        Patient::Temporary { nombre, telefono } => (None, Some(nombre), telefono),
    };

    let id = sqlx::query(
        "INSERT INTO citas (servicio_id, barbero_id, paciente_id, paciente_temporal_nombre,
         paciente_temporal_telefono, fecha, hora, minutos_reservados, direccion, estado)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(body.servicio_id)
    .bind(body.barbero_id)
    .bind(paciente_id)
    .bind(temporal_nombre)
    .bind(temporal_telefono)
    .bind(resolved.date.format("%Y-%m-%d").to_string())
    .bind(hora.to_string())
    .bind(i64::from(resolved.reservation))
    .bind(&direccion)
    .bind(AppointmentStatus::Pending.as_str())
    .execute(&state.db)
    .await
    .map_err(|e| db_error("create_appointment", e))?
    .last_insert_rowid();

    tracing::info!(
        "appointment {} booked by user {} for {} {}",
        id,
        claims.id,
        body.fecha,
        hora
    );

    Ok((StatusCode::CREATED, Json(fetch_detail(&state, id).await?)))
}

// ── Transitions ──

/// Admins act on any appointment, barbers on their own agenda, clients
/// (when `allow_owner`) on appointments booked for them.
async fn authorize_appointment(
    state: &AppState,
    claims: &Claims,
    cita: &AppointmentState,
    allow_owner: bool,
) -> Result<(), ApiError> {
    let allowed = match claims.rol {
        Role::Admin => true,
        Role::Barbero => barber_id_for_user(state, claims.id).await? == Some(cita.barbero_id),
        Role::Cliente => allow_owner && cita.paciente_id == Some(claims.id),
    };
    if allowed {
        Ok(())
    } else {
        Err(forbidden())
    }
}

/// Move an appointment to `next`, guarding on its current status so
/// concurrent changes (including the sweep) are detected.
async fn change_status(
    state: &AppState,
    id: i64,
    current: AppointmentStatus,
    next: AppointmentStatus,
    zona_horaria: Option<&str>,
) -> Result<(), ApiError> {
    current
        .transition(next)
        .map_err(|e| conflict(e.to_string()))?;

    let updated = sqlx::query(
        "UPDATE citas SET estado = ?,
            zona_horaria = COALESCE(?, zona_horaria),
            cancelled_at = CASE WHEN ? = 'Cancelada' THEN datetime('now') ELSE cancelled_at END
         WHERE id = ? AND estado = ?",
    )
    .bind(next.as_str())
    .bind(zona_horaria)
    .bind(next.as_str())
    .bind(id)
    .bind(current.as_str())
    .execute(&state.db)
    .await
    .map_err(|e| db_error("change_status", e))?
    .rows_affected();

    if updated == 0 {
        return Err(conflict("La cita cambió de estado. Actualiza la lista e intenta de nuevo"));
    }
    tracing::info!("appointment {}: {} -> {}", id, current, next);
    Ok(())
}

fn current_status(cita: &AppointmentState) -> Result<AppointmentStatus, ApiError> {
    cita.estado
        .parse()
        .map_err(|e| db_error(&format!("appointment {} has unknown status", cita.id), e))
}

/// PUT /citas/cancelar-cita/:id
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    body: Result<Json<CancelarCitaRequest>, JsonRejection>,
) -> Result<Json<Mensaje>, ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    let Json(body) = body.map_err(rejection)?;
    let zona = body.zona_horaria.trim();
    if zona.is_empty() {
        return Err(bad_request("La zona horaria es obligatoria"));
    }

    let cita = fetch_state(&state, id).await?;
    authorize_appointment(&state, &claims, &cita, true).await?;

    let current = current_status(&cita)?;
    if !current.is_cancellable() {
        return Err(conflict("Solo se pueden cancelar citas pendientes o confirmadas"));
    }
    change_status(&state, id, current, AppointmentStatus::Cancelled, Some(zona)).await?;

    Ok(Json(Mensaje::new("Cita cancelada correctamente")))
}

async fn staff_transition(
    state: &AppState,
    headers: &HeaderMap,
    id: i64,
    next: AppointmentStatus,
) -> Result<CitaDetalle, ApiError> {
    let claims = auth::authenticate(headers, &state.auth_secret)?;
    auth::require_staff(&claims)?;

    let cita = fetch_state(state, id).await?;
    authorize_appointment(state, &claims, &cita, false).await?;
    change_status(state, id, current_status(&cita)?, next, None).await?;

    fetch_detail(state, id).await
}

/// PUT /citas/:id/confirmar
pub async fn confirm_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<CitaDetalle>, ApiError> {
    staff_transition(&state, &headers, id, AppointmentStatus::Confirmed)
        .await
        .map(Json)
}

/// PUT /citas/:id/completar
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<CitaDetalle>, ApiError> {
    staff_transition(&state, &headers, id, AppointmentStatus::Completed)
        .await
        .map(Json)
}

// ── Listings ──

async fn list_where(state: &AppState, filter: &str, bind: Option<i64>) -> Result<Vec<CitaDetalle>, ApiError> {
    let sql = format!("{} {} {}", CITA_DETALLE_SELECT, filter, CITA_ORDER);
    let mut query = sqlx::query_as::<_, AppointmentRow>(&sql);
    if let Some(value) = bind {
        query = query.bind(value);
    }
    let rows = query
        .fetch_all(&state.db)
        .await
        .map_err(|e| db_error("list_appointments", e))?;
    to_details(rows)
}

/// GET /citas (admin): every appointment
pub async fn list_all(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CitaDetalle>>, ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    auth::require_admin(&claims)?;
    Ok(Json(list_where(&state, "", None).await?))
}

/// GET /citas/by-barber (barbero): the caller's agenda
pub async fn list_by_barber(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CitaDetalle>>, ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    if claims.rol != Role::Barbero {
        return Err(forbidden());
    }
    let barbero_id = barber_id_for_user(&state, claims.id)
        .await?
        .ok_or_else(|| not_found("No tienes un perfil de barbero"))?;
    Ok(Json(list_where(&state, "WHERE c.barbero_id = ?", Some(barbero_id)).await?))
}

/// GET /citas/patient-dates (cliente): the caller's own appointments
pub async fn list_patient_dates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CitaDetalle>>, ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    if claims.rol != Role::Cliente {
        return Err(forbidden());
    }
    Ok(Json(list_where(&state, "WHERE c.paciente_id = ?", Some(claims.id)).await?))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{call, insert_appointment, seeded_pool, test_app, token, Seed};
    use axum::http::{Method, StatusCode};
    use axum::Router;
    use barberia_agenda::{Role, WEEKDAY_KEYS};
    use serde_json::{json, Value};

    const DATE: &str = "2099-03-02";

    /// Same allow-list every day, lunch 13:00–14:00.
    async fn install_schedule(app: &Router, seed: &Seed, activo: bool) {
        let horas = ["09:00", "09:30", "10:00", "10:30", "11:00", "13:00", "13:30", "14:00"];
        let dias: serde_json::Map<String, Value> = WEEKDAY_KEYS
            .iter()
            .map(|k| (k.to_string(), json!({ "activo": activo, "horas": horas })))
            .collect();
        let body = json!({
            "diasLaborales": dias,
            "horarioAlmuerzo": { "inicio": "13:00", "fin": "14:00", "activo": true },
            "excepciones": []
        });
        let admin = token(seed.admin_id, Role::Admin);
        let uri = format!("/barberos/{}/horario", seed.barber_id);
        let (status, _) = call(app, Method::PUT, &uri, Some(&admin), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    fn availability_uri(seed: &Seed, fecha: &str) -> String {
        format!(
            "/citas/disponibilidad?servicioID={}&barberoID={}&fecha={}",
            seed.service_id, seed.barber_id, fecha
        )
    }

    fn booking(seed: &Seed, hora: &str) -> Value {
        json!({
            "servicioID": seed.service_id,
            "barberoID": seed.barber_id,
            "fecha": DATE,
            "hora": hora,
        })
    }

    #[tokio::test]
    async fn test_availability_subtracts_bookings_and_lunch() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        install_schedule(&app, &seed, true).await;
        insert_appointment(&seed, DATE, "10:00", "Pendiente").await;
        // Cancelled appointments free their slot
        insert_appointment(&seed, DATE, "09:00", "Cancelada").await;

        let tk = token(seed.client_id, Role::Cliente);
        let (status, body) = call(&app, Method::GET, &availability_uri(&seed, DATE), Some(&tk), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["09:00", "11:00", "14:00"]));
    }

    #[tokio::test]
    async fn test_availability_inactive_day_is_empty() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        install_schedule(&app, &seed, false).await;
        let tk = token(seed.client_id, Role::Cliente);
        let (status, body) = call(&app, Method::GET, &availability_uri(&seed, DATE), Some(&tk), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_availability_validation_errors() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        let tk = token(seed.client_id, Role::Cliente);

        let (status, body) = call(&app, Method::GET, &availability_uri(&seed, "2000-01-03"), Some(&tk), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "No se pueden consultar fechas pasadas");

        let (status, _) = call(&app, Method::GET, &availability_uri(&seed, "02/03/2099"), Some(&tk), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/citas/disponibilidad?servicioID=999&barberoID={}&fecha={}", seed.barber_id, DATE);
        let (status, body) = call(&app, Method::GET, &uri, Some(&tk), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["mensaje"], "Servicio no encontrado");
    }

    #[tokio::test]
    async fn test_client_books_for_self_and_slot_is_taken() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        install_schedule(&app, &seed, true).await;
        let tk = token(seed.client_id, Role::Cliente);

        let (status, cita) = call(&app, Method::POST, "/citas", Some(&tk), Some(booking(&seed, "09:30"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(cita["estado"], "Pendiente");
        assert_eq!(cita["pacienteID"], seed.client_id);
        assert_eq!(cita["pacienteNombre"], "Ana Cliente");
        assert_eq!(cita["horaFin"], "10:30");
        assert_eq!(cita["direccion"], "En barbería");

        // 10:00 overlaps the 09:30–10:30 block just taken
        let (status, err) = call(&app, Method::POST, "/citas", Some(&tk), Some(booking(&seed, "10:00"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["mensaje"], "El horario seleccionado ya no está disponible");
    }

    #[tokio::test]
    async fn test_unpadded_date_sees_existing_bookings() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        install_schedule(&app, &seed, true).await;
        let tk = token(seed.client_id, Role::Cliente);

        let (status, _) = call(&app, Method::POST, "/citas", Some(&tk), Some(booking(&seed, "10:00"))).await;
        assert_eq!(status, StatusCode::CREATED);

        let mut same_slot = booking(&seed, "10:00");
        same_slot["fecha"] = json!("2099-3-2");
        let (status, err) = call(&app, Method::POST, "/citas", Some(&tk), Some(same_slot)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["mensaje"], "El horario seleccionado ya no está disponible");

        let (status, body) = call(&app, Method::GET, &availability_uri(&seed, "2099-3-2"), Some(&tk), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.as_array().unwrap().contains(&json!("10:00")));
    }

    #[tokio::test]
    async fn test_malformed_requests_get_json_message() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        let tk = token(seed.client_id, Role::Cliente);

        let uri = format!("/citas/disponibilidad?barberoID={}&fecha={}", seed.barber_id, DATE);
        let (status, body) = call(&app, Method::GET, &uri, Some(&tk), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["mensaje"].is_string());

        let bad = json!({ "servicioID": "corte", "barberoID": seed.barber_id, "fecha": DATE, "hora": "10:00" });
        let (status, body) = call(&app, Method::POST, "/citas", Some(&tk), Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["mensaje"].is_string());
    }

    #[tokio::test]
    async fn test_staff_books_temporary_client_without_phone() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        install_schedule(&app, &seed, true).await;
        let barber = token(seed.barber_user_id, Role::Barbero);

        let mut body = booking(&seed, "11:00");
        body["pacienteTemporalNombre"] = json!("Pedro Gómez");
        let (status, cita) = call(&app, Method::POST, "/citas", Some(&barber), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(cita["pacienteNombre"], "Pedro Gómez");
        assert_eq!(cita["pacienteID"], Value::Null);
        assert_eq!(cita["pacienteTelefono"], Value::Null);
    }

    #[tokio::test]
    async fn test_patient_kinds_are_exclusive() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        install_schedule(&app, &seed, true).await;
        let admin = token(seed.admin_id, Role::Admin);

        let mut both = booking(&seed, "11:00");
        both["pacienteID"] = json!(seed.client_id);
        both["pacienteTemporalNombre"] = json!("Pedro");
        let (status, _) = call(&app, Method::POST, "/citas", Some(&admin), Some(both)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::POST, "/citas", Some(&admin), Some(booking(&seed, "11:00"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let client = token(seed.client_id, Role::Cliente);
        let mut walk_in = booking(&seed, "11:00");
        walk_in["pacienteTemporalNombre"] = json!("Pedro");
        let (status, _) = call(&app, Method::POST, "/citas", Some(&client), Some(walk_in)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_cancellation_is_status_gated() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        let client = token(seed.client_id, Role::Cliente);
        let id = insert_appointment(&seed, DATE, "10:00", "Confirmada").await;
        let uri = format!("/citas/cancelar-cita/{id}");
        let body = json!({ "zonaHoraria": "America/Mexico_City" });

        let (status, ok) = call(&app, Method::PUT, &uri, Some(&client), Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ok["mensaje"], "Cita cancelada correctamente");

        let (status, err) = call(&app, Method::PUT, &uri, Some(&client), Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["mensaje"], "Solo se pueden cancelar citas pendientes o confirmadas");

        let zona: Option<String> = sqlx::query_scalar("SELECT zona_horaria FROM citas WHERE id = ?")
            .bind(id)
            .fetch_one(&seed.pool)
            .await
            .unwrap();
        assert_eq!(zona.as_deref(), Some("America/Mexico_City"));
    }

    #[tokio::test]
    async fn test_cancel_requires_ownership_and_timezone() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        let id = insert_appointment(&seed, DATE, "10:00", "Pendiente").await;
        let uri = format!("/citas/cancelar-cita/{id}");

        let stranger = token(seed.client_id + 100, Role::Cliente);
        let body = json!({ "zonaHoraria": "America/Mexico_City" });
        let (status, _) = call(&app, Method::PUT, &uri, Some(&stranger), Some(body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let owner = token(seed.client_id, Role::Cliente);
        let (status, _) = call(&app, Method::PUT, &uri, Some(&owner), Some(json!({ "zonaHoraria": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_staff_confirm_then_complete() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        let barber = token(seed.barber_user_id, Role::Barbero);
        let id = insert_appointment(&seed, DATE, "10:00", "Pendiente").await;

        let (status, _) = call(&app, Method::PUT, &format!("/citas/{id}/completar"), Some(&barber), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, cita) = call(&app, Method::PUT, &format!("/citas/{id}/confirmar"), Some(&barber), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cita["estado"], "Confirmada");

        let (status, cita) = call(&app, Method::PUT, &format!("/citas/{id}/completar"), Some(&barber), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cita["estado"], "Completa");

        let client = token(seed.client_id, Role::Cliente);
        let body = json!({ "zonaHoraria": "America/Mexico_City" });
        let (status, _) = call(&app, Method::PUT, &format!("/citas/cancelar-cita/{id}"), Some(&client), Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_clients_cannot_confirm() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        let client = token(seed.client_id, Role::Cliente);
        let id = insert_appointment(&seed, DATE, "10:00", "Pendiente").await;
        let (status, _) = call(&app, Method::PUT, &format!("/citas/{id}/confirmar"), Some(&client), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_listings_are_role_scoped() {
        let seed = seeded_pool().await;
        let app = test_app(&seed);
        insert_appointment(&seed, DATE, "10:00", "Pendiente").await;
        insert_appointment(&seed, DATE, "12:00", "Confirmada").await;

        let client = token(seed.client_id, Role::Cliente);
        let (status, mine) = call(&app, Method::GET, "/citas/patient-dates", Some(&client), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine.as_array().map(Vec::len), Some(2));
        assert_eq!(mine[0]["hora"], "12:00");

        let other = token(seed.client_id + 100, Role::Cliente);
        let (_, none) = call(&app, Method::GET, "/citas/patient-dates", Some(&other), None).await;
        assert_eq!(none, json!([]));

        let (status, _) = call(&app, Method::GET, "/citas", Some(&client), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let barber = token(seed.barber_user_id, Role::Barbero);
        let (_, agenda) = call(&app, Method::GET, "/citas/by-barber", Some(&barber), None).await;
        assert_eq!(agenda.as_array().map(Vec::len), Some(2));

        let admin = token(seed.admin_id, Role::Admin);
        let (_, all) = call(&app, Method::GET, "/citas", Some(&admin), None).await;
        assert_eq!(all[1]["barberoNombre"], "Juan Barbero");
    }
}
