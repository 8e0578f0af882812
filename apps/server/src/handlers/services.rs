use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use barberia_agenda::{parse_duration, wire::{Mensaje, Servicio}};
use std::sync::Arc;

use crate::{auth, models::*, AppState};

const SERVICE_COLUMNS: &str = "SELECT id, nombre, precio, duracion_maxima FROM servicios";

pub(crate) async fn fetch_service(state: &AppState, id: i64) -> Result<ServiceRow, ApiError> {
    sqlx::query_as::<_, ServiceRow>(&format!("{} WHERE id = ?", SERVICE_COLUMNS))
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| db_error("fetch_service", e))?
        .ok_or_else(|| not_found("Servicio no encontrado"))
}

fn to_wire(row: ServiceRow) -> Result<Servicio, ApiError> {
    let id = row.id;
    row.into_wire().map_err(|e| {
        tracing::error!("service {} has a malformed duration: {}", id, e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Servicio con duración inválida")
    })
}

fn validate_duration(duracion: &str) -> Result<(), ApiError> {
    parse_duration(duracion)
        .map(|_| ())
        .map_err(|_| bad_request("La duración debe tener el formato HH:MM y ser mayor a cero"))
}

/// GET /servicios
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Servicio>>, ApiError> {
    auth::authenticate(&headers, &state.auth_secret)?;

    let rows = sqlx::query_as::<_, ServiceRow>(&format!("{} ORDER BY nombre ASC", SERVICE_COLUMNS))
        .fetch_all(&state.db)
        .await
        .map_err(|e| db_error("list_services", e))?;

    let servicios = rows.into_iter().map(to_wire).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(servicios))
}

/// POST /servicios (admin)
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CreateServiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Servicio>), ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    auth::require_admin(&claims)?;
    let Json(body) = body.map_err(rejection)?;

    if body.nombre.trim().is_empty() {
        return Err(bad_request("El nombre del servicio es obligatorio"));
    }
    if body.precio < 0.0 {
        return Err(bad_request("El precio no puede ser negativo"));
    }
    validate_duration(&body.duracion_maxima)?;

    let id = sqlx::query("INSERT INTO servicios (nombre, precio, duracion_maxima) VALUES (?, ?, ?)")
        .bind(body.nombre.trim())
        .bind(body.precio)
        .bind(&body.duracion_maxima)
        .execute(&state.db)
        .await
        .map_err(|e| db_error("create_service", e))?
        .last_insert_rowid();

    tracing::info!("service {} created by {}", id, claims.id);
    let servicio = to_wire(fetch_service(&state, id).await?)?;
    Ok((StatusCode::CREATED, Json(servicio)))
}

/// PUT /servicios/:id (admin): partial update
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    body: Result<Json<UpdateServiceRequest>, JsonRejection>,
) -> Result<Json<Servicio>, ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    auth::require_admin(&claims)?;
    let Json(body) = body.map_err(rejection)?;

    let current = fetch_service(&state, id).await?;
    if let Some(duracion) = &body.duracion_maxima {
        validate_duration(duracion)?;
    }
    if body.precio.is_some_and(|p| p < 0.0) {
        return Err(bad_request("El precio no puede ser negativo"));
    }

    let nombre = body
        .nombre
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(current.nombre.as_str());

    sqlx::query("UPDATE servicios SET nombre = ?, precio = ?, duracion_maxima = ? WHERE id = ?")
        .bind(nombre)
        .bind(body.precio.unwrap_or(current.precio))
        .bind(body.duracion_maxima.as_deref().unwrap_or(current.duracion_maxima.as_str()))
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(|e| db_error("update_service", e))?;

    Ok(Json(to_wire(fetch_service(&state, id).await?)?))
}

/// DELETE /servicios/:id (admin): refused while appointments reference it
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Mensaje>, ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    auth::require_admin(&claims)?;
    fetch_service(&state, id).await?;

    let in_use: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM citas WHERE servicio_id = ?")
        .bind(id)
        .fetch_one(&state.db)
        .await
        .map_err(|e| db_error("delete_service", e))?;
    if in_use {
        return Err(conflict(
            "No se puede eliminar el servicio porque tiene citas asociadas",
        ));
    }

    sqlx::query("DELETE FROM servicios WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(|e| db_error("delete_service", e))?;

    Ok(Json(Mensaje::new("Servicio eliminado")))
}
