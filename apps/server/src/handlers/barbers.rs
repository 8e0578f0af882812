use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use barberia_agenda::wire::{Barbero, Cliente, Mensaje};
use std::sync::Arc;

use crate::{auth, models::*, AppState};

#[derive(sqlx::FromRow)]
struct BarberRow {
    id: i64,
    nombre: String,
    telefono: Option<String>,
    verificado: bool,
    email: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: i64,
    nombre: String,
    email: Option<String>,
    telefono: Option<String>,
}

/// Barber row id for the user behind a token, if that user is a barber.
pub(crate) async fn barber_id_for_user(state: &AppState, user_id: i64) -> Result<Option<i64>, ApiError> {
    sqlx::query_scalar("SELECT id FROM barberos WHERE usuario_id = ?")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| db_error("barber_id_for_user", e))
}

pub(crate) async fn ensure_barber_exists(state: &AppState, id: i64) -> Result<(), ApiError> {
    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM barberos WHERE id = ?")
        .bind(id)
        .fetch_one(&state.db)
        .await
        .map_err(|e| db_error("ensure_barber_exists", e))?;
    if exists {
        Ok(())
    } else {
        Err(not_found("Barbero no encontrado"))
    }
}

/// GET /barberos
pub async fn list_barbers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Barbero>>, ApiError> {
    auth::authenticate(&headers, &state.auth_secret)?;

    let rows = sqlx::query_as::<_, BarberRow>(
        "SELECT b.id, b.nombre, b.telefono, b.verificado, u.email
         FROM barberos b
         LEFT JOIN usuarios u ON u.id = b.usuario_id
         ORDER BY b.nombre ASC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| db_error("list_barbers", e))?;

    Ok(Json(
        rows.into_iter()
            .map(|r| Barbero {
                id: r.id,
                nombre: r.nombre,
                telefono: r.telefono,
                verificado: r.verificado,
                email: r.email,
            })
            .collect(),
    ))
}

/// DELETE /barberos/:id (admin): refused while the barber has appointments
pub async fn delete_barber(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Mensaje>, ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    auth::require_admin(&claims)?;
    ensure_barber_exists(&state, id).await?;

    let has_appointments: bool =
        sqlx::query_scalar("SELECT COUNT(*) > 0 FROM citas WHERE barbero_id = ?")
            .bind(id)
            .fetch_one(&state.db)
            .await
            .map_err(|e| db_error("delete_barber", e))?;
    if has_appointments {
        return Err(conflict(
            "No se puede eliminar el barbero porque tiene citas asociadas",
        ));
    }

    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| db_error("delete_barber", e))?;
    sqlx::query("DELETE FROM horarios WHERE barbero_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("delete_barber", e))?;
    sqlx::query("DELETE FROM barberos WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("delete_barber", e))?;
    tx.commit()
        .await
        .map_err(|e| db_error("delete_barber", e))?;

    tracing::info!("barber {} deleted by {}", id, claims.id);
    Ok(Json(Mensaje::new("Barbero eliminado")))
}

/// GET /clientes (staff): registered clients for booking on their behalf
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Cliente>>, ApiError> {
    let claims = auth::authenticate(&headers, &state.auth_secret)?;
    auth::require_staff(&claims)?;

    let rows = sqlx::query_as::<_, ClientRow>(
        "SELECT id, nombre, email, telefono FROM usuarios WHERE rol = 'cliente' ORDER BY nombre ASC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| db_error("list_clients", e))?;

    Ok(Json(
        rows.into_iter()
            .map(|r| Cliente {
                id: r.id,
                nombre: r.nombre,
                email: r.email,
                telefono: r.telefono,
            })
            .collect(),
    ))
}
