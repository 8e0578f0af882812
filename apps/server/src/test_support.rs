//! Fixtures for handler and sweep tests: an in-memory database with one
//! admin, one barber, one client and one 45-minute service.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use barberia_agenda::Role;
use chrono::FixedOffset;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;

use crate::auth::{sign_token, Claims};
use crate::rate_limit::RateLimiter;
use crate::{app, db, AppState};

pub const SECRET: &str = "test-secret";

pub struct Seed {
    pub pool: SqlitePool,
    pub admin_id: i64,
    pub barber_user_id: i64,
    pub barber_id: i64,
    pub client_id: i64,
    pub service_id: i64,
}

pub async fn seeded_pool() -> Seed {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();

    let admin_id: i64 = sqlx::query_scalar("SELECT id FROM usuarios WHERE rol = 'admin'")
        .fetch_one(&pool)
        .await
        .unwrap();
    let barber_user_id = sqlx::query(
        "INSERT INTO usuarios (nombre, email, telefono, rol)
         VALUES ('Juan Barbero', 'juan@barberia.local', '5550001', 'barbero')",
    )
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();
    let barber_id = sqlx::query(
        "INSERT INTO barberos (usuario_id, nombre, telefono, verificado) VALUES (?, 'Juan Barbero', '5550001', 1)",
    )
    .bind(barber_user_id)
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();
    let client_id = sqlx::query(
        "INSERT INTO usuarios (nombre, email, rol) VALUES ('Ana Cliente', 'ana@correo.mx', 'cliente')",
    )
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();
    let service_id = sqlx::query(
        "INSERT INTO servicios (nombre, precio, duracion_maxima) VALUES ('Corte clásico', 150, '00:45')",
    )
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();

    Seed {
        pool,
        admin_id,
        barber_user_id,
        barber_id,
        client_id,
        service_id,
    }
}

/// Insert an appointment for the seeded client with a 60-minute block.
pub async fn insert_appointment(seed: &Seed, fecha: &str, hora: &str, estado: &str) -> i64 {
    sqlx::query(
        "INSERT INTO citas (servicio_id, barbero_id, paciente_id, fecha, hora, minutos_reservados, estado)
         VALUES (?, ?, ?, ?, ?, 60, ?)",
    )
    .bind(seed.service_id)
    .bind(seed.barber_id)
    .bind(seed.client_id)
    .bind(fecha)
    .bind(hora)
    .bind(estado)
    .execute(&seed.pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub fn test_app(seed: &Seed) -> Router {
    let state = AppState::new(
        seed.pool.clone(),
        SECRET.into(),
        FixedOffset::east_opt(0).unwrap(),
    );
    app(Arc::new(state), RateLimiter::new())
}

pub fn token(id: i64, rol: Role) -> String {
    let claims = Claims {
        id,
        rol,
        nombre: "Test".into(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    sign_token(&claims, SECRET).unwrap()
}

/// Send a request and decode the JSON response body.
pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
