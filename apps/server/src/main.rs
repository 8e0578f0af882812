mod auth;
mod db;
mod handlers;
mod models;
mod rate_limit;
mod sweep;
#[cfg(test)]
mod test_support;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{FixedOffset, NaiveDateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rate_limit::RateLimiter;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub auth_secret: String,
    /// Offset of the shop's local time, used for "today" and the sweep.
    pub utc_offset: FixedOffset,
    pub started_at: Instant,
    /// Serialises the availability check and insert of new appointments.
    pub booking_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, auth_secret: String, utc_offset: FixedOffset) -> Self {
        Self {
            db,
            auth_secret,
            utc_offset,
            started_at: Instant::now(),
            booking_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.utc_offset).naive_local()
    }
}

/// Default interval between appointment lifecycle sweeps (seconds).
const SWEEP_INTERVAL_SECS: u64 = 300;
/// Rate limit cleanup interval (seconds).
const RATE_LIMIT_CLEANUP_SECS: u64 = 300;

pub fn app(state: Arc<AppState>, limiter: RateLimiter) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::health))
        // Catalog
        .route("/servicios", get(handlers::services::list_services))
        .route("/servicios", post(handlers::services::create_service))
        .route("/servicios/{id}", put(handlers::services::update_service))
        .route("/servicios/{id}", delete(handlers::services::delete_service))
        .route("/barberos", get(handlers::barbers::list_barbers))
        .route("/barberos/{id}", delete(handlers::barbers::delete_barber))
        .route("/barberos/{id}/horario", get(handlers::schedule::get_schedule))
        .route("/barberos/{id}/horario", put(handlers::schedule::put_schedule))
        .route("/clientes", get(handlers::barbers::list_clients))
        // Appointments
        .route("/citas/disponibilidad", get(handlers::appointments::availability))
        .route("/citas", post(handlers::appointments::create_appointment))
        .route("/citas", get(handlers::appointments::list_all))
        .route("/citas/by-barber", get(handlers::appointments::list_by_barber))
        .route("/citas/patient-dates", get(handlers::appointments::list_patient_dates))
        .route(
            "/citas/cancelar-cita/{id}",
            put(handlers::appointments::cancel_appointment),
        )
        .route("/citas/{id}/confirmar", put(handlers::appointments::confirm_appointment))
        .route("/citas/{id}/completar", put(handlers::appointments::complete_appointment))
        .layer(from_fn_with_state(limiter, rate_limit::enforce))
        .with_state(state)
}

/// `barberia-server token <usuario_id>`: print a bearer token for an existing user.
async fn print_token(pool: &sqlx::SqlitePool, secret: &str, user_id: &str) -> anyhow::Result<()> {
    let id: i64 = user_id.parse()?;
    let (nombre, rol): (String, String) =
        sqlx::query_as("SELECT nombre, rol FROM usuarios WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| anyhow::anyhow!("usuario {} no existe", id))?;

    let claims = auth::Claims {
        id,
        rol: rol.parse().map_err(anyhow::Error::msg)?,
        nombre,
        exp: Utc::now().timestamp() + auth::TOKEN_TTL_SECS,
    };
    println!("{}", auth::sign_token(&claims, secret)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── Configuration ──
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:barberia.db?mode=rwc".into());
    let auth_secret = std::env::var("AUTH_SECRET")
        .map_err(|_| anyhow::anyhow!("AUTH_SECRET must be set"))?;
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let offset_hours: i32 = std::env::var("UTC_OFFSET_HOURS")
        .ok()
        .map(|v| v.parse())
        .transpose()?
        .unwrap_or(-6);
    let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
        .ok_or_else(|| anyhow::anyhow!("UTC_OFFSET_HOURS out of range: {}", offset_hours))?;
    let sweep_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .map(|v| v.parse())
        .transpose()?
        .unwrap_or(SWEEP_INTERVAL_SECS);
    let cors_origin = std::env::var("CORS_ORIGIN").ok();

    // ── Database ──
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    db::run_migrations(&pool).await?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [command, user_id] = args.as_slice() {
        if command == "token" {
            return print_token(&pool, &auth_secret, user_id).await;
        }
    }

    let state = Arc::new(AppState::new(pool, auth_secret, utc_offset));

    // ── Background task: expire and complete appointments ──
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_secs));
        loop {
            interval.tick().await;
            let now = sweep_state.local_now();
            if let Err(e) = sweep::sweep_appointments(&sweep_state.db, now).await {
                tracing::error!("appointment sweep failed: {}", e);
            }
        }
    });

    // ── Rate limiter ──
    let rate_limiter = RateLimiter::with_default_tiers();
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(RATE_LIMIT_CLEANUP_SECS));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup();
        }
    });

    // ── CORS: whitelist CORS_ORIGIN when configured, otherwise allow any ──
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin.parse()?))
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let router = app(state, rate_limiter)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Barbería server starting on {} (UTC{:+})", addr, offset_hours);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
