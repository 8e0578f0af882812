use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use barberia_agenda::wire::Mensaje;
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Request classes with independent budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Catalog reads and availability queries.
    Consulta,
    /// Appointment creation.
    Reserva,
    /// Authenticated listings and appointment state changes.
    Sesion,
    /// Catalog and schedule administration.
    Staff,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

type TierMap = DashMap<Tier, (RateLimitConfig, DashMap<IpAddr, Vec<Instant>>)>;

/// In-memory per-IP sliding window limiter.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    tiers: Arc<TierMap>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Production budgets for every tier.
    pub fn with_default_tiers() -> Self {
        let limiter = Self::new();
        limiter.add_tier(Tier::Consulta, 60, Duration::from_secs(60));
        limiter.add_tier(Tier::Reserva, 10, Duration::from_secs(300));
        limiter.add_tier(Tier::Sesion, 30, Duration::from_secs(60));
        limiter.add_tier(Tier::Staff, 120, Duration::from_secs(60));
        limiter
    }

    pub fn add_tier(&self, tier: Tier, max_requests: u32, window: Duration) {
        let config = RateLimitConfig {
            max_requests,
            window,
        };
        self.tiers.insert(tier, (config, DashMap::new()));
    }

    /// `Err(retry_after_secs)` when `ip` exhausted the tier. Unconfigured tiers are unlimited.
    pub fn check(&self, tier: Tier, ip: IpAddr) -> Result<(), u64> {
        let Some(tier_entry) = self.tiers.get(&tier) else {
            return Ok(());
        };
        let (config, ip_map) = tier_entry.value();
        let now = Instant::now();

        let mut stamps = ip_map.entry(ip).or_default();
        stamps.retain(|t| now.duration_since(*t) < config.window);

        if stamps.len() >= config.max_requests as usize {
            let retry_after = (stamps[0] + config.window)
                .saturating_duration_since(now)
                .as_secs()
                .max(1);
            return Err(retry_after);
        }

        stamps.push(now);
        Ok(())
    }

    /// Drop IPs idle for more than twice their tier's window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        for tier_entry in self.tiers.iter() {
            let (config, ip_map) = tier_entry.value();
            let cutoff = config.window * 2;
            ip_map.retain(|_, stamps| {
                stamps.retain(|t| now.duration_since(*t) < cutoff);
                !stamps.is_empty()
            });
        }
    }
}

/// Which budget a request draws from. `None` means unlimited.
pub fn tier_for(method: &Method, path: &str) -> Option<Tier> {
    if path.starts_with("/api/health") {
        return None;
    }
    let catalog = path.starts_with("/servicios")
        || path.starts_with("/barberos")
        || path.starts_with("/clientes");

    match (method, path) {
        (&Method::POST, "/citas") => Some(Tier::Reserva),
        (&Method::GET, "/citas/disponibilidad") => Some(Tier::Consulta),
        (&Method::GET, p) if catalog && !p.ends_with("/horario") => Some(Tier::Consulta),
        _ if catalog => Some(Tier::Staff),
        _ => Some(Tier::Sesion),
    }
}

/// Client IP from `X-Forwarded-For` (reverse proxy) or the socket.
pub fn client_ip(req: &Request) -> IpAddr {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn too_many_requests(retry_after: u64) -> Response {
    let body = Mensaje::new(format!(
        "Demasiadas solicitudes. Intenta de nuevo en {} segundos",
        retry_after
    ));
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("Retry-After", retry_after.to_string())],
        Json(body),
    )
        .into_response()
}

/// Middleware applying the tier chosen by [`tier_for`].
pub async fn enforce(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    if let Some(tier) = tier_for(req.method(), req.uri().path()) {
        let ip = client_ip(&req);
        limiter.check(tier, ip).map_err(|retry| {
            tracing::warn!("rate limited {} on {:?}", ip, tier);
            too_many_requests(retry)
        })?;
    }
    Ok(next.run(req).await)
}
