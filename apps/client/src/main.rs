use barberia_agenda::wire::CitaDetalle;
use barberia_client::{ApiClient, AppointmentBoard, Layout, Session, StatusFilter};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Terminal client for the barbershop agenda. Credentials come from
/// `BARBERIA_API_URL` and `BARBERIA_TOKEN`.
#[derive(Debug, Parser)]
#[command(name = "barberia", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Subcommand)]
enum Command {
    /// Citas visibles para tu rol
    Citas {
        /// Estado (pendiente, confirmada, completa, cancelada, expirada) o "todos"
        #[arg(default_value = "todos")]
        estado: StatusFilter,
        /// Texto a buscar en barbero, cliente, servicio o estado
        busqueda: Vec<String>,
    },
    /// Horarios libres de un barbero para un servicio y fecha
    Disponibilidad {
        servicio: i64,
        barbero: i64,
        /// AAAA-MM-DD
        fecha: NaiveDate,
    },
    /// Cancela una cita pendiente o confirmada
    Cancelar {
        id: i64,
        #[arg(env = "TZ", default_value = "America/Mexico_City")]
        zona_horaria: String,
    },
    /// Catálogo de servicios
    Servicios,
    /// Horario semanal de un barbero
    Horario { barbero: i64 },
}

fn print_cita(index: usize, cita: &CitaDetalle) {
    println!(
        "{}. #{} {} {}–{}  {}",
        index + 1,
        cita.id,
        cita.fecha,
        cita.hora,
        cita.hora_fin,
        cita.estado
    );
    println!(
        "   {} · {} · ${:.2}",
        cita.servicio_nombre, cita.barbero_nombre, cita.precio
    );
    let telefono = cita
        .paciente_telefono
        .as_deref()
        .map(|t| format!(" ({t})"))
        .unwrap_or_default();
    let temporal = if cita.is_temporary_client() { " [temporal]" } else { "" };
    println!("   {}{}{}", cita.paciente_nombre, telefono, temporal);
}

async fn run(api: &ApiClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Citas { estado, busqueda } => {
            let mut board = AppointmentBoard::new(Layout::Scroll);
            board.refresh(api).await?;
            board.set_filter(estado);
            board.set_search(&busqueda.join(" "));

            let citas = board.visible();
            if citas.is_empty() {
                println!("No hay citas.");
                return Ok(());
            }
            for (i, cita) in citas.iter().enumerate() {
                print_cita(i, cita);
            }
            let total: f64 = citas.iter().map(|c| c.precio).sum();
            println!("Total: {} citas · ${:.2}", citas.len(), total);
        }
        Command::Disponibilidad {
            servicio,
            barbero,
            fecha,
        } => {
            let horas = api.disponibilidad(servicio, barbero, fecha).await?;
            if horas.is_empty() {
                println!("Sin citas disponibles.");
            } else {
                let horas: Vec<String> = horas.iter().map(|h| h.to_string()).collect();
                println!("{}", horas.join("  "));
            }
        }
        Command::Cancelar { id, zona_horaria } => {
            let mut board = AppointmentBoard::new(Layout::Scroll);
            board.refresh(api).await?;
            let pending = board.request_cancel(id)?;
            let outcome = board.confirm_cancel(pending, api, &zona_horaria).await?;
            println!("{}", outcome.mensaje.mensaje);
            if let Err(e) = outcome.refresh {
                eprintln!("No se pudo actualizar la lista de citas: {e}");
            }
        }
        Command::Servicios => {
            for s in api.servicios().await? {
                println!(
                    "#{} {} · ${:.2} · {} (reserva {} min)",
                    s.id, s.nombre, s.precio, s.duracion_maxima, s.intervalo_reserva
                );
            }
        }
        Command::Horario { barbero } => {
            let horario = api.horario(barbero).await?;
            for (dia, jornada) in &horario.dias_laborales {
                if jornada.activo {
                    println!("{dia}: {}", jornada.horas.join(" "));
                } else {
                    println!("{dia}: descanso");
                }
            }
            let almuerzo = &horario.horario_almuerzo;
            if almuerzo.activo {
                println!("almuerzo: {}–{}", almuerzo.inicio, almuerzo.fin);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,barberia_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let session = Session::from_env()?;
    tracing::debug!("session for user {} as {}", session.user_id, session.role);
    let api = ApiClient::new(session);

    if let Err(e) = run(&api, cli.command).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
    Ok(())
}
