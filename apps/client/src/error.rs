use thiserror::Error;

use barberia_agenda::AgendaError;

/// Shown when the server gives no message of its own.
pub const GENERIC_ERROR: &str = "Ocurrió un error inesperado. Intenta de nuevo.";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("No se pudo conectar con el servidor: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response; `mensaje` is the server's text, meant for the user.
    #[error("{mensaje}")]
    Server { status: u16, mensaje: String },

    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    /// Build a server error from a response body, preferring its
    /// `mensaje` field, then `message`.
    pub fn from_response_body(status: u16, body: &str) -> Self {
        let mensaje = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                ["mensaje", "message"].iter().find_map(|key| {
                    json.get(key)
                        .and_then(|v| v.as_str())
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                })
            })
            .unwrap_or_else(|| GENERIC_ERROR.to_string());
        ClientError::Server { status, mensaje }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            ClientError::Validation(_) => None,
        }
    }
}

impl From<AgendaError> for ClientError {
    fn from(e: AgendaError) -> Self {
        ClientError::Validation(e.to_string())
    }
}
