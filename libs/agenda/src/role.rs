use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller role carried in the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Cliente,
    Barbero,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cliente => "cliente",
            Self::Barbero => "barbero",
            Self::Admin => "admin",
        }
    }

    /// Staff can book on behalf of other people.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Barbero | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cliente" => Ok(Self::Cliente),
            "barbero" => Ok(Self::Barbero),
            "admin" => Ok(Self::Admin),
            other => Err(format!("Rol desconocido: {other}")),
        }
    }
}
