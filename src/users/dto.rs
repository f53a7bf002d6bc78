use serde::{Deserialize, Serialize};

use crate::users::{repo_types::UserSummary, validation::ValidationErrors};

/// Request body for POST /v1/usuarios.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub nombre_completo: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contrasenia: Option<String>,
}

/// Request body for PUT /v1/usuarios/:id. A password here is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub nombre_completo: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Request body for POST /v1/login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contrasenia: Option<String>,
}

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string())
}

/// Emails are compared and stored lowercased.
fn email(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_lowercase())
}

impl CreateUserRequest {
    /// Trims every field and lowercases the email, before any rule runs.
    pub fn normalized(self) -> Self {
        Self {
            nombre_completo: trimmed(self.nombre_completo),
            email: email(self.email),
            contrasenia: trimmed(self.contrasenia),
        }
    }
}

impl UpdateUserRequest {
    pub fn normalized(self) -> Self {
        Self {
            nombre_completo: trimmed(self.nombre_completo),
            email: email(self.email),
        }
    }
}

impl LoginRequest {
    pub fn normalized(self) -> Self {
        Self {
            email: email(self.email),
            contrasenia: trimmed(self.contrasenia),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Estado {
    Exito,
    Error,
}

/// Response envelope shared by every endpoint. Absent parts are omitted.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub estado: Estado,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensaje: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensajes: Option<ValidationErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usuario: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usuarios: Option<Vec<UserSummary>>,
}

impl Envelope {
    pub fn ok() -> Self {
        Self {
            estado: Estado::Exito,
            mensaje: None,
            mensajes: None,
            usuario: None,
            usuarios: None,
        }
    }

    pub fn error(mensaje: impl Into<String>) -> Self {
        Self {
            estado: Estado::Error,
            mensaje: Some(mensaje.into()),
            ..Self::ok()
        }
    }

    pub fn invalid(mensajes: ValidationErrors) -> Self {
        Self {
            estado: Estado::Error,
            mensajes: Some(mensajes),
            ..Self::ok()
        }
    }

    pub fn message(mut self, mensaje: impl Into<String>) -> Self {
        self.mensaje = Some(mensaje.into());
        self
    }

    pub fn user(mut self, usuario: UserSummary) -> Self {
        self.usuario = Some(usuario);
        self
    }

    pub fn users(mut self, usuarios: Vec<UserSummary>) -> Self {
        self.usuarios = Some(usuarios);
        self
    }
}
