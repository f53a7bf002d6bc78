use std::sync::Arc;

use axum::http::StatusCode;
use tracing::{info, instrument, warn};

use crate::users::{
    dto::{CreateUserRequest, LoginRequest, UpdateUserRequest},
    error::{UserError, UserResult},
    password::PasswordHasher,
    repo::{StoreError, UserStore},
    repo_types::{NewUser, UserSummary},
    validation::{Rule, ValidationErrors, Validator},
};

const MSG_CREATE_FAILED: &str = "No se ha podido crear el usuario";
const MSG_UPDATE_FAILED: &str = "No se ha podido actualizar el usuario";
const MSG_DELETE_FAILED: &str = "No se ha podido eliminar el usuario";
const MSG_READ_FAILED: &str = "No se ha podido consultar los usuarios";
const MSG_LOGIN_FAILED: &str = "No se ha podido iniciar sesión";

fn create_rules() -> Validator {
    Validator::new()
        .field("nombre_completo", [Rule::Required, Rule::Min(6)])
        .field("email", [Rule::Required, Rule::Email])
        .field("contrasenia", [Rule::Required, Rule::Min(10)])
}

fn update_rules() -> Validator {
    Validator::new()
        .field("nombre_completo", [Rule::Required, Rule::Min(6)])
        .field("email", [Rule::Required, Rule::Email])
}

fn login_rules() -> Validator {
    Validator::new()
        .field("email", [Rule::Required, Rule::Email])
        .field("contrasenia", [Rule::Required, Rule::Min(10)])
}

/// Result of a successful enable/disable.
#[derive(Debug, Clone)]
pub struct Toggled {
    pub user: UserSummary,
    pub message: String,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> UserResult<Vec<UserSummary>> {
        self.store
            .list()
            .await
            .map_err(|e| UserError::failed(MSG_READ_FAILED, e))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> UserResult<UserSummary> {
        self.store
            .find_by_id(id)
            .await
            .map_err(|e| UserError::failed(MSG_READ_FAILED, e))?
            .map(UserSummary::from)
            .ok_or(UserError::NotFound)
    }

    #[instrument(skip(self, input), fields(email = ?input.email))]
    pub async fn create(&self, input: CreateUserRequest) -> UserResult<UserSummary> {
        let input = input.normalized();
        let mut errors = create_rules().validate(|field| match field {
            "nombre_completo" => input.nombre_completo.as_deref(),
            "email" => input.email.as_deref(),
            "contrasenia" => input.contrasenia.as_deref(),
            _ => None,
        });
        self.check_email_unique(&mut errors, input.email.as_deref(), None, MSG_CREATE_FAILED)
            .await?;
        reject_invalid(errors)?;

        let (Some(full_name), Some(email), Some(password)) =
            (input.nombre_completo, input.email, input.contrasenia)
        else {
            return Err(UserError::Malformed("validated fields missing".into()));
        };

        let password_hash = self
            .hasher
            .hash(&password)
            .map_err(|e| UserError::failed(MSG_CREATE_FAILED, e))?;

        let user = self
            .store
            .insert(NewUser {
                full_name,
                email,
                password_hash,
            })
            .await
            .map_err(|e| write_error(MSG_CREATE_FAILED, e))?;

        info!(user_id = user.id, email = %user.email, "user created");
        Ok(user.into())
    }

    #[instrument(skip(self, input), fields(email = ?input.email))]
    pub async fn update(&self, id: i64, input: UpdateUserRequest) -> UserResult<UserSummary> {
        let input = input.normalized();
        let mut errors = update_rules().validate(|field| match field {
            "nombre_completo" => input.nombre_completo.as_deref(),
            "email" => input.email.as_deref(),
            _ => None,
        });
        self.check_email_unique(&mut errors, input.email.as_deref(), Some(id), MSG_UPDATE_FAILED)
            .await?;
        reject_invalid(errors)?;

        let (Some(full_name), Some(email)) = (input.nombre_completo, input.email) else {
            return Err(UserError::Malformed("validated fields missing".into()));
        };

        let user = self
            .store
            .update_profile(id, &full_name, &email)
            .await
            .map_err(|e| write_error(MSG_UPDATE_FAILED, e))?
            .ok_or(UserError::NotFound)?;

        info!(user_id = user.id, "user updated");
        Ok(user.into())
    }

    #[instrument(skip(self))]
    pub async fn toggle_active(&self, id: i64) -> UserResult<Toggled> {
        let user = self
            .store
            .toggle_active(id)
            .await
            .map_err(|e| UserError::failed(MSG_UPDATE_FAILED, e))?
            .ok_or(UserError::NotFound)?;

        let state = if user.active { "Habilitado" } else { "Deshabilitado" };
        info!(user_id = user.id, active = user.active, "user toggled");
        Ok(Toggled {
            message: format!("Se ha {state} el usuario Exitosamente"),
            user: user.into(),
        })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> UserResult<()> {
        let delete_failed = |e: StoreError| UserError::Failed {
            status: StatusCode::BAD_REQUEST,
            message: MSG_DELETE_FAILED,
            source: e.into(),
        };

        if self.store.find_by_id(id).await.map_err(delete_failed)?.is_none() {
            return Err(UserError::NotFound);
        }
        if !self.store.delete_by_id(id).await.map_err(delete_failed)? {
            // Gone between the lookup and the delete.
            return Err(UserError::NotFound);
        }

        info!(user_id = id, "user deleted");
        Ok(())
    }

    /// Stateless credential check; no session is issued.
    #[instrument(skip(self, input), fields(email = ?input.email))]
    pub async fn login(&self, input: LoginRequest) -> UserResult<()> {
        let input = input.normalized();
        let errors = login_rules().validate(|field| match field {
            "email" => input.email.as_deref(),
            "contrasenia" => input.contrasenia.as_deref(),
            _ => None,
        });
        reject_invalid(errors)?;

        let (Some(email), Some(password)) = (input.email, input.contrasenia) else {
            return Err(UserError::Malformed("validated fields missing".into()));
        };

        let creds = match self.store.find_credentials(&email).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                warn!(email = %email, "login unknown email");
                return Err(UserError::UnknownEmail);
            }
            Err(e) => return Err(UserError::failed(MSG_LOGIN_FAILED, e)),
        };

        let matches = self
            .hasher
            .verify(&password, &creds.password_hash)
            .map_err(|e| UserError::failed(MSG_LOGIN_FAILED, e))?;
        if !matches {
            warn!(email = %creds.email, "login invalid password");
            return Err(UserError::IncorrectPassword);
        }

        info!(email = %creds.email, "user logged in");
        Ok(())
    }

    /// The unique rule runs only once the email is otherwise valid.
    async fn check_email_unique(
        &self,
        errors: &mut ValidationErrors,
        email: Option<&str>,
        exclude_id: Option<i64>,
        failure: &'static str,
    ) -> UserResult<()> {
        let Some(email) = email else {
            return Ok(());
        };
        if errors.has("email") {
            return Ok(());
        }
        let taken = self
            .store
            .exists_by_email(email, exclude_id)
            .await
            .map_err(|e| UserError::failed(failure, e))?;
        if taken {
            errors.add_taken("email");
        }
        Ok(())
    }
}

fn reject_invalid(errors: ValidationErrors) -> UserResult<()> {
    errors.into_result().map_err(|errors| {
        warn!(?errors, "validation failed");
        UserError::Validation(errors)
    })
}

fn write_error(message: &'static str, e: StoreError) -> UserError {
    match e {
        StoreError::DuplicateEmail => {
            warn!("unique constraint rejected email");
            UserError::EmailTaken
        }
        other => UserError::failed(message, other),
    }
}
