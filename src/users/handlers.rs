use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    state::AppState,
    users::{
        dto::{CreateUserRequest, Envelope, LoginRequest, UpdateUserRequest},
        error::{UserError, UserResult},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/usuarios", get(list_users).post(create_user))
        .route(
            "/usuarios/:id",
            get(get_user)
                .put(update_user)
                .patch(toggle_user)
                .delete(delete_user),
        )
}

pub fn login_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Ids that don't parse as a number can't match a row.
fn user_id(path: Result<Path<i64>, PathRejection>) -> UserResult<i64> {
    path.map(|Path(id)| id).map_err(|e| {
        warn!(error = %e, "unparseable user id");
        UserError::NotFound
    })
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> UserResult<T> {
    payload.map(|Json(v)| v).map_err(|e| {
        warn!(error = %e, "rejected request body");
        UserError::Malformed(e.body_text())
    })
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> UserResult<Json<Envelope>> {
    let users = state.users.list().await?;
    Ok(Json(Envelope::ok().users(users)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> UserResult<Json<Envelope>> {
    let user = state.users.get(user_id(path)?).await?;
    Ok(Json(Envelope::ok().user(user)))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> UserResult<(StatusCode, Json<Envelope>)> {
    let user = state.users.create(body(payload)?).await?;
    Ok((
        StatusCode::CREATED,
        Json(
            Envelope::ok()
                .message("Usuario Creado Exitosamente")
                .user(user),
        ),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> UserResult<Json<Envelope>> {
    let id = user_id(path)?;
    let user = state.users.update(id, body(payload)?).await?;
    Ok(Json(
        Envelope::ok()
            .message("Se ha actualizado el usuario correctamente")
            .user(user),
    ))
}

#[instrument(skip(state))]
pub async fn toggle_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> UserResult<Json<Envelope>> {
    let toggled = state.users.toggle_active(user_id(path)?).await?;
    Ok(Json(Envelope::ok().message(toggled.message).user(toggled.user)))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> UserResult<Json<Envelope>> {
    state.users.delete(user_id(path)?).await?;
    Ok(Json(
        Envelope::ok().message("Se ha eliminado el usuario exitosamente"),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> UserResult<Json<Envelope>> {
    state.users.login(body(payload)?).await?;
    Ok(Json(
        Envelope::ok().message("Se ha iniciado sesión correctamente"),
    ))
}
