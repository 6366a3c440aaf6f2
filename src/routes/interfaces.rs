//! # Interface Directory API
//!
//! CRUD over the capability domains (functional modules) that the matrix
//! gates. Mirrors the role directory's lifecycle: soft deactivation,
//! optional reactivation, name uniqueness among active records only.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, Interface};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/interfaces", post(create_interface).get(list_interfaces))
        .route(
            "/v1/interfaces/:id",
            get(get_interface).put(update_interface).delete(deactivate_interface),
        )
        .route("/v1/interfaces/:id/activate", post(reactivate_interface))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct InterfaceRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Validate for InterfaceRequest {
    fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("name is required".to_string());
        }
        if name.len() > 100 {
            return Err("name must not exceed 100 characters".to_string());
        }
        Ok(())
    }
}

async fn persist(state: &AppState, interface: &Interface, insert: bool) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        let result = if insert {
            crate::db::interfaces::insert(pool, interface).await.map(|_| true)
        } else {
            crate::db::interfaces::update(pool, interface).await
        };
        if let Err(e) = result {
            tracing::error!(interface_id = interface.interface_id, error = %e, "failed to persist interface");
            return Err(AppError::Internal(
                "interface recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    Ok(())
}

/// POST /v1/interfaces — register a functional module.
#[utoipa::path(
    post,
    path = "/v1/interfaces",
    request_body = InterfaceRequest,
    responses(
        (status = 201, description = "Interface created", body = Interface),
        (status = 409, description = "An active interface with that name exists"),
    ),
    tag = "interfaces"
)]
async fn create_interface(
    State(state): State<AppState>,
    body: Result<Json<InterfaceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Interface>), AppError> {
    let req = extract_validated_json(body)?;
    let interface = state.interfaces.create(&req.name, &req.description)?;
    persist(&state, &interface, true).await?;
    Ok((StatusCode::CREATED, Json(interface)))
}

/// GET /v1/interfaces — active interfaces sorted by name.
#[utoipa::path(
    get,
    path = "/v1/interfaces",
    responses(
        (status = 200, description = "Active interfaces", body = Vec<Interface>),
    ),
    tag = "interfaces"
)]
async fn list_interfaces(State(state): State<AppState>) -> Json<Vec<Interface>> {
    Json(state.interfaces.list_active())
}

/// GET /v1/interfaces/:id — one active interface.
#[utoipa::path(
    get,
    path = "/v1/interfaces/{id}",
    params(("id" = i32, Path, description = "Interface id")),
    responses(
        (status = 200, description = "Interface", body = Interface),
        (status = 404, description = "No active interface with this id"),
    ),
    tag = "interfaces"
)]
async fn get_interface(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Interface>, AppError> {
    state
        .interfaces
        .find_active_by_id(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no active interface with id {id}")))
}

/// PUT /v1/interfaces/:id — rename/redescribe an active interface.
#[utoipa::path(
    put,
    path = "/v1/interfaces/{id}",
    params(("id" = i32, Path, description = "Interface id")),
    request_body = InterfaceRequest,
    responses(
        (status = 200, description = "Interface updated", body = Interface),
        (status = 404, description = "No active interface with this id"),
        (status = 409, description = "Name taken by another active interface"),
    ),
    tag = "interfaces"
)]
async fn update_interface(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<InterfaceRequest>, JsonRejection>,
) -> Result<Json<Interface>, AppError> {
    let req = extract_validated_json(body)?;
    let interface = state.interfaces.update(id, &req.name, &req.description)?;
    persist(&state, &interface, false).await?;
    Ok(Json(interface))
}

/// DELETE /v1/interfaces/:id — soft-deactivate. Edges referencing the
/// interface stay in the store and drop out of the dense matrix.
#[utoipa::path(
    delete,
    path = "/v1/interfaces/{id}",
    params(("id" = i32, Path, description = "Interface id")),
    responses(
        (status = 200, description = "Interface deactivated", body = Interface),
        (status = 404, description = "No active interface with this id"),
    ),
    tag = "interfaces"
)]
async fn deactivate_interface(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Interface>, AppError> {
    let interface = state.interfaces.deactivate(id)?;
    persist(&state, &interface, false).await?;
    Ok(Json(interface))
}

/// POST /v1/interfaces/:id/activate — re-flip the active flag.
#[utoipa::path(
    post,
    path = "/v1/interfaces/{id}/activate",
    params(("id" = i32, Path, description = "Interface id")),
    responses(
        (status = 200, description = "Interface reactivated", body = Interface),
        (status = 404, description = "No interface with this id"),
        (status = 409, description = "Name taken by another active interface meanwhile"),
    ),
    tag = "interfaces"
)]
async fn reactivate_interface(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Interface>, AppError> {
    let interface = state.interfaces.reactivate(id)?;
    persist(&state, &interface, false).await?;
    Ok(Json(interface))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_name_is_required_and_bounded() {
        let blank = InterfaceRequest {
            name: " ".to_string(),
            description: String::new(),
        };
        assert!(blank.validate().is_err());

        let long = InterfaceRequest {
            name: "x".repeat(101),
            description: String::new(),
        };
        assert!(long.validate().is_err());

        let ok = InterfaceRequest {
            name: "Terrenos".to_string(),
            description: "land parcel screens".to_string(),
        };
        assert!(ok.validate().is_ok());
    }
}
