//! # Role Directory API
//!
//! Straight-line CRUD over the role directory. Roles are soft-deactivated,
//! never hard-deleted, and may be reactivated later; the capability engine
//! consumes this directory read-only.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, Role};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/roles", post(create_role).get(list_roles))
        .route("/v1/roles/:id", get(get_role).put(update_role).delete(deactivate_role))
        .route("/v1/roles/:id/activate", post(reactivate_role))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Validate for CreateRoleRequest {
    fn validate(&self) -> Result<(), String> {
        validate_role_fields(&self.name, &self.description)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Validate for UpdateRoleRequest {
    fn validate(&self) -> Result<(), String> {
        validate_role_fields(&self.name, &self.description)
    }
}

fn validate_role_fields(name: &str, description: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name is required".to_string());
    }
    if name.len() > 50 {
        return Err("name must not exceed 50 characters".to_string());
    }
    if description.len() > 500 {
        return Err("description must not exceed 500 characters".to_string());
    }
    Ok(())
}

/// Persist a directory mutation when a database is configured. The record
/// is already committed to the in-memory directory; a storage failure is
/// surfaced so the operator knows the row would be lost on restart.
async fn persist(state: &AppState, role: &Role, insert: bool) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        let result = if insert {
            crate::db::roles::insert(pool, role).await.map(|_| true)
        } else {
            crate::db::roles::update(pool, role).await
        };
        if let Err(e) = result {
            tracing::error!(role_id = role.role_id, error = %e, "failed to persist role");
            return Err(AppError::Internal(
                "role recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    Ok(())
}

/// POST /v1/roles — create a role. 409 when an active role has the name.
#[utoipa::path(
    post,
    path = "/v1/roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "An active role with that name exists"),
    ),
    tag = "roles"
)]
async fn create_role(
    State(state): State<AppState>,
    body: Result<Json<CreateRoleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    let req = extract_validated_json(body)?;
    let role = state.roles.create(&req.name, &req.description)?;
    persist(&state, &role, true).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// GET /v1/roles — active roles sorted by name.
#[utoipa::path(
    get,
    path = "/v1/roles",
    responses(
        (status = 200, description = "Active roles", body = Vec<Role>),
    ),
    tag = "roles"
)]
async fn list_roles(State(state): State<AppState>) -> Json<Vec<Role>> {
    Json(state.roles.list_active())
}

/// GET /v1/roles/:id — one active role.
#[utoipa::path(
    get,
    path = "/v1/roles/{id}",
    params(("id" = i32, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role", body = Role),
        (status = 404, description = "No active role with this id"),
    ),
    tag = "roles"
)]
async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Role>, AppError> {
    state
        .roles
        .find_active_by_id(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no active role with id {id}")))
}

/// PUT /v1/roles/:id — rename/redescribe an active role.
#[utoipa::path(
    put,
    path = "/v1/roles/{id}",
    params(("id" = i32, Path, description = "Role id")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 404, description = "No active role with this id"),
        (status = 409, description = "Name taken by another active role"),
    ),
    tag = "roles"
)]
async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<Json<Role>, AppError> {
    let req = extract_validated_json(body)?;
    let role = state.roles.update(id, &req.name, &req.description)?;
    persist(&state, &role, false).await?;
    Ok(Json(role))
}

/// DELETE /v1/roles/:id — soft-deactivate. Capability edges survive and are
/// hidden from the dense matrix at read time.
#[utoipa::path(
    delete,
    path = "/v1/roles/{id}",
    params(("id" = i32, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role deactivated", body = Role),
        (status = 404, description = "No active role with this id"),
    ),
    tag = "roles"
)]
async fn deactivate_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Role>, AppError> {
    let role = state.roles.deactivate(id)?;
    persist(&state, &role, false).await?;
    Ok(Json(role))
}

/// POST /v1/roles/:id/activate — re-flip the active flag.
#[utoipa::path(
    post,
    path = "/v1/roles/{id}/activate",
    params(("id" = i32, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role reactivated", body = Role),
        (status = 404, description = "No role with this id"),
        (status = 409, description = "Name taken by another active role meanwhile"),
    ),
    tag = "roles"
)]
async fn reactivate_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Role>, AppError> {
    let role = state.roles.reactivate(id)?;
    persist(&state, &role, false).await?;
    Ok(Json(role))
}
