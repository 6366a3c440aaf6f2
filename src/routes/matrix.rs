//! # Permission Matrix API
//!
//! The read side serves the dense role × interface matrix; the write side
//! reconciles client-submitted sparse matrices into the capability store.
//! A small name-resolution adapter offers single-pair operations for
//! integrations that carry names instead of numeric ids; it delegates to
//! the same merge algebra and never re-implements it.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::matrix::merge::{self, EdgeAction, MergeMode};
use crate::matrix::project::{project, RoleLite, RoleRow};
use crate::matrix::reconcile::{self, RoleSubmission};
use crate::matrix::CapabilityFlags;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/permissions/matrix", get(dense_matrix))
        .route("/v1/permissions/matrix/by-role", get(dense_matrix_by_role))
        .route("/v1/permissions/reconcile", put(reconcile_batch))
        .route(
            "/v1/permissions/by-name",
            get(get_pair_by_name)
                .put(upsert_pair_by_name)
                .post(create_pair_by_name)
                .delete(delete_pair_by_name),
        )
}

/// Project the dense matrix from the current store state.
fn project_matrix(
    state: &AppState,
    role_filter: Option<&str>,
    interface_filter: Option<&str>,
) -> Vec<RoleRow> {
    project(
        &state.roles.list_all(),
        &state.interfaces.list_all(),
        &state.capabilities.snapshot(),
        role_filter,
        interface_filter,
    )
}

// ── Dense matrix (read side) ────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct MatrixQuery {
    /// Optional exact-match filter on interface name. Matching nothing yields
    /// roles with empty grant lists, not an error.
    #[serde(default)]
    pub interface: Option<String>,
}

/// GET /v1/permissions/matrix — dense matrix for every active role.
#[utoipa::path(
    get,
    path = "/v1/permissions/matrix",
    params(
        ("interface" = Option<String>, Query, description = "Exact-match interface name filter"),
    ),
    responses(
        (status = 200, description = "Dense role × interface matrix", body = Vec<RoleRow>),
    ),
    tag = "permissions"
)]
async fn dense_matrix(
    State(state): State<AppState>,
    Query(query): Query<MatrixQuery>,
) -> Json<Vec<RoleRow>> {
    Json(project_matrix(&state, None, query.interface.as_deref()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MatrixByRoleQuery {
    /// Role name, exact match after trimming.
    pub role: String,
}

/// GET /v1/permissions/matrix/by-role — dense matrix limited to one role.
///
/// 404 when the name does not resolve to an active role, or when the role
/// has no active interfaces to show; both cases fold into the same "no
/// rows" outcome.
#[utoipa::path(
    get,
    path = "/v1/permissions/matrix/by-role",
    params(
        ("role" = String, Query, description = "Role name, exact match after trimming"),
    ),
    responses(
        (status = 200, description = "Single-role matrix", body = Vec<RoleRow>),
        (status = 404, description = "Role unresolved or no active interfaces"),
    ),
    tag = "permissions"
)]
async fn dense_matrix_by_role(
    State(state): State<AppState>,
    Query(query): Query<MatrixByRoleQuery>,
) -> Result<Json<Vec<RoleRow>>, AppError> {
    if query.role.trim().is_empty() {
        return Err(AppError::BadRequest("a role name must be provided".to_string()));
    }

    let rows = project_matrix(&state, Some(&query.role), None);
    if rows.is_empty() || rows.iter().all(|r| r.interfaces.is_empty()) {
        return Err(AppError::NotFound(format!(
            "role '{}' not found or has no active interfaces",
            query.role.trim()
        )));
    }
    Ok(Json(rows))
}

// ── Batch reconciliation (write side) ───────────────────────────────────────

/// PUT /v1/permissions/reconcile — merge a sparse matrix into the store.
///
/// Each role submission carries its own merge mode (add/update/replace).
/// Unresolved role ids skip their whole submission; unresolved interface
/// ids skip the single entry. Skips are logged server-side only — the
/// response does not report them, a known usability gap kept for
/// compatibility with existing clients.
///
/// The batch commits as one transaction when a database is configured; the
/// in-memory store is only updated after the commit succeeds, so a storage
/// failure leaves both layers exactly as they were.
///
/// Responds with the full dense matrix after the merge.
#[utoipa::path(
    put,
    path = "/v1/permissions/reconcile",
    request_body = Vec<RoleSubmission>,
    responses(
        (status = 200, description = "Matrix after reconciliation", body = Vec<RoleRow>),
        (status = 400, description = "Empty or malformed submission"),
    ),
    tag = "permissions"
)]
async fn reconcile_batch(
    State(state): State<AppState>,
    body: Result<Json<Vec<RoleSubmission>>, JsonRejection>,
) -> Result<Json<Vec<RoleRow>>, AppError> {
    let Json(submissions) =
        body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    if submissions.is_empty() {
        return Err(AppError::BadRequest(
            "the submission list is empty".to_string(),
        ));
    }

    let plan = reconcile::plan(
        &submissions,
        &state.roles.ids(),
        &state.interfaces.ids(),
        &state.capabilities.snapshot(),
    );

    if plan.skipped_roles > 0 || plan.skipped_entries > 0 {
        tracing::warn!(
            skipped_roles = plan.skipped_roles,
            skipped_entries = plan.skipped_entries,
            "reconcile batch referenced unknown ids; entries skipped"
        );
    }

    if let Some(pool) = &state.db_pool {
        crate::db::capabilities::apply_plan(pool, &plan.ops).await?;
    }
    // The plan was computed against a snapshot taken above; another request
    // landing in between can make these ops overwrite its edges. That window
    // is the known no-cross-request-locking gap — batches are expected to be
    // serialized by the caller, not here.
    state.capabilities.apply(&plan.ops);

    tracing::info!(ops = plan.ops.len(), "capability matrix reconciled");
    Ok(Json(project_matrix(&state, None, None)))
}

// ── Name-resolution adapter ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct PairQuery {
    pub role: String,
    pub interface: String,
}

/// Single-pair response: resolved identities plus the effective flags.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PairResponse {
    pub role: RoleLite,
    pub interface_id: i32,
    pub interface_name: String,
    pub read: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
    /// What the operation did: "created", "updated", "deleted", "unchanged",
    /// or "resolved" for reads.
    pub outcome: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PairMutationRequest {
    pub role_name: String,
    pub interface_name: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
}

impl PairMutationRequest {
    fn flags(&self) -> CapabilityFlags {
        CapabilityFlags::new(self.read, self.create, self.update, self.delete)
    }
}

impl Validate for PairMutationRequest {
    fn validate(&self) -> Result<(), String> {
        if self.role_name.trim().is_empty() {
            return Err("role_name is required".to_string());
        }
        if self.interface_name.trim().is_empty() {
            return Err("interface_name is required".to_string());
        }
        Ok(())
    }
}

/// Resolve a (role name, interface name) pair against the active directories.
fn resolve_pair(
    state: &AppState,
    role_name: &str,
    interface_name: &str,
) -> Result<(crate::state::Role, crate::state::Interface), AppError> {
    let role = state
        .roles
        .find_active_by_name(role_name)
        .ok_or_else(|| AppError::NotFound(format!("role '{}' not found", role_name.trim())))?;
    let interface = state.interfaces.find_active_by_name(interface_name).ok_or_else(|| {
        AppError::NotFound(format!("interface '{}' not found", interface_name.trim()))
    })?;
    Ok((role, interface))
}

fn pair_response(
    role: &crate::state::Role,
    interface: &crate::state::Interface,
    flags: CapabilityFlags,
    outcome: &str,
) -> PairResponse {
    PairResponse {
        role: RoleLite {
            role_id: role.role_id,
            name: role.name.clone(),
        },
        interface_id: interface.interface_id,
        interface_name: interface.name.clone(),
        read: flags.read,
        create: flags.create,
        update: flags.update,
        delete: flags.delete,
        outcome: outcome.to_string(),
    }
}

/// GET /v1/permissions/by-name — effective flags for one pair.
///
/// A missing edge reports all-false, indistinguishable from a stored
/// all-false row: the boundary collapses the two states.
#[utoipa::path(
    get,
    path = "/v1/permissions/by-name",
    params(
        ("role" = String, Query, description = "Role name"),
        ("interface" = String, Query, description = "Interface name"),
    ),
    responses(
        (status = 200, description = "Effective flags for the pair", body = PairResponse),
        (status = 404, description = "Role or interface name unresolved"),
    ),
    tag = "permissions"
)]
async fn get_pair_by_name(
    State(state): State<AppState>,
    Query(query): Query<PairQuery>,
) -> Result<Json<PairResponse>, AppError> {
    let (role, interface) = resolve_pair(&state, &query.role, &query.interface)?;
    let flags = state
        .capabilities
        .get((role.role_id, interface.interface_id))
        .unwrap_or(CapabilityFlags::NONE);
    Ok(Json(pair_response(&role, &interface, flags, "resolved")))
}

/// PUT /v1/permissions/by-name — upsert one pair by names.
///
/// Behaves as an implicit Replace-mode single-entry reconciliation: all
/// flags false prunes any existing edge rather than storing an all-false row.
#[utoipa::path(
    put,
    path = "/v1/permissions/by-name",
    request_body = PairMutationRequest,
    responses(
        (status = 200, description = "Pair upserted", body = PairResponse),
        (status = 404, description = "Role or interface name unresolved"),
    ),
    tag = "permissions"
)]
async fn upsert_pair_by_name(
    State(state): State<AppState>,
    body: Result<Json<PairMutationRequest>, JsonRejection>,
) -> Result<Json<PairResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let (role, interface) = resolve_pair(&state, &req.role_name, &req.interface_name)?;
    let key = (role.role_id, interface.interface_id);
    let incoming = req.flags();

    let existing = state.capabilities.get(key);
    let outcome = match merge::plan_entry(MergeMode::Replace, existing, incoming) {
        EdgeAction::Create(flags) => {
            if let Some(pool) = &state.db_pool {
                crate::db::capabilities::upsert(pool, key, flags).await?;
            }
            state.capabilities.upsert(key, flags);
            "created"
        }
        EdgeAction::Overwrite(flags) => {
            if let Some(pool) = &state.db_pool {
                crate::db::capabilities::upsert(pool, key, flags).await?;
            }
            state.capabilities.upsert(key, flags);
            "updated"
        }
        EdgeAction::Delete => {
            if let Some(pool) = &state.db_pool {
                crate::db::capabilities::delete(pool, key).await?;
            }
            state.capabilities.remove(key);
            "deleted"
        }
        EdgeAction::Skip => "unchanged",
    };

    let effective = state.capabilities.get(key).unwrap_or(CapabilityFlags::NONE);
    Ok(Json(pair_response(&role, &interface, effective, outcome)))
}

/// POST /v1/permissions/by-name — create one pair; strictly additive.
///
/// 409 when the edge already exists, 422 when every flag is false (a
/// create that grants nothing is a client error, matching Add-mode
/// semantics).
#[utoipa::path(
    post,
    path = "/v1/permissions/by-name",
    request_body = PairMutationRequest,
    responses(
        (status = 201, description = "Pair created", body = PairResponse),
        (status = 404, description = "Role or interface name unresolved"),
        (status = 409, description = "Pair already exists"),
        (status = 422, description = "All flags false"),
    ),
    tag = "permissions"
)]
async fn create_pair_by_name(
    State(state): State<AppState>,
    body: Result<Json<PairMutationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PairResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let incoming = req.flags();
    if !incoming.any() {
        return Err(AppError::Validation(
            "at least one capability flag must be set".to_string(),
        ));
    }

    let (role, interface) = resolve_pair(&state, &req.role_name, &req.interface_name)?;
    let key = (role.role_id, interface.interface_id);

    match merge::add(state.capabilities.get(key), incoming) {
        EdgeAction::Create(flags) => {
            if let Some(pool) = &state.db_pool {
                crate::db::capabilities::upsert(pool, key, flags).await?;
            }
            state.capabilities.upsert(key, flags);
            Ok((
                StatusCode::CREATED,
                Json(pair_response(&role, &interface, flags, "created")),
            ))
        }
        _ => Err(AppError::Conflict(format!(
            "a capability grant for role '{}' and interface '{}' already exists",
            role.name, interface.name
        ))),
    }
}

/// DELETE /v1/permissions/by-name — remove one pair by names.
#[utoipa::path(
    delete,
    path = "/v1/permissions/by-name",
    params(
        ("role" = String, Query, description = "Role name"),
        ("interface" = String, Query, description = "Interface name"),
    ),
    responses(
        (status = 200, description = "Pair deleted", body = PairResponse),
        (status = 404, description = "Name unresolved or no grant stored"),
    ),
    tag = "permissions"
)]
async fn delete_pair_by_name(
    State(state): State<AppState>,
    Query(query): Query<PairQuery>,
) -> Result<Json<PairResponse>, AppError> {
    let (role, interface) = resolve_pair(&state, &query.role, &query.interface)?;
    let key = (role.role_id, interface.interface_id);

    if state.capabilities.get(key).is_none() {
        return Err(AppError::NotFound(format!(
            "no capability grant stored for role '{}' and interface '{}'",
            role.name, interface.name
        )));
    }

    if let Some(pool) = &state.db_pool {
        crate::db::capabilities::delete(pool, key).await?;
    }
    state.capabilities.remove(key);

    Ok(Json(pair_response(
        &role,
        &interface,
        CapabilityFlags::NONE,
        "deleted",
    )))
}
