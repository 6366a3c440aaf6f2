//! # Chemical Element Catalog API
//!
//! CRUD over the elements referenced by soil analyses. The symbol is the
//! business key: unique among active entries, case-sensitive ("N" and "Na"
//! are distinct, and so would be "n" if an operator insisted).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, ChemicalElement};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/elements", post(create_element).get(list_elements))
        .route(
            "/v1/elements/:id",
            get(get_element).put(update_element).delete(deactivate_element),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ElementRequest {
    pub symbol: String,
    pub name: String,
    /// Equivalent weight in g/eq, used downstream to convert meq/100g
    /// readings. Must be strictly positive.
    pub equivalent_weight: f64,
}

impl Validate for ElementRequest {
    fn validate(&self) -> Result<(), String> {
        let symbol = self.symbol.trim();
        if symbol.is_empty() || symbol.len() > 10 {
            return Err("symbol is required and must not exceed 10 characters".to_string());
        }
        let name = self.name.trim();
        if name.is_empty() || name.len() > 80 {
            return Err("name is required and must not exceed 80 characters".to_string());
        }
        if !self.equivalent_weight.is_finite() || self.equivalent_weight <= 0.0 {
            return Err("equivalent_weight must be a positive number".to_string());
        }
        Ok(())
    }
}

/// POST /v1/elements — 409 when an active element already has the symbol.
#[utoipa::path(
    post,
    path = "/v1/elements",
    request_body = ElementRequest,
    responses(
        (status = 201, description = "Element created", body = ChemicalElement),
        (status = 409, description = "An active element with that symbol exists"),
    ),
    tag = "elements"
)]
async fn create_element(
    State(state): State<AppState>,
    body: Result<Json<ElementRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChemicalElement>), AppError> {
    let req = extract_validated_json(body)?;
    let element = state.elements.create(&req.symbol, &req.name, req.equivalent_weight)?;
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::elements::insert(pool, &element).await {
            tracing::error!(element_id = element.element_id, error = %e, "failed to persist element");
            return Err(AppError::Internal(
                "element recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    Ok((StatusCode::CREATED, Json(element)))
}

/// GET /v1/elements — active elements sorted by symbol.
#[utoipa::path(
    get,
    path = "/v1/elements",
    responses((status = 200, description = "Active elements", body = Vec<ChemicalElement>)),
    tag = "elements"
)]
async fn list_elements(State(state): State<AppState>) -> Json<Vec<ChemicalElement>> {
    Json(state.elements.list_active())
}

/// GET /v1/elements/:id
#[utoipa::path(
    get,
    path = "/v1/elements/{id}",
    params(("id" = i32, Path, description = "Element id")),
    responses(
        (status = 200, description = "Element", body = ChemicalElement),
        (status = 404, description = "No active element with this id"),
    ),
    tag = "elements"
)]
async fn get_element(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ChemicalElement>, AppError> {
    state
        .elements
        .find_active_by_id(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no active element with id {id}")))
}

/// PUT /v1/elements/:id
#[utoipa::path(
    put,
    path = "/v1/elements/{id}",
    params(("id" = i32, Path, description = "Element id")),
    request_body = ElementRequest,
    responses(
        (status = 200, description = "Element updated", body = ChemicalElement),
        (status = 404, description = "No active element with this id"),
        (status = 409, description = "Symbol taken by another active element"),
    ),
    tag = "elements"
)]
async fn update_element(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<ElementRequest>, JsonRejection>,
) -> Result<Json<ChemicalElement>, AppError> {
    let req = extract_validated_json(body)?;
    let element = state
        .elements
        .update(id, &req.symbol, &req.name, req.equivalent_weight)?;
    if let Some(pool) = &state.db_pool {
        crate::db::elements::update(pool, &element).await?;
    }
    Ok(Json(element))
}

/// DELETE /v1/elements/:id — soft-deactivate; historical analyses keep
/// referencing the row.
#[utoipa::path(
    delete,
    path = "/v1/elements/{id}",
    params(("id" = i32, Path, description = "Element id")),
    responses(
        (status = 200, description = "Element deactivated", body = ChemicalElement),
        (status = 404, description = "No active element with this id"),
    ),
    tag = "elements"
)]
async fn deactivate_element(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ChemicalElement>, AppError> {
    let element = state.elements.deactivate(id)?;
    if let Some(pool) = &state.db_pool {
        crate::db::elements::update(pool, &element).await?;
    }
    Ok(Json(element))
}
