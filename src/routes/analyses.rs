//! # Soil Analysis API
//!
//! Entry surface for laboratory soil analyses: a header (date, laboratory,
//! the lab's own identifier) plus element readings attached one at a time as
//! the sheet is transcribed. Readings reference the chemical element catalog;
//! the reference is checked when the reading is recorded, and only then —
//! deactivating an element later does not touch existing readings.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AnalysisMeasurement, AppState, SoilAnalysis};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/analyses", post(create_analysis).get(list_analyses))
        .route("/v1/analyses/:id", get(get_analysis).delete(deactivate_analysis))
        .route("/v1/analyses/:id/measurements", post(add_measurement))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AnalysisRequest {
    /// ISO date the sample was analyzed, e.g. "2024-06-01".
    pub sampled_on: NaiveDate,
    pub laboratory: String,
    /// The laboratory's own reference. Stored uppercased; unique across all
    /// analyses, including deactivated ones.
    pub identifier: String,
}

impl Validate for AnalysisRequest {
    fn validate(&self) -> Result<(), String> {
        let laboratory = self.laboratory.trim();
        if laboratory.is_empty() || laboratory.len() > 80 {
            return Err("laboratory is required and must not exceed 80 characters".to_string());
        }
        let identifier = self.identifier.trim();
        if identifier.is_empty() || identifier.len() > 50 {
            return Err("identifier is required and must not exceed 50 characters".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct MeasurementRequest {
    pub element_id: i32,
    /// Reading as printed on the sheet. Must be strictly positive.
    pub quantity: f64,
    /// Reporting unit, e.g. "meq/100g" or "ppm".
    pub unit: String,
}

impl Validate for MeasurementRequest {
    fn validate(&self) -> Result<(), String> {
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err("quantity must be a positive number".to_string());
        }
        let unit = self.unit.trim();
        if unit.is_empty() || unit.len() > 20 {
            return Err("unit is required and must not exceed 20 characters".to_string());
        }
        Ok(())
    }
}

/// One reading with its element resolved for display.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeasurementView {
    pub measurement_id: i32,
    pub element_id: i32,
    pub element_symbol: String,
    pub element_name: String,
    pub quantity: f64,
    pub unit: String,
}

/// Analysis header plus all of its active readings.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalysisDetail {
    #[serde(flatten)]
    pub analysis: SoilAnalysis,
    pub measurements: Vec<MeasurementView>,
}

fn measurement_view(state: &AppState, m: AnalysisMeasurement) -> MeasurementView {
    // The element existed when the reading was recorded; resolve it
    // permissively so deactivated elements still display.
    let element = state.elements.find_by_id(m.element_id);
    MeasurementView {
        measurement_id: m.measurement_id,
        element_id: m.element_id,
        element_symbol: element.as_ref().map(|e| e.symbol.clone()).unwrap_or_default(),
        element_name: element.map(|e| e.name).unwrap_or_default(),
        quantity: m.quantity,
        unit: m.unit,
    }
}

/// POST /v1/analyses — 409 when the identifier is already taken.
#[utoipa::path(
    post,
    path = "/v1/analyses",
    request_body = AnalysisRequest,
    responses(
        (status = 201, description = "Analysis recorded", body = SoilAnalysis),
        (status = 409, description = "An analysis with that identifier exists"),
        (status = 422, description = "Field validation failed"),
    ),
    tag = "analyses"
)]
async fn create_analysis(
    State(state): State<AppState>,
    body: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SoilAnalysis>), AppError> {
    let req = extract_validated_json(body)?;
    let analysis = state
        .analyses
        .create(req.sampled_on, &req.laboratory, &req.identifier)?;
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::analyses::insert(pool, &analysis).await {
            tracing::error!(analysis_id = analysis.analysis_id, error = %e, "failed to persist analysis");
            return Err(AppError::Internal(
                "analysis recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    Ok((StatusCode::CREATED, Json(analysis)))
}

/// GET /v1/analyses — active headers sorted by identifier, without readings.
#[utoipa::path(
    get,
    path = "/v1/analyses",
    responses((status = 200, description = "Active analyses", body = Vec<SoilAnalysis>)),
    tag = "analyses"
)]
async fn list_analyses(State(state): State<AppState>) -> Json<Vec<SoilAnalysis>> {
    Json(state.analyses.list_active())
}

/// GET /v1/analyses/:id — header plus readings with resolved elements.
#[utoipa::path(
    get,
    path = "/v1/analyses/{id}",
    params(("id" = i32, Path, description = "Analysis id")),
    responses(
        (status = 200, description = "Analysis with readings", body = AnalysisDetail),
        (status = 404, description = "No active analysis with this id"),
    ),
    tag = "analyses"
)]
async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AnalysisDetail>, AppError> {
    let analysis = state
        .analyses
        .find_active_by_id(id)
        .ok_or_else(|| AppError::NotFound(format!("no active analysis with id {id}")))?;
    let measurements = state
        .analyses
        .measurements_for(id)
        .into_iter()
        .map(|m| measurement_view(&state, m))
        .collect();
    Ok(Json(AnalysisDetail {
        analysis,
        measurements,
    }))
}

/// POST /v1/analyses/:id/measurements — attach one element reading.
///
/// 404 covers both an unknown/inactive analysis and an unknown/inactive
/// element; the message distinguishes them.
#[utoipa::path(
    post,
    path = "/v1/analyses/{id}/measurements",
    params(("id" = i32, Path, description = "Analysis id")),
    request_body = MeasurementRequest,
    responses(
        (status = 201, description = "Reading attached", body = MeasurementView),
        (status = 404, description = "No active analysis or element with this id"),
        (status = 422, description = "Field validation failed"),
    ),
    tag = "analyses"
)]
async fn add_measurement(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<MeasurementRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MeasurementView>), AppError> {
    let req = extract_validated_json(body)?;
    if state.elements.find_active_by_id(req.element_id).is_none() {
        return Err(AppError::NotFound(format!(
            "no active element with id {}",
            req.element_id
        )));
    }
    let measurement = state
        .analyses
        .add_measurement(id, req.element_id, req.quantity, &req.unit)
        .map_err(|_| AppError::NotFound(format!("no active analysis with id {id}")))?;
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::analyses::insert_measurement(pool, &measurement).await {
            tracing::error!(
                analysis_id = id,
                measurement_id = measurement.measurement_id,
                error = %e,
                "failed to persist measurement"
            );
            return Err(AppError::Internal(
                "reading recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    Ok((StatusCode::CREATED, Json(measurement_view(&state, measurement))))
}

/// DELETE /v1/analyses/:id — soft-deactivate; readings stay attached.
#[utoipa::path(
    delete,
    path = "/v1/analyses/{id}",
    params(("id" = i32, Path, description = "Analysis id")),
    responses(
        (status = 200, description = "Analysis deactivated", body = SoilAnalysis),
        (status = 404, description = "No active analysis with this id"),
    ),
    tag = "analyses"
)]
async fn deactivate_analysis(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SoilAnalysis>, AppError> {
    let analysis = state.analyses.deactivate(id)?;
    if let Some(pool) = &state.db_pool {
        crate::db::analyses::update(pool, &analysis).await?;
    }
    Ok(Json(analysis))
}
