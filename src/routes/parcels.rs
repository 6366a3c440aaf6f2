//! # Land Parcel Registry API
//!
//! CRUD over registered land parcels. A parcel is located by municipality;
//! reads resolve the full country/department/municipality chain so list
//! screens never have to stitch geography themselves. The chain is resolved
//! permissively — a parcel in a since-deactivated municipality still shows
//! its historical location.

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
use crate::state::{AppState, LandParcel, ParcelDraft};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/parcels", post(create_parcel).get(list_parcels))
        .route(
            "/v1/parcels/:id",
            get(get_parcel).put(update_parcel).delete(deactivate_parcel),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ParcelRequest {
    pub code: String,
    pub owner_identification: String,
    pub owner_name: String,
    pub owner_phone: String,
    #[serde(default)]
    pub owner_email: Option<String>,
    pub address: String,
    /// Surface area in manzanas. Must be strictly positive.
    pub area_manzanas: f64,
    /// ISO date, e.g. "2024-03-15".
    pub registered_on: NaiveDate,
    pub municipality_id: i32,
    #[serde(default)]
    pub yield_quintals: f64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

impl Validate for ParcelRequest {
    fn validate(&self) -> Result<(), String> {
        let code = self.code.trim();
        if code.is_empty() || code.len() > 50 {
            return Err("code is required and must not exceed 50 characters".to_string());
        }
        let identification = self.owner_identification.trim();
        if identification.is_empty() || identification.len() > 50 {
            return Err(
                "owner_identification is required and must not exceed 50 characters".to_string(),
            );
        }
        let owner = self.owner_name.trim();
        if owner.is_empty() || owner.len() > 150 {
            return Err("owner_name is required and must not exceed 150 characters".to_string());
        }
        if self.owner_phone.trim().len() > 20 {
            return Err("owner_phone must not exceed 20 characters".to_string());
        }
        if let Some(email) = &self.owner_email {
            if email.trim().len() > 150 {
                return Err("owner_email must not exceed 150 characters".to_string());
            }
        }
        let address = self.address.trim();
        if address.is_empty() || address.len() > 300 {
            return Err("address is required and must not exceed 300 characters".to_string());
        }
        if !self.area_manzanas.is_finite() || self.area_manzanas <= 0.0 {
            return Err("area_manzanas must be a positive number".to_string());
        }
        if !self.yield_quintals.is_finite() || self.yield_quintals < 0.0 {
            return Err("yield_quintals must be zero or positive".to_string());
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err("latitude must be between -90 and 90".to_string());
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err("longitude must be between -180 and 180".to_string());
        }
        Ok(())
    }
}

impl ParcelRequest {
    fn into_draft(self) -> ParcelDraft {
        ParcelDraft {
            code: self.code,
            owner_identification: self.owner_identification,
            owner_name: self.owner_name,
            owner_phone: self.owner_phone,
            owner_email: self.owner_email,
            address: self.address,
            area_manzanas: self.area_manzanas,
            registered_on: self.registered_on,
            municipality_id: self.municipality_id,
            yield_quintals: self.yield_quintals,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Resolved geography chain of a parcel's municipality.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParcelLocation {
    pub municipality_id: i32,
    pub municipality_name: String,
    pub department_id: i32,
    pub department_name: String,
    pub country_id: i32,
    pub country_name: String,
}

/// A parcel plus its resolved location. `location` is null only when the
/// geography chain is broken (a hydration anomaly, not a normal state).
#[derive(Debug, Serialize, ToSchema)]
pub struct ParcelView {
    #[serde(flatten)]
    pub parcel: LandParcel,
    pub location: Option<ParcelLocation>,
}

fn resolve_location(state: &AppState, municipality_id: i32) -> Option<ParcelLocation> {
    let municipality = state.municipalities.find_by_id(municipality_id)?;
    let department = state.departments.find_by_id(municipality.department_id)?;
    let country = state.countries.find_by_id(department.country_id)?;
    Some(ParcelLocation {
        municipality_id: municipality.municipality_id,
        municipality_name: municipality.name,
        department_id: department.department_id,
        department_name: department.name,
        country_id: country.country_id,
        country_name: country.name,
    })
}

fn view(state: &AppState, parcel: LandParcel) -> ParcelView {
    let location = resolve_location(state, parcel.municipality_id);
    ParcelView { parcel, location }
}

/// POST /v1/parcels — 404 when the municipality is unknown or inactive.
#[utoipa::path(
    post,
    path = "/v1/parcels",
    request_body = ParcelRequest,
    responses(
        (status = 201, description = "Parcel registered", body = ParcelView),
        (status = 404, description = "No active municipality with this id"),
        (status = 422, description = "Field validation failed"),
    ),
    tag = "parcels"
)]
async fn create_parcel(
    State(state): State<AppState>,
    body: Result<Json<ParcelRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ParcelView>), AppError> {
    let req = extract_validated_json(body)?;
    if state.municipalities.find_active_by_id(req.municipality_id).is_none() {
        return Err(AppError::NotFound(format!(
            "no active municipality with id {}",
            req.municipality_id
        )));
    }
    let parcel = state.parcels.create(req.into_draft());
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::parcels::insert(pool, &parcel).await {
            tracing::error!(parcel_id = parcel.parcel_id, error = %e, "failed to persist parcel");
            return Err(AppError::Internal(
                "parcel recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    Ok((StatusCode::CREATED, Json(view(&state, parcel))))
}

/// GET /v1/parcels — active parcels with resolved locations, sorted by code.
#[utoipa::path(
    get,
    path = "/v1/parcels",
    responses((status = 200, description = "Active parcels", body = Vec<ParcelView>)),
    tag = "parcels"
)]
async fn list_parcels(State(state): State<AppState>) -> Json<Vec<ParcelView>> {
    let parcels = state
        .parcels
        .list_active()
        .into_iter()
        .map(|p| view(&state, p))
        .collect();
    Json(parcels)
}

/// GET /v1/parcels/:id
#[utoipa::path(
    get,
    path = "/v1/parcels/{id}",
    params(("id" = i32, Path, description = "Parcel id")),
    responses(
        (status = 200, description = "Parcel", body = ParcelView),
        (status = 404, description = "No active parcel with this id"),
    ),
    tag = "parcels"
)]
async fn get_parcel(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ParcelView>, AppError> {
    let parcel = state
        .parcels
        .find_active_by_id(id)
        .ok_or_else(|| AppError::NotFound(format!("no active parcel with id {id}")))?;
    Ok(Json(view(&state, parcel)))
}

/// PUT /v1/parcels/:id — full replacement of the mutable fields.
#[utoipa::path(
    put,
    path = "/v1/parcels/{id}",
    params(("id" = i32, Path, description = "Parcel id")),
    request_body = ParcelRequest,
    responses(
        (status = 200, description = "Parcel updated", body = ParcelView),
        (status = 404, description = "No active parcel or municipality with this id"),
        (status = 422, description = "Field validation failed"),
    ),
    tag = "parcels"
)]
async fn update_parcel(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<ParcelRequest>, JsonRejection>,
) -> Result<Json<ParcelView>, AppError> {
    let req = extract_validated_json(body)?;
    if state.municipalities.find_active_by_id(req.municipality_id).is_none() {
        return Err(AppError::NotFound(format!(
            "no active municipality with id {}",
            req.municipality_id
        )));
    }
    let parcel = state.parcels.update(id, req.into_draft())?;
    if let Some(pool) = &state.db_pool {
        crate::db::parcels::update(pool, &parcel).await?;
    }
    Ok(Json(view(&state, parcel)))
}

/// DELETE /v1/parcels/:id — soft-deactivate; the record and its history stay.
#[utoipa::path(
    delete,
    path = "/v1/parcels/{id}",
    params(("id" = i32, Path, description = "Parcel id")),
    responses(
        (status = 200, description = "Parcel deactivated", body = LandParcel),
        (status = 404, description = "No active parcel with this id"),
    ),
    tag = "parcels"
)]
async fn deactivate_parcel(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<LandParcel>, AppError> {
    let parcel = state.parcels.deactivate(id)?;
    if let Some(pool) = &state.db_pool {
        crate::db::parcels::update(pool, &parcel).await?;
    }
    Ok(Json(parcel))
}
