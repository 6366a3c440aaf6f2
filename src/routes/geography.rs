//! # Reference Geography API
//!
//! Country → department → municipality CRUD. Parent existence is checked at
//! create time only; deactivating a country does NOT cascade to its
//! departments or municipalities (a deliberate non-goal of this backend).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, Country, Department, Municipality};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/geography/countries", post(create_country).get(list_countries))
        .route(
            "/v1/geography/countries/:id",
            get(get_country).put(update_country).delete(deactivate_country),
        )
        .route(
            "/v1/geography/departments",
            post(create_department).get(list_departments),
        )
        .route(
            "/v1/geography/departments/:id",
            axum::routing::put(update_department).delete(deactivate_department),
        )
        .route(
            "/v1/geography/municipalities",
            post(create_municipality).get(list_municipalities),
        )
        .route(
            "/v1/geography/municipalities/:id",
            axum::routing::put(update_municipality).delete(deactivate_municipality),
        )
}

fn validate_geo_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name is required".to_string());
    }
    if name.len() > 80 {
        return Err("name must not exceed 80 characters".to_string());
    }
    Ok(())
}

// ── Countries ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CountryRequest {
    pub name: String,
    /// Three-letter ISO code, e.g. "NIC". Case-insensitive on input.
    pub iso_code: String,
}

impl Validate for CountryRequest {
    fn validate(&self) -> Result<(), String> {
        validate_geo_name(&self.name)?;
        let iso = self.iso_code.trim();
        if iso.len() != 3 || !iso.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err("iso_code must be exactly 3 letters".to_string());
        }
        Ok(())
    }
}

/// POST /v1/geography/countries
#[utoipa::path(
    post,
    path = "/v1/geography/countries",
    request_body = CountryRequest,
    responses(
        (status = 201, description = "Country created", body = Country),
        (status = 409, description = "Active country with that name or ISO code exists"),
    ),
    tag = "geography"
)]
async fn create_country(
    State(state): State<AppState>,
    body: Result<Json<CountryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Country>), AppError> {
    let req = extract_validated_json(body)?;
    let country = state.countries.create(&req.name, &req.iso_code)?;
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::geography::insert_country(pool, &country).await {
            tracing::error!(country_id = country.country_id, error = %e, "failed to persist country");
            return Err(AppError::Internal(
                "country recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    Ok((StatusCode::CREATED, Json(country)))
}

/// GET /v1/geography/countries — active countries sorted by name.
#[utoipa::path(
    get,
    path = "/v1/geography/countries",
    responses((status = 200, description = "Active countries", body = Vec<Country>)),
    tag = "geography"
)]
async fn list_countries(State(state): State<AppState>) -> Json<Vec<Country>> {
    Json(state.countries.list_active())
}

/// GET /v1/geography/countries/:id
#[utoipa::path(
    get,
    path = "/v1/geography/countries/{id}",
    params(("id" = i32, Path, description = "Country id")),
    responses(
        (status = 200, description = "Country", body = Country),
        (status = 404, description = "No active country with this id"),
    ),
    tag = "geography"
)]
async fn get_country(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Country>, AppError> {
    state
        .countries
        .find_active_by_id(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no active country with id {id}")))
}

/// PUT /v1/geography/countries/:id
#[utoipa::path(
    put,
    path = "/v1/geography/countries/{id}",
    params(("id" = i32, Path, description = "Country id")),
    request_body = CountryRequest,
    responses(
        (status = 200, description = "Country updated", body = Country),
        (status = 404, description = "No active country with this id"),
        (status = 409, description = "Name or ISO code taken"),
    ),
    tag = "geography"
)]
async fn update_country(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<CountryRequest>, JsonRejection>,
) -> Result<Json<Country>, AppError> {
    let req = extract_validated_json(body)?;
    let country = state.countries.update(id, &req.name, &req.iso_code)?;
    if let Some(pool) = &state.db_pool {
        crate::db::geography::update_country(pool, &country).await?;
    }
    Ok(Json(country))
}

/// DELETE /v1/geography/countries/:id — soft-deactivate, no cascade.
#[utoipa::path(
    delete,
    path = "/v1/geography/countries/{id}",
    params(("id" = i32, Path, description = "Country id")),
    responses(
        (status = 200, description = "Country deactivated", body = Country),
        (status = 404, description = "No active country with this id"),
    ),
    tag = "geography"
)]
async fn deactivate_country(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Country>, AppError> {
    let country = state.countries.deactivate(id)?;
    if let Some(pool) = &state.db_pool {
        crate::db::geography::update_country(pool, &country).await?;
    }
    Ok(Json(country))
}

// ── Departments ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateDepartmentRequest {
    pub name: String,
    pub country_id: i32,
}

impl Validate for CreateDepartmentRequest {
    fn validate(&self) -> Result<(), String> {
        validate_geo_name(&self.name)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RenameRequest {
    pub name: String,
}

impl Validate for RenameRequest {
    fn validate(&self) -> Result<(), String> {
        validate_geo_name(&self.name)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DepartmentListQuery {
    #[serde(default)]
    pub country_id: Option<i32>,
}

/// POST /v1/geography/departments — 404 when the country is not active.
#[utoipa::path(
    post,
    path = "/v1/geography/departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 404, description = "Country not found"),
        (status = 409, description = "Active department with that name exists in the country"),
    ),
    tag = "geography"
)]
async fn create_department(
    State(state): State<AppState>,
    body: Result<Json<CreateDepartmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Department>), AppError> {
    let req = extract_validated_json(body)?;
    if state.countries.find_active_by_id(req.country_id).is_none() {
        return Err(AppError::NotFound(format!(
            "no active country with id {}",
            req.country_id
        )));
    }
    let department = state.departments.create(&req.name, req.country_id)?;
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::geography::insert_department(pool, &department).await {
            tracing::error!(department_id = department.department_id, error = %e, "failed to persist department");
            return Err(AppError::Internal(
                "department recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    Ok((StatusCode::CREATED, Json(department)))
}

/// GET /v1/geography/departments — optionally filtered by country.
#[utoipa::path(
    get,
    path = "/v1/geography/departments",
    params(("country_id" = Option<i32>, Query, description = "Limit to one country")),
    responses((status = 200, description = "Active departments", body = Vec<Department>)),
    tag = "geography"
)]
async fn list_departments(
    State(state): State<AppState>,
    Query(query): Query<DepartmentListQuery>,
) -> Json<Vec<Department>> {
    Json(state.departments.list_active(query.country_id))
}

/// PUT /v1/geography/departments/:id
#[utoipa::path(
    put,
    path = "/v1/geography/departments/{id}",
    params(("id" = i32, Path, description = "Department id")),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Department renamed", body = Department),
        (status = 404, description = "No active department with this id"),
        (status = 409, description = "Name taken within the country"),
    ),
    tag = "geography"
)]
async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<Department>, AppError> {
    let req = extract_validated_json(body)?;
    let department = state.departments.update(id, &req.name)?;
    if let Some(pool) = &state.db_pool {
        crate::db::geography::update_department(pool, &department).await?;
    }
    Ok(Json(department))
}

/// DELETE /v1/geography/departments/:id
#[utoipa::path(
    delete,
    path = "/v1/geography/departments/{id}",
    params(("id" = i32, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department deactivated", body = Department),
        (status = 404, description = "No active department with this id"),
    ),
    tag = "geography"
)]
async fn deactivate_department(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Department>, AppError> {
    let department = state.departments.deactivate(id)?;
    if let Some(pool) = &state.db_pool {
        crate::db::geography::update_department(pool, &department).await?;
    }
    Ok(Json(department))
}

// ── Municipalities ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateMunicipalityRequest {
    pub name: String,
    pub department_id: i32,
}

impl Validate for CreateMunicipalityRequest {
    fn validate(&self) -> Result<(), String> {
        validate_geo_name(&self.name)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MunicipalityListQuery {
    #[serde(default)]
    pub department_id: Option<i32>,
}

/// POST /v1/geography/municipalities — 404 when the department is not active.
#[utoipa::path(
    post,
    path = "/v1/geography/municipalities",
    request_body = CreateMunicipalityRequest,
    responses(
        (status = 201, description = "Municipality created", body = Municipality),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Active municipality with that name exists in the department"),
    ),
    tag = "geography"
)]
async fn create_municipality(
    State(state): State<AppState>,
    body: Result<Json<CreateMunicipalityRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Municipality>), AppError> {
    let req = extract_validated_json(body)?;
    if state.departments.find_active_by_id(req.department_id).is_none() {
        return Err(AppError::NotFound(format!(
            "no active department with id {}",
            req.department_id
        )));
    }
    let municipality = state.municipalities.create(&req.name, req.department_id)?;
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::geography::insert_municipality(pool, &municipality).await {
            tracing::error!(municipality_id = municipality.municipality_id, error = %e, "failed to persist municipality");
            return Err(AppError::Internal(
                "municipality recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    Ok((StatusCode::CREATED, Json(municipality)))
}

/// GET /v1/geography/municipalities — optionally filtered by department.
#[utoipa::path(
    get,
    path = "/v1/geography/municipalities",
    params(("department_id" = Option<i32>, Query, description = "Limit to one department")),
    responses((status = 200, description = "Active municipalities", body = Vec<Municipality>)),
    tag = "geography"
)]
async fn list_municipalities(
    State(state): State<AppState>,
    Query(query): Query<MunicipalityListQuery>,
) -> Json<Vec<Municipality>> {
    Json(state.municipalities.list_active(query.department_id))
}

/// PUT /v1/geography/municipalities/:id
#[utoipa::path(
    put,
    path = "/v1/geography/municipalities/{id}",
    params(("id" = i32, Path, description = "Municipality id")),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Municipality renamed", body = Municipality),
        (status = 404, description = "No active municipality with this id"),
        (status = 409, description = "Name taken within the department"),
    ),
    tag = "geography"
)]
async fn update_municipality(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<Municipality>, AppError> {
    let req = extract_validated_json(body)?;
    let municipality = state.municipalities.update(id, &req.name)?;
    if let Some(pool) = &state.db_pool {
        crate::db::geography::update_municipality(pool, &municipality).await?;
    }
    Ok(Json(municipality))
}

/// DELETE /v1/geography/municipalities/:id
#[utoipa::path(
    delete,
    path = "/v1/geography/municipalities/{id}",
    params(("id" = i32, Path, description = "Municipality id")),
    responses(
        (status = 200, description = "Municipality deactivated", body = Municipality),
        (status = 404, description = "No active municipality with this id"),
    ),
    tag = "geography"
)]
async fn deactivate_municipality(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Municipality>, AppError> {
    let municipality = state.municipalities.deactivate(id)?;
    if let Some(pool) = &state.db_pool {
        crate::db::geography::update_municipality(pool, &municipality).await?;
    }
    Ok(Json(municipality))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_code_must_be_three_letters() {
        let bad = CountryRequest {
            name: "Nicaragua".to_string(),
            iso_code: "NI".to_string(),
        };
        assert!(bad.validate().is_err());

        let digits = CountryRequest {
            name: "Nicaragua".to_string(),
            iso_code: "N1C".to_string(),
        };
        assert!(digits.validate().is_err());

        let ok = CountryRequest {
            name: "Nicaragua".to_string(),
            iso_code: "nic".to_string(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn geo_names_are_bounded() {
        assert!(validate_geo_name(&"x".repeat(80)).is_ok());
        assert!(validate_geo_name(&"x".repeat(81)).is_err());
        assert!(validate_geo_name("").is_err());
    }
}
