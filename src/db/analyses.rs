//! Soil analysis persistence: the `soil_analyses` header table and the
//! `analysis_measurements` readings attached to it.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::state::{AnalysisMeasurement, SoilAnalysis};

/// Insert a new analysis header.
pub async fn insert(pool: &PgPool, analysis: &SoilAnalysis) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO soil_analyses (analysis_id, sampled_on, laboratory, identifier, active)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(analysis.analysis_id)
    .bind(analysis.sampled_on)
    .bind(&analysis.laboratory)
    .bind(&analysis.identifier)
    .bind(analysis.active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update the header, including the active flag.
pub async fn update(pool: &PgPool, analysis: &SoilAnalysis) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE soil_analyses
         SET sampled_on = $1, laboratory = $2, identifier = $3, active = $4
         WHERE analysis_id = $5",
    )
    .bind(analysis.sampled_on)
    .bind(&analysis.laboratory)
    .bind(&analysis.identifier)
    .bind(analysis.active)
    .bind(analysis.analysis_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Insert one element reading.
pub async fn insert_measurement(
    pool: &PgPool,
    measurement: &AnalysisMeasurement,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO analysis_measurements
             (measurement_id, analysis_id, element_id, quantity, unit, active)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(measurement.measurement_id)
    .bind(measurement.analysis_id)
    .bind(measurement.element_id)
    .bind(measurement.quantity)
    .bind(&measurement.unit)
    .bind(measurement.active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all analysis headers into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<SoilAnalysis>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AnalysisRow>(
        "SELECT analysis_id, sampled_on, laboratory, identifier, active
         FROM soil_analyses ORDER BY analysis_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AnalysisRow::into_record).collect())
}

/// Load all element readings on startup.
pub async fn load_all_measurements(
    pool: &PgPool,
) -> Result<Vec<AnalysisMeasurement>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MeasurementRow>(
        "SELECT measurement_id, analysis_id, element_id, quantity, unit, active
         FROM analysis_measurements ORDER BY measurement_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(MeasurementRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct AnalysisRow {
    analysis_id: i32,
    sampled_on: NaiveDate,
    laboratory: String,
    identifier: String,
    active: bool,
}

impl AnalysisRow {
    fn into_record(self) -> SoilAnalysis {
        SoilAnalysis {
            analysis_id: self.analysis_id,
            sampled_on: self.sampled_on,
            laboratory: self.laboratory,
            identifier: self.identifier,
            active: self.active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MeasurementRow {
    measurement_id: i32,
    analysis_id: i32,
    element_id: i32,
    quantity: f64,
    unit: String,
    active: bool,
}

impl MeasurementRow {
    fn into_record(self) -> AnalysisMeasurement {
        AnalysisMeasurement {
            measurement_id: self.measurement_id,
            analysis_id: self.analysis_id,
            element_id: self.element_id,
            quantity: self.quantity,
            unit: self.unit,
            active: self.active,
        }
    }
}
