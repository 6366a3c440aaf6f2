//! Reference geography persistence: `countries`, `departments`, and
//! `municipalities` tables. Flat rows; parent existence is checked at the
//! route layer and no cascades run here.

use sqlx::PgPool;

use crate::state::{Country, Department, Municipality};

// ── Countries ───────────────────────────────────────────────────────────────

pub async fn insert_country(pool: &PgPool, country: &Country) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO countries (country_id, name, iso_code, active)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(country.country_id)
    .bind(&country.name)
    .bind(&country.iso_code)
    .bind(country.active)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_country(pool: &PgPool, country: &Country) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE countries SET name = $1, iso_code = $2, active = $3 WHERE country_id = $4",
    )
    .bind(&country.name)
    .bind(&country.iso_code)
    .bind(country.active)
    .bind(country.country_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn load_all_countries(pool: &PgPool) -> Result<Vec<Country>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CountryRow>(
        "SELECT country_id, name, iso_code, active FROM countries ORDER BY country_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CountryRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct CountryRow {
    country_id: i32,
    name: String,
    iso_code: String,
    active: bool,
}

impl CountryRow {
    fn into_record(self) -> Country {
        Country {
            country_id: self.country_id,
            name: self.name,
            iso_code: self.iso_code,
            active: self.active,
        }
    }
}

// ── Departments ─────────────────────────────────────────────────────────────

pub async fn insert_department(pool: &PgPool, department: &Department) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO departments (department_id, name, country_id, active)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(department.department_id)
    .bind(&department.name)
    .bind(department.country_id)
    .bind(department.active)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_department(pool: &PgPool, department: &Department) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE departments SET name = $1, active = $2 WHERE department_id = $3",
    )
    .bind(&department.name)
    .bind(department.active)
    .bind(department.department_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn load_all_departments(pool: &PgPool) -> Result<Vec<Department>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DepartmentRow>(
        "SELECT department_id, name, country_id, active FROM departments ORDER BY department_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DepartmentRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct DepartmentRow {
    department_id: i32,
    name: String,
    country_id: i32,
    active: bool,
}

impl DepartmentRow {
    fn into_record(self) -> Department {
        Department {
            department_id: self.department_id,
            name: self.name,
            country_id: self.country_id,
            active: self.active,
        }
    }
}

// ── Municipalities ──────────────────────────────────────────────────────────

pub async fn insert_municipality(
    pool: &PgPool,
    municipality: &Municipality,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO municipalities (municipality_id, name, department_id, active)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(municipality.municipality_id)
    .bind(&municipality.name)
    .bind(municipality.department_id)
    .bind(municipality.active)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_municipality(
    pool: &PgPool,
    municipality: &Municipality,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE municipalities SET name = $1, active = $2 WHERE municipality_id = $3",
    )
    .bind(&municipality.name)
    .bind(municipality.active)
    .bind(municipality.municipality_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn load_all_municipalities(pool: &PgPool) -> Result<Vec<Municipality>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MunicipalityRow>(
        "SELECT municipality_id, name, department_id, active
         FROM municipalities ORDER BY municipality_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(MunicipalityRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct MunicipalityRow {
    municipality_id: i32,
    name: String,
    department_id: i32,
    active: bool,
}

impl MunicipalityRow {
    fn into_record(self) -> Municipality {
        Municipality {
            municipality_id: self.municipality_id,
            name: self.name,
            department_id: self.department_id,
            active: self.active,
        }
    }
}
