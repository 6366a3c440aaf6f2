//! Land parcel persistence, on the `land_parcels` table.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::state::LandParcel;

/// Insert a new parcel record.
pub async fn insert(pool: &PgPool, parcel: &LandParcel) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO land_parcels (parcel_id, code, owner_identification, owner_name,
                                   owner_phone, owner_email, address, area_manzanas,
                                   registered_on, municipality_id, yield_quintals,
                                   latitude, longitude, active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(parcel.parcel_id)
    .bind(&parcel.code)
    .bind(&parcel.owner_identification)
    .bind(&parcel.owner_name)
    .bind(&parcel.owner_phone)
    .bind(&parcel.owner_email)
    .bind(&parcel.address)
    .bind(parcel.area_manzanas)
    .bind(parcel.registered_on)
    .bind(parcel.municipality_id)
    .bind(parcel.yield_quintals)
    .bind(parcel.latitude)
    .bind(parcel.longitude)
    .bind(parcel.active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update every mutable column, including the active flag.
pub async fn update(pool: &PgPool, parcel: &LandParcel) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE land_parcels
         SET code = $1, owner_identification = $2, owner_name = $3, owner_phone = $4,
             owner_email = $5, address = $6, area_manzanas = $7, registered_on = $8,
             municipality_id = $9, yield_quintals = $10, latitude = $11, longitude = $12,
             active = $13
         WHERE parcel_id = $14",
    )
    .bind(&parcel.code)
    .bind(&parcel.owner_identification)
    .bind(&parcel.owner_name)
    .bind(&parcel.owner_phone)
    .bind(&parcel.owner_email)
    .bind(&parcel.address)
    .bind(parcel.area_manzanas)
    .bind(parcel.registered_on)
    .bind(parcel.municipality_id)
    .bind(parcel.yield_quintals)
    .bind(parcel.latitude)
    .bind(parcel.longitude)
    .bind(parcel.active)
    .bind(parcel.parcel_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all parcels into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<LandParcel>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ParcelRow>(
        "SELECT parcel_id, code, owner_identification, owner_name, owner_phone,
                owner_email, address, area_manzanas, registered_on, municipality_id,
                yield_quintals, latitude, longitude, active
         FROM land_parcels ORDER BY parcel_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ParcelRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ParcelRow {
    parcel_id: i32,
    code: String,
    owner_identification: String,
    owner_name: String,
    owner_phone: String,
    owner_email: Option<String>,
    address: String,
    area_manzanas: f64,
    registered_on: NaiveDate,
    municipality_id: i32,
    yield_quintals: f64,
    latitude: f64,
    longitude: f64,
    active: bool,
}

impl ParcelRow {
    fn into_record(self) -> LandParcel {
        LandParcel {
            parcel_id: self.parcel_id,
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
            active: self.active,
        }
    }
}
