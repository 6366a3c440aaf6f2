//! Interface directory persistence, on the `interfaces` table.

use sqlx::PgPool;

use crate::state::Interface;

/// Insert a new interface record.
pub async fn insert(pool: &PgPool, interface: &Interface) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO interfaces (interface_id, name, description, active)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(interface.interface_id)
    .bind(&interface.name)
    .bind(&interface.description)
    .bind(interface.active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update name, description, and active flag.
pub async fn update(pool: &PgPool, interface: &Interface) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE interfaces SET name = $1, description = $2, active = $3 WHERE interface_id = $4",
    )
    .bind(&interface.name)
    .bind(&interface.description)
    .bind(interface.active)
    .bind(interface.interface_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all interfaces into the in-memory directory on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Interface>, sqlx::Error> {
    let rows = sqlx::query_as::<_, InterfaceRow>(
        "SELECT interface_id, name, description, active FROM interfaces ORDER BY interface_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(InterfaceRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct InterfaceRow {
    interface_id: i32,
    name: String,
    description: String,
    active: bool,
}

impl InterfaceRow {
    fn into_record(self) -> Interface {
        Interface {
            interface_id: self.interface_id,
            name: self.name,
            description: self.description,
            active: self.active,
        }
    }
}
