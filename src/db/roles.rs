//! Role directory persistence.
//!
//! All functions take a `&PgPool` and operate on the `roles` table. Ids are
//! allocated by the in-memory directory, so inserts carry explicit ids.

use sqlx::PgPool;

use crate::state::Role;

/// Insert a new role record.
pub async fn insert(pool: &PgPool, role: &Role) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO roles (role_id, name, description, active)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(role.role_id)
    .bind(&role.name)
    .bind(&role.description)
    .bind(role.active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update name, description, and active flag.
pub async fn update(pool: &PgPool, role: &Role) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE roles SET name = $1, description = $2, active = $3 WHERE role_id = $4",
    )
    .bind(&role.name)
    .bind(&role.description)
    .bind(role.active)
    .bind(role.role_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all roles into the in-memory directory on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RoleRow>(
        "SELECT role_id, name, description, active FROM roles ORDER BY role_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RoleRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct RoleRow {
    role_id: i32,
    name: String,
    description: String,
    active: bool,
}

impl RoleRow {
    fn into_record(self) -> Role {
        Role {
            role_id: self.role_id,
            name: self.name,
            description: self.description,
            active: self.active,
        }
    }
}
