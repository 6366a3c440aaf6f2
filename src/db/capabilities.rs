//! Capability edge persistence, on the `role_interface` table.
//!
//! The composite primary key `(role_id, interface_id)` enforces edge
//! uniqueness in storage, mirroring the BTreeMap key in the in-memory store.
//!
//! [`apply_plan`] is the only multi-statement write path in the repository:
//! a reconciliation batch executes inside one transaction, and any failure
//! rolls the whole batch back — partial application is a correctness bug.

use sqlx::PgPool;

use crate::matrix::reconcile::EdgeOp;
use crate::matrix::{CapabilityFlags, EdgeKey};

/// Apply a reconciliation plan inside a single transaction.
///
/// On any error the transaction is dropped without commit, which rolls back
/// every statement executed so far.
pub async fn apply_plan(pool: &PgPool, ops: &[(EdgeKey, EdgeOp)]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for ((role_id, interface_id), op) in ops {
        match op {
            EdgeOp::Insert(flags) => {
                sqlx::query(
                    "INSERT INTO role_interface (role_id, interface_id, can_read, can_create, can_update, can_delete)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(role_id)
                .bind(interface_id)
                .bind(flags.read)
                .bind(flags.create)
                .bind(flags.update)
                .bind(flags.delete)
                .execute(&mut *tx)
                .await?;
            }
            EdgeOp::Update(flags) => {
                sqlx::query(
                    "UPDATE role_interface
                     SET can_read = $3, can_create = $4, can_update = $5, can_delete = $6
                     WHERE role_id = $1 AND interface_id = $2",
                )
                .bind(role_id)
                .bind(interface_id)
                .bind(flags.read)
                .bind(flags.create)
                .bind(flags.update)
                .bind(flags.delete)
                .execute(&mut *tx)
                .await?;
            }
            EdgeOp::Delete => {
                sqlx::query("DELETE FROM role_interface WHERE role_id = $1 AND interface_id = $2")
                    .bind(role_id)
                    .bind(interface_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    tx.commit().await
}

/// Upsert a single edge (name-resolution adapter path).
pub async fn upsert(pool: &PgPool, key: EdgeKey, flags: CapabilityFlags) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO role_interface (role_id, interface_id, can_read, can_create, can_update, can_delete)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (role_id, interface_id) DO UPDATE SET
            can_read = EXCLUDED.can_read,
            can_create = EXCLUDED.can_create,
            can_update = EXCLUDED.can_update,
            can_delete = EXCLUDED.can_delete",
    )
    .bind(key.0)
    .bind(key.1)
    .bind(flags.read)
    .bind(flags.create)
    .bind(flags.update)
    .bind(flags.delete)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a single edge; returns whether a row existed.
pub async fn delete(pool: &PgPool, key: EdgeKey) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM role_interface WHERE role_id = $1 AND interface_id = $2")
            .bind(key.0)
            .bind(key.1)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Load the full edge set into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<(EdgeKey, CapabilityFlags)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EdgeRow>(
        "SELECT role_id, interface_id, can_read, can_create, can_update, can_delete
         FROM role_interface ORDER BY role_id, interface_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(EdgeRow::into_pair).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct EdgeRow {
    role_id: i32,
    interface_id: i32,
    can_read: bool,
    can_create: bool,
    can_update: bool,
    can_delete: bool,
}

impl EdgeRow {
    fn into_pair(self) -> (EdgeKey, CapabilityFlags) {
        (
            (self.role_id, self.interface_id),
            CapabilityFlags::new(self.can_read, self.can_create, self.can_update, self.can_delete),
        )
    }
}
