//! Soil-chemistry catalog persistence, on the `chemical_elements` table.

use sqlx::PgPool;

use crate::state::ChemicalElement;

pub async fn insert(pool: &PgPool, element: &ChemicalElement) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO chemical_elements (element_id, symbol, name, equivalent_weight, active)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(element.element_id)
    .bind(&element.symbol)
    .bind(&element.name)
    .bind(element.equivalent_weight)
    .bind(element.active)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update(pool: &PgPool, element: &ChemicalElement) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE chemical_elements
         SET symbol = $1, name = $2, equivalent_weight = $3, active = $4
         WHERE element_id = $5",
    )
    .bind(&element.symbol)
    .bind(&element.name)
    .bind(element.equivalent_weight)
    .bind(element.active)
    .bind(element.element_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<ChemicalElement>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ElementRow>(
        "SELECT element_id, symbol, name, equivalent_weight, active
         FROM chemical_elements ORDER BY element_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ElementRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct ElementRow {
    element_id: i32,
    symbol: String,
    name: String,
    equivalent_weight: f64,
    active: bool,
}

impl ElementRow {
    fn into_record(self) -> ChemicalElement {
        ChemicalElement {
            element_id: self.element_id,
            symbol: self.symbol,
            name: self.name,
            equivalent_weight: self.equivalent_weight,
            active: self.active,
        }
    }
}
