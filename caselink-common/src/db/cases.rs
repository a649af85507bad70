//! Case record database operations

use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// A legal case record, as far as enrichment is concerned
///
/// The trailing `-NNN` segment of the case number carries the county code
/// (NC court convention, e.g. `24CV001234-910` is a Wake County filing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Court case number, county code embedded in the trailing segment
    pub case_number: String,
    /// Free-text property address from the filing, if any
    pub property_address: Option<String>,
    /// Parcel/account identifier from the filing, if any
    pub parcel_hint: Option<String>,
}

impl CaseRecord {
    /// County code embedded in the case number (the text after the last '-')
    pub fn county_code(&self) -> Option<&str> {
        self.case_number.rsplit_once('-').map(|(_, code)| code)
    }
}

/// Load a case record by case number
pub async fn get_case(pool: &SqlitePool, case_number: &str) -> Result<Option<CaseRecord>> {
    let row = sqlx::query(
        r#"
        SELECT case_number, property_address, parcel_hint
        FROM cases
        WHERE case_number = ?
        "#,
    )
    .bind(case_number)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| CaseRecord {
        case_number: row.get("case_number"),
        property_address: row.get("property_address"),
        parcel_hint: row.get("parcel_hint"),
    }))
}

/// Insert or replace a case record
pub async fn save_case(pool: &SqlitePool, case: &CaseRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cases (case_number, property_address, parcel_hint)
        VALUES (?, ?, ?)
        ON CONFLICT(case_number) DO UPDATE SET
            property_address = excluded.property_address,
            parcel_hint = excluded.parcel_hint
        "#,
    )
    .bind(&case.case_number)
    .bind(&case.property_address)
    .bind(&case.parcel_hint)
    .execute(pool)
    .await?;

    Ok(())
}
