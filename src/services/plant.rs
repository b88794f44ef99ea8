//! Plant CRUD. Mirrors `bed` for a bed's plants.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{CatalogError, patch_field, require_text};

const PLANT_COLUMNS: &str = "id, bed_id, common_name, scientific_name, plant_type, date_planted, image_url, \
     quantity, spacing_inches, current_height, health_status, identification_confidence, notes, \
     created_at, last_updated";

pub const DEFAULT_QUANTITY: i32 = 1;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: Uuid,
    pub bed_id: Uuid,
    pub common_name: String,
    pub scientific_name: Option<String>,
    pub plant_type: Option<String>,
    pub date_planted: Option<String>,
    pub image_url: Option<String>,
    pub quantity: Option<i32>,
    pub spacing_inches: Option<f64>,
    pub current_height: Option<String>,
    pub health_status: Option<String>,
    pub identification_confidence: Option<i32>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlant {
    pub bed_id: Uuid,
    pub common_name: String,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub plant_type: Option<String>,
    #[serde(default)]
    pub date_planted: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub spacing_inches: Option<f64>,
    #[serde(default)]
    pub current_height: Option<String>,
    #[serde(default)]
    pub health_status: Option<String>,
    #[serde(default)]
    pub identification_confidence: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantPatch {
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub scientific_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub plant_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub date_planted: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub quantity: Option<Option<i32>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub spacing_inches: Option<Option<f64>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub current_height: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub health_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub identification_confidence: Option<Option<i32>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub notes: Option<Option<String>>,
}

impl PlantPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.common_name.is_none()
            && self.scientific_name.is_none()
            && self.plant_type.is_none()
            && self.date_planted.is_none()
            && self.image_url.is_none()
            && self.quantity.is_none()
            && self.spacing_inches.is_none()
            && self.current_height.is_none()
            && self.health_status.is_none()
            && self.identification_confidence.is_none()
            && self.notes.is_none()
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_plant(pool: &PgPool, id: Uuid) -> Result<Option<Plant>, CatalogError> {
    let plant = sqlx::query_as::<_, Plant>(&format!("SELECT {PLANT_COLUMNS} FROM plants WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(plant)
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_plants_for_bed(pool: &PgPool, bed_id: Uuid) -> Result<Vec<Plant>, CatalogError> {
    let plants = sqlx::query_as::<_, Plant>(&format!(
        "SELECT {PLANT_COLUMNS} FROM plants WHERE bed_id = $1 ORDER BY last_updated DESC"
    ))
    .bind(bed_id)
    .fetch_all(pool)
    .await?;
    Ok(plants)
}

/// Insert a plant; a missing quantity is stored as 1.
///
/// # Errors
///
/// Returns `Validation` for a blank common name, or a database error
/// (including an unknown `bed_id`).
pub async fn create_plant(pool: &PgPool, new: &NewPlant) -> Result<Plant, CatalogError> {
    require_text("commonName", &new.common_name)?;

    let plant = sqlx::query_as::<_, Plant>(&format!(
        "INSERT INTO plants (bed_id, common_name, scientific_name, plant_type, date_planted, image_url,
                             quantity, spacing_inches, current_height, health_status,
                             identification_confidence, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING {PLANT_COLUMNS}"
    ))
    .bind(new.bed_id)
    .bind(new.common_name.trim())
    .bind(&new.scientific_name)
    .bind(&new.plant_type)
    .bind(&new.date_planted)
    .bind(&new.image_url)
    .bind(new.quantity.unwrap_or(DEFAULT_QUANTITY))
    .bind(new.spacing_inches)
    .bind(&new.current_height)
    .bind(&new.health_status)
    .bind(new.identification_confidence)
    .bind(&new.notes)
    .fetch_one(pool)
    .await?;
    Ok(plant)
}

/// Apply a partial update and bump `last_updated`.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id and `Validation` when the patch
/// blanks the common name.
pub async fn update_plant(pool: &PgPool, id: Uuid, patch: &PlantPatch) -> Result<Plant, CatalogError> {
    if patch.is_empty() {
        return get_plant(pool, id)
            .await?
            .ok_or(CatalogError::NotFound { kind: "plant", id });
    }
    if let Some(name) = &patch.common_name {
        require_text("commonName", name)?;
    }

    let mut builder = QueryBuilder::new("UPDATE plants SET last_updated = now()");
    if let Some(name) = &patch.common_name {
        builder.push(", common_name = ").push_bind(name.trim().to_string());
    }
    for (column, value) in [
        ("scientific_name", &patch.scientific_name),
        ("plant_type", &patch.plant_type),
        ("date_planted", &patch.date_planted),
        ("image_url", &patch.image_url),
        ("current_height", &patch.current_height),
        ("health_status", &patch.health_status),
        ("notes", &patch.notes),
    ] {
        if let Some(v) = value {
            builder.push(format!(", {column} = ")).push_bind(v.clone());
        }
    }
    if let Some(v) = patch.quantity {
        builder.push(", quantity = ").push_bind(v);
    }
    if let Some(v) = patch.spacing_inches {
        builder.push(", spacing_inches = ").push_bind(v);
    }
    if let Some(v) = patch.identification_confidence {
        builder.push(", identification_confidence = ").push_bind(v);
    }
    builder.push(" WHERE id = ").push_bind(id);
    builder.push(" RETURNING ").push(PLANT_COLUMNS);

    builder
        .build_query_as::<Plant>()
        .fetch_optional(pool)
        .await?
        .ok_or(CatalogError::NotFound { kind: "plant", id })
}

/// Returns whether a row was removed.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_plant(pool: &PgPool, id: Uuid) -> Result<bool, CatalogError> {
    let result = sqlx::query("DELETE FROM plants WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
#[path = "plant_test.rs"]
mod tests;
