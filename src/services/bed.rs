//! Garden bed CRUD.
//!
//! DESIGN
//! ======
//! Beds are listed newest-edit first. Partial updates are built with
//! `QueryBuilder` from the fields present in the patch; a patch that names
//! no field returns the stored row untouched. Plants cascade on delete via
//! the `plants.bed_id` foreign key.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{CatalogError, patch_field, require_text};

const BED_COLUMNS: &str =
    "id, user_id, bed_name, bed_size_sqft, sun_exposure, soil_type, soil_moisture, notes, created_at, last_updated";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GardenBed {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bed_name: String,
    pub bed_size_sqft: Option<f64>,
    pub sun_exposure: Option<String>,
    pub soil_type: Option<String>,
    pub soil_moisture: Option<String>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBed {
    pub user_id: Uuid,
    pub bed_name: String,
    #[serde(default)]
    pub bed_size_sqft: Option<f64>,
    #[serde(default)]
    pub sun_exposure: Option<String>,
    #[serde(default)]
    pub soil_type: Option<String>,
    #[serde(default)]
    pub soil_moisture: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewBed {
    /// A bed with only a name, as created by the assistant.
    #[must_use]
    pub fn named(user_id: Uuid, bed_name: impl Into<String>) -> Self {
        Self { user_id, bed_name: bed_name.into(), ..Self::default() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedPatch {
    #[serde(default)]
    pub bed_name: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub bed_size_sqft: Option<Option<f64>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub sun_exposure: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub soil_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub soil_moisture: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub notes: Option<Option<String>>,
}

impl BedPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bed_name.is_none()
            && self.bed_size_sqft.is_none()
            && self.sun_exposure.is_none()
            && self.soil_type.is_none()
            && self.soil_moisture.is_none()
            && self.notes.is_none()
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_bed(pool: &PgPool, id: Uuid) -> Result<Option<GardenBed>, CatalogError> {
    let bed = sqlx::query_as::<_, GardenBed>(&format!("SELECT {BED_COLUMNS} FROM garden_beds WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(bed)
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_beds_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<GardenBed>, CatalogError> {
    let beds = sqlx::query_as::<_, GardenBed>(&format!(
        "SELECT {BED_COLUMNS} FROM garden_beds WHERE user_id = $1 ORDER BY last_updated DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(beds)
}

/// # Errors
///
/// Returns `Validation` for a blank name, or a database error (including an
/// unknown `user_id`).
pub async fn create_bed(pool: &PgPool, new: &NewBed) -> Result<GardenBed, CatalogError> {
    require_text("bedName", &new.bed_name)?;

    let bed = sqlx::query_as::<_, GardenBed>(&format!(
        "INSERT INTO garden_beds (user_id, bed_name, bed_size_sqft, sun_exposure, soil_type, soil_moisture, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {BED_COLUMNS}"
    ))
    .bind(new.user_id)
    .bind(new.bed_name.trim())
    .bind(new.bed_size_sqft)
    .bind(&new.sun_exposure)
    .bind(&new.soil_type)
    .bind(&new.soil_moisture)
    .bind(&new.notes)
    .fetch_one(pool)
    .await?;
    Ok(bed)
}

/// Apply a partial update and bump `last_updated`.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id and `Validation` when the patch
/// blanks the bed name.
pub async fn update_bed(pool: &PgPool, id: Uuid, patch: &BedPatch) -> Result<GardenBed, CatalogError> {
    if patch.is_empty() {
        return get_bed(pool, id)
            .await?
            .ok_or(CatalogError::NotFound { kind: "bed", id });
    }
    if let Some(name) = &patch.bed_name {
        require_text("bedName", name)?;
    }

    let mut builder = QueryBuilder::new("UPDATE garden_beds SET last_updated = now()");
    if let Some(name) = &patch.bed_name {
        builder.push(", bed_name = ").push_bind(name.trim().to_string());
    }
    if let Some(v) = patch.bed_size_sqft {
        builder.push(", bed_size_sqft = ").push_bind(v);
    }
    if let Some(v) = &patch.sun_exposure {
        builder.push(", sun_exposure = ").push_bind(v.clone());
    }
    if let Some(v) = &patch.soil_type {
        builder.push(", soil_type = ").push_bind(v.clone());
    }
    if let Some(v) = &patch.soil_moisture {
        builder.push(", soil_moisture = ").push_bind(v.clone());
    }
    if let Some(v) = &patch.notes {
        builder.push(", notes = ").push_bind(v.clone());
    }
    builder.push(" WHERE id = ").push_bind(id);
    builder.push(" RETURNING ").push(BED_COLUMNS);

    builder
        .build_query_as::<GardenBed>()
        .fetch_optional(pool)
        .await?
        .ok_or(CatalogError::NotFound { kind: "bed", id })
}

/// Delete a bed and, through the foreign key, its plants. Returns whether a
/// row was removed.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_bed(pool: &PgPool, id: Uuid) -> Result<bool, CatalogError> {
    let result = sqlx::query("DELETE FROM garden_beds WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
#[path = "bed_test.rs"]
mod tests;
