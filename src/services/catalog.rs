//! Catalog seam used by the assistant.
//!
//! The assistant only needs bed and plant listing, creation and deletion.
//! `PgPool` implements [`Catalog`] by delegating to the `bed` and `plant`
//! services; tests swap in [`memory::MemoryCatalog`].

use sqlx::PgPool;
use uuid::Uuid;

use super::CatalogError;
use super::bed::{self, GardenBed, NewBed};
use super::plant::{self, NewPlant, Plant};

#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    async fn beds_for_user(&self, user_id: Uuid) -> Result<Vec<GardenBed>, CatalogError>;
    async fn create_bed(&self, new: &NewBed) -> Result<GardenBed, CatalogError>;
    async fn delete_bed(&self, id: Uuid) -> Result<bool, CatalogError>;
    async fn plants_in_bed(&self, bed_id: Uuid) -> Result<Vec<Plant>, CatalogError>;
    async fn create_plant(&self, new: &NewPlant) -> Result<Plant, CatalogError>;
    async fn delete_plant(&self, id: Uuid) -> Result<bool, CatalogError>;
}

#[async_trait::async_trait]
impl Catalog for PgPool {
    async fn beds_for_user(&self, user_id: Uuid) -> Result<Vec<GardenBed>, CatalogError> {
        bed::list_beds_for_user(self, user_id).await
    }

    async fn create_bed(&self, new: &NewBed) -> Result<GardenBed, CatalogError> {
        bed::create_bed(self, new).await
    }

    async fn delete_bed(&self, id: Uuid) -> Result<bool, CatalogError> {
        bed::delete_bed(self, id).await
    }

    async fn plants_in_bed(&self, bed_id: Uuid) -> Result<Vec<Plant>, CatalogError> {
        plant::list_plants_for_bed(self, bed_id).await
    }

    async fn create_plant(&self, new: &NewPlant) -> Result<Plant, CatalogError> {
        plant::create_plant(self, new).await
    }

    async fn delete_plant(&self, id: Uuid) -> Result<bool, CatalogError> {
        plant::delete_plant(self, id).await
    }
}

// =============================================================================
// IN-MEMORY CATALOG (tests)
// =============================================================================

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use time::OffsetDateTime;

    use super::*;
    use crate::services::plant::DEFAULT_QUANTITY;

    /// Vec-backed catalog. Newest rows are listed first, like the SQL queries.
    #[derive(Default)]
    pub struct MemoryCatalog {
        pub beds: Mutex<Vec<GardenBed>>,
        pub plants: Mutex<Vec<Plant>>,
    }

    impl MemoryCatalog {
        pub fn seed_bed(&self, user_id: Uuid, name: &str) -> GardenBed {
            let bed = bed_row(&NewBed::named(user_id, name));
            self.beds.lock().unwrap().insert(0, bed.clone());
            bed
        }

        pub fn seed_plant(&self, bed_id: Uuid, common_name: &str) -> Plant {
            let plant = plant_row(&NewPlant { bed_id, common_name: common_name.into(), ..NewPlant::default() });
            self.plants.lock().unwrap().insert(0, plant.clone());
            plant
        }

        pub fn bed_names(&self) -> Vec<String> {
            self.beds.lock().unwrap().iter().map(|b| b.bed_name.clone()).collect()
        }

        pub fn plant_names(&self, bed_id: Uuid) -> Vec<String> {
            self.plants
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.bed_id == bed_id)
                .map(|p| p.common_name.clone())
                .collect()
        }
    }

    fn bed_row(new: &NewBed) -> GardenBed {
        GardenBed {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            bed_name: new.bed_name.clone(),
            bed_size_sqft: new.bed_size_sqft,
            sun_exposure: new.sun_exposure.clone(),
            soil_type: new.soil_type.clone(),
            soil_moisture: new.soil_moisture.clone(),
            notes: new.notes.clone(),
            created_at: OffsetDateTime::now_utc(),
            last_updated: OffsetDateTime::now_utc(),
        }
    }

    fn plant_row(new: &NewPlant) -> Plant {
        Plant {
            id: Uuid::new_v4(),
            bed_id: new.bed_id,
            common_name: new.common_name.clone(),
            scientific_name: new.scientific_name.clone(),
            plant_type: new.plant_type.clone(),
            date_planted: new.date_planted.clone(),
            image_url: new.image_url.clone(),
            quantity: Some(new.quantity.unwrap_or(DEFAULT_QUANTITY)),
            spacing_inches: new.spacing_inches,
            current_height: new.current_height.clone(),
            health_status: new.health_status.clone(),
            identification_confidence: new.identification_confidence,
            notes: new.notes.clone(),
            created_at: OffsetDateTime::now_utc(),
            last_updated: OffsetDateTime::now_utc(),
        }
    }

    #[async_trait::async_trait]
    impl Catalog for MemoryCatalog {
        async fn beds_for_user(&self, user_id: Uuid) -> Result<Vec<GardenBed>, CatalogError> {
            Ok(self.beds.lock().unwrap().iter().filter(|b| b.user_id == user_id).cloned().collect())
        }

        async fn create_bed(&self, new: &NewBed) -> Result<GardenBed, CatalogError> {
            crate::services::require_text("bedName", &new.bed_name)?;
            let bed = bed_row(new);
            self.beds.lock().unwrap().insert(0, bed.clone());
            Ok(bed)
        }

        async fn delete_bed(&self, id: Uuid) -> Result<bool, CatalogError> {
            let mut beds = self.beds.lock().unwrap();
            let before = beds.len();
            beds.retain(|b| b.id != id);
            let removed = beds.len() != before;
            self.plants.lock().unwrap().retain(|p| p.bed_id != id);
            Ok(removed)
        }

        async fn plants_in_bed(&self, bed_id: Uuid) -> Result<Vec<Plant>, CatalogError> {
            Ok(self.plants.lock().unwrap().iter().filter(|p| p.bed_id == bed_id).cloned().collect())
        }

        async fn create_plant(&self, new: &NewPlant) -> Result<Plant, CatalogError> {
            crate::services::require_text("commonName", &new.common_name)?;
            if !self.beds.lock().unwrap().iter().any(|b| b.id == new.bed_id) {
                return Err(CatalogError::NotFound { kind: "bed", id: new.bed_id });
            }
            let plant = plant_row(new);
            self.plants.lock().unwrap().insert(0, plant.clone());
            Ok(plant)
        }

        async fn delete_plant(&self, id: Uuid) -> Result<bool, CatalogError> {
            let mut plants = self.plants.lock().unwrap();
            let before = plants.len();
            plants.retain(|p| p.id != id);
            Ok(plants.len() != before)
        }
    }
}
