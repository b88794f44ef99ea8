use super::*;
#[cfg(feature = "live-db-tests")]
use crate::state::test_helpers::integration_pool;

#[test]
fn new_plant_accepts_camel_case_and_optional_fields() {
    let plant: NewPlant = serde_json::from_value(serde_json::json!({
        "bedId": Uuid::nil(),
        "commonName": "Tomato",
        "scientificName": "Solanum lycopersicum",
        "identificationConfidence": 87
    }))
    .unwrap();
    assert_eq!(plant.common_name, "Tomato");
    assert_eq!(plant.identification_confidence, Some(87));
    assert!(plant.quantity.is_none());
}

#[test]
fn patch_can_clear_quantity_and_set_health() {
    let patch: PlantPatch = serde_json::from_str(r#"{"quantity": null, "healthStatus": "wilting"}"#).unwrap();
    assert_eq!(patch.quantity, Some(None));
    assert_eq!(patch.health_status, Some(Some("wilting".into())));
    assert!(patch.common_name.is_none());
    assert!(!patch.is_empty());
    assert!(PlantPatch::default().is_empty());
}

#[test]
fn plant_serializes_camel_case() {
    let plant = Plant {
        id: Uuid::nil(),
        bed_id: Uuid::nil(),
        common_name: "Rosemary".into(),
        scientific_name: None,
        plant_type: Some("herb".into()),
        date_planted: None,
        image_url: Some("/uploads/1-abc-rosemary.jpg".into()),
        quantity: Some(2),
        spacing_inches: None,
        current_height: None,
        health_status: None,
        identification_confidence: None,
        notes: None,
        created_at: OffsetDateTime::UNIX_EPOCH,
        last_updated: OffsetDateTime::UNIX_EPOCH,
    };
    let json = serde_json::to_value(plant).unwrap();
    assert_eq!(json["commonName"], "Rosemary");
    assert_eq!(json["plantType"], "herb");
    assert_eq!(json["imageUrl"], "/uploads/1-abc-rosemary.jpg");
    assert_eq!(json["quantity"], 2);
    assert!(json["identificationConfidence"].is_null());
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn plant_update_and_delete() {
    use crate::services::bed::{NewBed, create_bed};
    use crate::services::user::{NewUser, create_user};

    let pool = integration_pool().await;
    let user = create_user(
        &pool,
        &NewUser {
            name: "Grace".into(),
            email: format!("grace-{}@example.com", Uuid::new_v4()),
            location: None,
            yard_size: None,
            experience_level: None,
        },
    )
    .await
    .unwrap();
    let bed = create_bed(&pool, &NewBed::named(user.id, "Pots")).await.unwrap();

    let plant = create_plant(
        &pool,
        &NewPlant { bed_id: bed.id, common_name: "Mint".into(), quantity: Some(3), ..NewPlant::default() },
    )
    .await
    .unwrap();
    assert_eq!(plant.quantity, Some(3));

    let patch = PlantPatch { quantity: Some(None), notes: Some(Some("invasive".into())), ..PlantPatch::default() };
    let updated = update_plant(&pool, plant.id, &patch).await.unwrap();
    assert_eq!(updated.quantity, None);
    assert_eq!(updated.notes.as_deref(), Some("invasive"));

    let listed = list_plants_for_bed(&pool, bed.id).await.unwrap();
    assert_eq!(listed.len(), 1);

    assert!(delete_plant(&pool, plant.id).await.unwrap());
    assert!(get_plant(&pool, plant.id).await.unwrap().is_none());
}
