use std::collections::BTreeMap;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use sequencescape_entity::assets::{AssetType, PlatePurpose};
use sequencescape_entity::{aliquots, assets, container_associations, uuids};
use uuid::Uuid;

use super::SequencescapeStore;
use crate::common::errors::SyncError;
use crate::config::test_helpers::{seed_maps, setup_test_db};
use crate::resources::{Aliquot, Plate};

fn empty_plate(rows: u32, columns: u32) -> Plate {
    Plate {
        number_of_rows: rows,
        number_of_columns: columns,
        wells: BTreeMap::new(),
    }
}

fn plate_with_sample(rows: u32, columns: u32, location: &str, sample: Uuid) -> Plate {
    let mut wells = BTreeMap::new();
    wells.insert(
        location.to_string(),
        vec![Aliquot {
            sample: Some(sample),
        }],
    );
    Plate {
        number_of_rows: rows,
        number_of_columns: columns,
        wells,
    }
}

async fn store_with_small_maps() -> (SequencescapeStore, DatabaseConnection) {
    let db = setup_test_db().await;
    seed_maps(&db, 2, 2).await;
    (SequencescapeStore::new(db.clone()), db)
}

async fn count_assets(db: &DatabaseConnection, sti_type: AssetType) -> usize {
    assets::Entity::find()
        .filter(assets::Column::StiType.eq(sti_type))
        .all(db)
        .await
        .expect("asset query failed")
        .len()
}

#[tokio::test]
async fn create_plate_inserts_an_unassigned_plate_with_all_wells() {
    let (store, db) = store_with_small_maps().await;
    let plate_uuid = Uuid::new_v4();

    store
        .create_plate(&empty_plate(2, 2), plate_uuid)
        .await
        .expect("create_plate failed");

    let plate = store
        .plate_by_uuid(plate_uuid)
        .await
        .expect("lookup failed")
        .expect("plate should exist");
    assert_eq!(plate.sti_type, AssetType::Plate);
    assert_eq!(plate.plate_purpose, Some(PlatePurpose::Unassigned));

    // Empty wells are materialized too: the full 2x2 grid exists.
    assert_eq!(count_assets(&db, AssetType::Well).await, 4);
    let associations = container_associations::Entity::find()
        .filter(container_associations::Column::ContainerId.eq(plate.id))
        .all(&db)
        .await
        .expect("association query failed");
    assert_eq!(associations.len(), 4);
}

#[tokio::test]
async fn create_plate_records_sample_linkage_for_populated_wells() {
    let (store, db) = store_with_small_maps().await;
    let sample = Uuid::new_v4();

    store
        .create_plate(&plate_with_sample(2, 2, "A1", sample), Uuid::new_v4())
        .await
        .expect("create_plate failed");

    let linked = aliquots::Entity::find()
        .filter(aliquots::Column::SampleUuid.eq(sample))
        .all(&db)
        .await
        .expect("aliquot query failed");
    assert_eq!(linked.len(), 1);
}

#[tokio::test]
async fn create_plate_rolls_back_when_a_location_has_no_map() {
    let db = setup_test_db().await;
    let store = SequencescapeStore::new(db.clone());

    // 2x2 locations are not in the standard 96/384 seed, so the well
    // lookup fails mid-transaction.
    let error = store
        .create_plate(&empty_plate(2, 2), Uuid::new_v4())
        .await
        .expect_err("create_plate should fail");
    assert!(matches!(error, SyncError::TransactionFailure(_)));
    assert!(error.is_recoverable());

    // Nothing was partially applied.
    assert_eq!(count_assets(&db, AssetType::Plate).await, 0);
    assert!(
        uuids::Entity::find()
            .all(&db)
            .await
            .expect("uuid query failed")
            .is_empty()
    );
}

#[tokio::test]
async fn create_plate_rejects_well_locations_outside_the_grid() {
    let (store, db) = store_with_small_maps().await;

    // "C1" does not exist on a 2x2 grid; accepting it would drop the
    // aliquot without a trace.
    let error = store
        .create_plate(
            &plate_with_sample(2, 2, "C1", Uuid::new_v4()),
            Uuid::new_v4(),
        )
        .await
        .expect_err("create_plate should fail");
    assert!(matches!(error, SyncError::TransactionFailure(_)));
    assert!(error.is_recoverable());

    assert_eq!(count_assets(&db, AssetType::Plate).await, 0);
    assert!(
        aliquots::Entity::find()
            .all(&db)
            .await
            .expect("aliquot query failed")
            .is_empty()
    );
}

#[tokio::test]
async fn promote_plate_is_idempotent() {
    let (store, _db) = store_with_small_maps().await;
    let plate_uuid = Uuid::new_v4();
    store
        .create_plate(&empty_plate(2, 2), plate_uuid)
        .await
        .expect("create_plate failed");

    store
        .promote_plate(plate_uuid)
        .await
        .expect("first promotion failed");
    store
        .promote_plate(plate_uuid)
        .await
        .expect("second promotion should be a no-op");

    let plate = store
        .plate_by_uuid(plate_uuid)
        .await
        .expect("lookup failed")
        .expect("plate should exist");
    assert_eq!(plate.plate_purpose, Some(PlatePurpose::StockPlate));
}

#[tokio::test]
async fn promote_plate_without_mapping_fails_and_leaves_the_store_untouched() {
    let (store, db) = store_with_small_maps().await;

    let missing = Uuid::new_v4();
    let error = store
        .promote_plate(missing)
        .await
        .expect_err("promotion should fail");
    match error {
        SyncError::PlateNotFound(uuid) => assert_eq!(uuid, missing),
        other => panic!("expected PlateNotFound, got {other:?}"),
    }
    assert!(error.is_recoverable());
    assert_eq!(count_assets(&db, AssetType::Plate).await, 0);
}

#[tokio::test]
async fn delete_unassigned_plate_removes_the_plate_and_its_dependents() {
    let (store, db) = store_with_small_maps().await;
    let plate_uuid = Uuid::new_v4();
    store
        .create_plate(
            &plate_with_sample(2, 2, "B2", Uuid::new_v4()),
            plate_uuid,
        )
        .await
        .expect("create_plate failed");

    store
        .delete_unassigned_plate(plate_uuid)
        .await
        .expect("delete failed");

    assert!(
        store
            .plate_by_uuid(plate_uuid)
            .await
            .expect("lookup failed")
            .is_none()
    );
    assert_eq!(count_assets(&db, AssetType::Plate).await, 0);
    assert_eq!(count_assets(&db, AssetType::Well).await, 0);
    assert!(
        container_associations::Entity::find()
            .all(&db)
            .await
            .expect("association query failed")
            .is_empty()
    );
    assert!(
        aliquots::Entity::find()
            .all(&db)
            .await
            .expect("aliquot query failed")
            .is_empty()
    );
    assert!(
        uuids::Entity::find()
            .filter(uuids::Column::ExternalId.eq(plate_uuid))
            .one(&db)
            .await
            .expect("uuid query failed")
            .is_none()
    );
}

#[tokio::test]
async fn delete_unassigned_plate_without_mapping_is_a_silent_no_op() {
    let (store, _db) = store_with_small_maps().await;
    store
        .delete_unassigned_plate(Uuid::new_v4())
        .await
        .expect("deleting an unmapped plate should succeed");
}

#[tokio::test]
async fn promoted_plates_are_never_deleted() {
    let (store, db) = store_with_small_maps().await;
    let plate_uuid = Uuid::new_v4();
    store
        .create_plate(&empty_plate(2, 2), plate_uuid)
        .await
        .expect("create_plate failed");
    store
        .promote_plate(plate_uuid)
        .await
        .expect("promotion failed");

    store
        .delete_unassigned_plate(plate_uuid)
        .await
        .expect("delete should be refused silently");

    let plate = store
        .plate_by_uuid(plate_uuid)
        .await
        .expect("lookup failed")
        .expect("plate should still exist");
    assert_eq!(plate.plate_purpose, Some(PlatePurpose::StockPlate));
    assert_eq!(count_assets(&db, AssetType::Well).await, 4);
}

#[tokio::test]
async fn update_aliquots_requires_an_existing_plate() {
    let (store, _db) = store_with_small_maps().await;

    let missing = Uuid::new_v4();
    let error = store
        .update_aliquots(missing, &plate_with_sample(2, 2, "A1", Uuid::new_v4()))
        .await
        .expect_err("transfer target must exist");
    assert!(matches!(error, SyncError::PlateNotFound(_)));
}

#[tokio::test]
async fn update_aliquots_replaces_linkage_per_location() {
    let (store, db) = store_with_small_maps().await;
    let plate_uuid = Uuid::new_v4();
    let original = Uuid::new_v4();
    store
        .create_plate(&plate_with_sample(2, 2, "A1", original), plate_uuid)
        .await
        .expect("create_plate failed");

    let replacement = Uuid::new_v4();
    let mut transferred = plate_with_sample(2, 2, "A1", replacement);
    transferred.wells.insert(
        "B1".to_string(),
        vec![Aliquot {
            sample: Some(Uuid::new_v4()),
        }],
    );

    store
        .update_aliquots(plate_uuid, &transferred)
        .await
        .expect("update_aliquots failed");

    let rows = aliquots::Entity::find()
        .all(&db)
        .await
        .expect("aliquot query failed");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.sample_uuid != Some(original)));
    assert!(rows.iter().any(|row| row.sample_uuid == Some(replacement)));
}
