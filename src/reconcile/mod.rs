//! Applies decoded resources to the Sequencescape schema.
//!
//! Every operation runs in its own transaction: partial writes never
//! persist, and a failed operation leaves the store untouched so the
//! triggering message can be requeued verbatim.

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use sequencescape_entity::assets::{AssetType, PlatePurpose};
use sequencescape_entity::{aliquots, assets, container_associations, maps, uuids};
use uuid::Uuid;

use crate::common::errors::{SyncError, SyncResult};
use crate::resources::Plate;

/// Value of `uuids.resource_type` for rows mapping onto the assets table.
const ASSET_RESOURCE_TYPE: &str = "Asset";

/// The reconciliation engine. Holds the store handle explicitly; one
/// instance is built at startup and shared by the consumer.
#[derive(Clone)]
pub struct SequencescapeStore {
    db: DatabaseConnection,
}

impl SequencescapeStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a plate asset with an `Unassigned` purpose, its UUID
    /// mapping, and one well asset (plus container association) per
    /// grid location. Wells carrying aliquots get their sample linkage
    /// recorded as well.
    ///
    /// # Errors
    ///
    /// [`SyncError::TransactionFailure`] when a payload well key falls
    /// outside the grid or any insert fails, for example when a
    /// location/size combination has no map entry. The transaction
    /// rolls back and the caller is expected to requeue.
    pub async fn create_plate(&self, plate: &Plate, external_uuid: Uuid) -> SyncResult<()> {
        let locations = plate.locations();
        // Every payload key must land on the grid, otherwise its
        // aliquots would silently never be inserted.
        for location in plate.wells.keys() {
            if !locations.contains(location) {
                return Err(DbErr::RecordNotFound(format!(
                    "well location {location} is outside the plate grid"
                ))
                .into());
            }
        }

        let txn = self.db.begin().await?;

        let plate_asset = assets::ActiveModel {
            sti_type: Set(AssetType::Plate),
            plate_purpose: Set(Some(PlatePurpose::Unassigned)),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        uuids::ActiveModel {
            resource_type: Set(ASSET_RESOURCE_TYPE.to_string()),
            resource_id: Set(plate_asset.id),
            external_id: Set(external_uuid),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let asset_size = i32::try_from(plate.size()).unwrap_or(i32::MAX);
        for location in &locations {
            let map = maps::Entity::find()
                .filter(maps::Column::Description.eq(location.as_str()))
                .filter(maps::Column::AssetSize.eq(asset_size))
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    DbErr::RecordNotFound(format!(
                        "no map for location {location} at size {asset_size}"
                    ))
                })?;

            let well = assets::ActiveModel {
                sti_type: Set(AssetType::Well),
                map_id: Set(Some(map.id)),
                created_at: Set(chrono::Utc::now().into()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            container_associations::ActiveModel {
                container_id: Set(plate_asset.id),
                content_id: Set(well.id),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            for aliquot in plate.aliquots_at(&location) {
                aliquots::ActiveModel {
                    receptacle_id: Set(well.id),
                    sample_uuid: Set(aliquot.sample),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    /// Promotes the mapped plate to `StockPlate`.
    ///
    /// Promoting an already promoted plate is a no-op: order messages
    /// are redelivered at least once, so this must be idempotent.
    ///
    /// # Errors
    ///
    /// [`SyncError::PlateNotFound`] when no mapping exists yet, which
    /// means the order message overtook the plate message.
    pub async fn promote_plate(&self, item_uuid: Uuid) -> SyncResult<()> {
        let txn = self.db.begin().await?;

        let Some(mapping) = find_mapping(&txn, item_uuid).await? else {
            return Err(SyncError::PlateNotFound(item_uuid));
        };
        let Some(asset) = assets::Entity::find_by_id(mapping.resource_id).one(&txn).await? else {
            return Err(SyncError::PlateNotFound(item_uuid));
        };

        if asset.plate_purpose == Some(PlatePurpose::StockPlate) {
            return Ok(());
        }

        let mut active: assets::ActiveModel = asset.into();
        active.plate_purpose = Set(Some(PlatePurpose::StockPlate));
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Removes a provisional plate together with its wells,
    /// associations, aliquots, and UUID mapping.
    ///
    /// A missing mapping is a silent no-op: the plate may legitimately
    /// never have arrived. A promoted plate is never deleted, whatever
    /// later order messages claim about it.
    pub async fn delete_unassigned_plate(&self, item_uuid: Uuid) -> SyncResult<()> {
        let txn = self.db.begin().await?;

        let Some(mapping) = find_mapping(&txn, item_uuid).await? else {
            return Ok(());
        };
        let Some(plate) = assets::Entity::find_by_id(mapping.resource_id).one(&txn).await? else {
            return Ok(());
        };
        if plate.plate_purpose == Some(PlatePurpose::StockPlate) {
            return Ok(());
        }

        let well_ids: Vec<i32> = container_associations::Entity::find()
            .filter(container_associations::Column::ContainerId.eq(plate.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|association| association.content_id)
            .collect();

        aliquots::Entity::delete_many()
            .filter(aliquots::Column::ReceptacleId.is_in(well_ids.clone()))
            .exec(&txn)
            .await?;
        assets::Entity::delete_many()
            .filter(assets::Column::Id.is_in(well_ids))
            .exec(&txn)
            .await?;
        container_associations::Entity::delete_many()
            .filter(container_associations::Column::ContainerId.eq(plate.id))
            .exec(&txn)
            .await?;
        assets::Entity::delete_by_id(plate.id).exec(&txn).await?;
        uuids::Entity::delete_by_id(mapping.id).exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Replaces the aliquot-to-sample linkage for every populated well
    /// location of a transferred plate.
    ///
    /// # Errors
    ///
    /// [`SyncError::PlateNotFound`] when the target plate has no
    /// mapping: transfers never implicitly create plates.
    pub async fn update_aliquots(&self, external_uuid: Uuid, wells: &Plate) -> SyncResult<()> {
        let txn = self.db.begin().await?;

        let Some(mapping) = find_mapping(&txn, external_uuid).await? else {
            return Err(SyncError::PlateNotFound(external_uuid));
        };

        let wells_by_location = plate_wells_by_location(&txn, mapping.resource_id).await?;

        for (location, incoming) in &wells.wells {
            let well_id = wells_by_location.get(location).copied().ok_or_else(|| {
                DbErr::RecordNotFound(format!(
                    "plate {external_uuid} has no well at location {location}"
                ))
            })?;

            aliquots::Entity::delete_many()
                .filter(aliquots::Column::ReceptacleId.eq(well_id))
                .exec(&txn)
                .await?;
            for aliquot in incoming {
                aliquots::ActiveModel {
                    receptacle_id: Set(well_id),
                    sample_uuid: Set(aliquot.sample),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    /// Looks up the plate asset mapped to an external UUID, if any.
    pub async fn plate_by_uuid(&self, external_uuid: Uuid) -> SyncResult<Option<assets::Model>> {
        let Some(mapping) = uuids::Entity::find()
            .filter(uuids::Column::ExternalId.eq(external_uuid))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        Ok(assets::Entity::find_by_id(mapping.resource_id)
            .one(&self.db)
            .await?)
    }
}

async fn find_mapping(
    txn: &sea_orm::DatabaseTransaction,
    external_uuid: Uuid,
) -> Result<Option<uuids::Model>, DbErr> {
    uuids::Entity::find()
        .filter(uuids::Column::ExternalId.eq(external_uuid))
        .one(txn)
        .await
}

/// Resolves a plate's wells into a location -> well asset id map via
/// their container associations and map descriptions.
async fn plate_wells_by_location(
    txn: &sea_orm::DatabaseTransaction,
    plate_id: i32,
) -> Result<HashMap<String, i32>, DbErr> {
    let associations = container_associations::Entity::find()
        .filter(container_associations::Column::ContainerId.eq(plate_id))
        .all(txn)
        .await?;

    let mut wells = HashMap::with_capacity(associations.len());
    for association in associations {
        let Some(well) = assets::Entity::find_by_id(association.content_id)
            .one(txn)
            .await?
        else {
            continue;
        };
        let Some(map_id) = well.map_id else {
            continue;
        };
        if let Some(map) = maps::Entity::find_by_id(map_id).one(txn).await? {
            wells.insert(map.description, well.id);
        }
    }
    Ok(wells)
}
