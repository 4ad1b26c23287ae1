use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Assets table: plates and wells share one table, discriminated by
        // sti_type. Only plates carry a purpose; only wells carry a map_id.
        manager
            .create_table(
                Table::create()
                    .table(Assets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assets::StiType).string_len(8).not_null())
                    .col(ColumnDef::new(Assets::PlatePurpose).string_len(16))
                    .col(ColumnDef::new(Assets::MapId).integer())
                    .col(
                        ColumnDef::new(Assets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContainerAssociations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContainerAssociations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ContainerAssociations::ContainerId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContainerAssociations::ContentId)
                            .integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Maps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Maps::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Maps::Description).string_len(8).not_null())
                    .col(ColumnDef::new(Maps::AssetSize).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Uuids::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Uuids::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Uuids::ResourceType).string_len(32).not_null())
                    .col(ColumnDef::new(Uuids::ResourceId).integer().not_null())
                    .col(ColumnDef::new(Uuids::ExternalId).uuid().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Aliquots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Aliquots::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Aliquots::ReceptacleId).integer().not_null())
                    .col(ColumnDef::new(Aliquots::SampleUuid).uuid())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_uuids_external_id")
                    .table(Uuids::Table)
                    .col(Uuids::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_maps_description_asset_size")
                    .table(Maps::Table)
                    .col(Maps::Description)
                    .col(Maps::AssetSize)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_container_associations_container_id")
                    .table(ContainerAssociations::Table)
                    .col(ContainerAssociations::ContainerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_aliquots_receptacle_id")
                    .table(Aliquots::Table)
                    .col(Aliquots::ReceptacleId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Aliquots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Uuids::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Maps::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContainerAssociations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Assets {
    Table,
    Id,
    StiType,
    PlatePurpose,
    MapId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ContainerAssociations {
    Table,
    Id,
    ContainerId,
    ContentId,
}

#[derive(DeriveIden)]
enum Maps {
    Table,
    Id,
    Description,
    AssetSize,
}

#[derive(DeriveIden)]
enum Uuids {
    Table,
    Id,
    ResourceType,
    ResourceId,
    ExternalId,
}

#[derive(DeriveIden)]
enum Aliquots {
    Table,
    Id,
    ReceptacleId,
    SampleUuid,
}
