use sea_orm::entity::prelude::*;

/// Single-table-inheritance discriminator for the assets table.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum AssetType {
    #[sea_orm(string_value = "Plate")]
    Plate,
    #[sea_orm(string_value = "Well")]
    Well,
}

/// Purpose of a plate asset. `Unassigned` is provisional; `StockPlate`
/// is terminal and never transitions back.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PlatePurpose {
    #[sea_orm(string_value = "Unassigned")]
    Unassigned,
    #[sea_orm(string_value = "StockPlate")]
    StockPlate,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub sti_type: AssetType,
    pub plate_purpose: Option<PlatePurpose>,
    pub map_id: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::maps::Entity",
        from = "Column::MapId",
        to = "super::maps::Column::Id"
    )]
    Maps,
}

impl Related<super::maps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Maps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
