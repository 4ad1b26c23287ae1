use sea_orm::entity::prelude::*;

/// Maps an externally issued UUID to an internal asset id. This is the
/// only join point between upstream identity and store identity.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "uuids")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub resource_type: String,
    pub resource_id: i32,
    #[sea_orm(unique)]
    pub external_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
