use sea_orm::entity::prelude::*;

/// Contents of a receptacle (well asset), optionally linked to a sample.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "aliquots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub receptacle_id: i32,
    pub sample_uuid: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assets::Entity",
        from = "Column::ReceptacleId",
        to = "super::assets::Column::Id"
    )]
    Receptacle,
}

impl ActiveModelBehavior for ActiveModel {}
