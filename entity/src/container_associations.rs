use sea_orm::entity::prelude::*;

/// Links a container asset (plate) to a content asset (well).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "container_associations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub container_id: i32,
    pub content_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assets::Entity",
        from = "Column::ContainerId",
        to = "super::assets::Column::Id"
    )]
    Container,
    #[sea_orm(
        belongs_to = "super::assets::Entity",
        from = "Column::ContentId",
        to = "super::assets::Column::Id"
    )]
    Content,
}

impl ActiveModelBehavior for ActiveModel {}
