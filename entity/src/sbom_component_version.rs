use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sbom_component_versions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub component_id: i64,
    pub version: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sbom_component::Entity",
        from = "Column::ComponentId",
        to = "super::sbom_component::Column::Id"
    )]
    Component,
}

impl Related<super::sbom_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Component.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
