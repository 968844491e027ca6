use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sbom_components")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Derived from name, purl type and component type, the conflict target of the upsert.
    #[sea_orm(unique)]
    pub uuid: Uuid,
    pub name: String,
    pub purl_type: Option<String>,
    pub component_type: ComponentType,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComponentType {
    #[default]
    Library = 0,
    Application = 1,
    Container = 2,
    Framework = 3,
    OperatingSystem = 4,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sbom_component_version::Entity")]
    Versions,
    #[sea_orm(has_many = "super::sbom_occurrence::Entity")]
    Occurrences,
}

impl Related<super::sbom_component_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Versions.def()
    }
}

impl Related<super::sbom_occurrence::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Occurrences.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
