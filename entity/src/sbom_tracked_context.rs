use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// The maximum number of refs a project may track.
pub const MAX_CONTEXTS_PER_PROJECT: u64 = 16;

/// A branch or tag a project associates SBOM data with.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sbom_tracked_contexts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub project_id: i64,
    pub context_name: String,
    pub context_type: ContextType,
    pub is_default: bool,
    pub created_at: OffsetDateTime,
}

#[derive(
    Copy,
    Clone,
    Debug,
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
pub enum ContextType {
    Branch = 1,
    Tag = 2,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sbom_occurrence_ref::Entity")]
    Refs,
}

impl Related<super::sbom_occurrence_ref::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Refs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
