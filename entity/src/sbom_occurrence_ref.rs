use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sbom_occurrence_refs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub occurrence_id: i64,
    pub tracked_context_id: i64,
    pub pipeline_id: i64,
    pub project_id: i64,
    pub commit_sha: String,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sbom_occurrence::Entity",
        from = "Column::OccurrenceId",
        to = "super::sbom_occurrence::Column::Id"
    )]
    Occurrence,
    #[sea_orm(
        belongs_to = "super::sbom_tracked_context::Entity",
        from = "Column::TrackedContextId",
        to = "super::sbom_tracked_context::Column::Id"
    )]
    TrackedContext,
}

impl Related<super::sbom_occurrence::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Occurrence.def()
    }
}

impl Related<super::sbom_tracked_context::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackedContext.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
