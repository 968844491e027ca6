use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sbom_occurrences_vulnerabilities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub occurrence_id: i64,
    pub vulnerability_id: i64,
    pub project_id: i64,
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
        belongs_to = "super::vulnerability::Entity",
        from = "Column::VulnerabilityId",
        to = "super::vulnerability::Column::Id"
    )]
    Vulnerability,
}

impl Related<super::sbom_occurrence::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Occurrence.def()
    }
}

impl Related<super::vulnerability::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vulnerability.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
