use crate::{license::Licenses, vulnerability::Severity};
use sea_orm::{entity::prelude::*, FromJsonQueryResult};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sbom_occurrences")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Derived from project, component, component version and source.
    #[sea_orm(unique)]
    pub uuid: Uuid,
    pub project_id: i64,
    pub pipeline_id: i64,
    pub commit_sha: String,
    pub component_id: i64,
    pub component_version_id: Option<i64>,
    pub source_id: Option<i64>,
    pub source_package_id: Option<i64>,
    pub component_name: String,
    pub input_file_path: Option<String>,
    pub package_manager: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub licenses: Licenses,
    #[sea_orm(column_type = "JsonBinary")]
    pub ancestors: Ancestors,
    #[sea_orm(column_type = "JsonBinary")]
    pub traversal_ids: TraversalIds,
    pub archived: bool,
    pub vulnerability_count: i32,
    pub highest_severity: Option<Severity>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A component which (transitively) pulled in the component of an occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Ancestor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    FromJsonQueryResult,
)]
pub struct Ancestors(pub Vec<Ancestor>);

/// The namespace hierarchy of the project, root first.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    FromJsonQueryResult,
)]
pub struct TraversalIds(pub Vec<i64>);

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sbom_component::Entity",
        from = "Column::ComponentId",
        to = "super::sbom_component::Column::Id"
    )]
    Component,
    #[sea_orm(has_many = "super::sbom_occurrences_vulnerability::Entity")]
    Vulnerabilities,
    #[sea_orm(has_many = "super::sbom_occurrence_ref::Entity")]
    Refs,
}

impl Related<super::sbom_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Component.def()
    }
}

impl Related<super::sbom_occurrences_vulnerability::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vulnerabilities.def()
    }
}

impl Related<super::sbom_occurrence_ref::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Refs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
