use sea_orm::entity::prelude::*;

/// A vulnerability detected in a project, maintained outside of the SBOM ingestion.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "vulnerabilities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub project_id: i64,
    pub latest_pipeline_id: i64,
    pub severity: Severity,
    /// The dependency file the vulnerable package was reported in.
    pub file: Option<String>,
    pub package_name: String,
    pub package_version: Option<String>,
}

/// Severity levels, in ascending order.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
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
pub enum Severity {
    Info = 1,
    Unknown = 2,
    Low = 4,
    Medium = 5,
    High = 6,
    Critical = 7,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sbom_occurrences_vulnerability::Entity")]
    Occurrences,
}

impl Related<super::sbom_occurrences_vulnerability::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Occurrences.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
