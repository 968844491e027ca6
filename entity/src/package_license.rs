use crate::license::Licenses;
use sea_orm::entity::prelude::*;

/// Known licenses of a package, optionally for one version only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "package_licenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub purl_type: String,
    pub name: String,
    /// `None` applies to every version lacking a version specific entry.
    pub version: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub licenses: Licenses,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
