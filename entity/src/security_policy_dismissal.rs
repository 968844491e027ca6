use sea_orm::{entity::prelude::*, FromJsonQueryResult};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// A dismissed license policy violation, scoped to a merge request.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "security_policy_dismissals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub project_id: i64,
    pub merge_request_id: Option<i64>,
    #[sea_orm(column_type = "JsonBinary")]
    pub licenses: DismissedLicenses,
    #[sea_orm(column_type = "JsonBinary")]
    pub license_occurrence_uuids: OccurrenceUuids,
    pub updated_at: OffsetDateTime,
}

/// License name to the names of the components the violation was dismissed for.
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
pub struct DismissedLicenses(pub BTreeMap<String, Vec<String>>);

impl DismissedLicenses {
    /// Check if `component` was dismissed for the license named `license`.
    pub fn covers(&self, license: &str, component: &str) -> bool {
        self.0
            .get(license)
            .is_some_and(|components| components.iter().any(|c| c == component))
    }
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
pub struct OccurrenceUuids(pub Vec<String>);

impl OccurrenceUuids {
    /// Add a uuid, unless already present. Returns `true` if it was added.
    pub fn add(&mut self, uuid: impl Into<String>) -> bool {
        let uuid = uuid.into();
        if self.0.contains(&uuid) {
            false
        } else {
            self.0.push(uuid);
            true
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn covers_license_and_component() {
        let licenses = DismissedLicenses(BTreeMap::from([(
            "MIT License".to_string(),
            vec!["rack".to_string()],
        )]));

        assert!(licenses.covers("MIT License", "rack"));
        assert!(!licenses.covers("MIT License", "rails"));
        assert!(!licenses.covers("Apache License 2.0", "rack"));
    }

    #[test]
    fn add_deduplicates() {
        let mut uuids = OccurrenceUuids::default();
        assert!(uuids.add("a"));
        assert!(!uuids.add("a"));
        assert!(uuids.add("b"));
        assert_eq!(uuids.0, vec!["a", "b"]);
    }
}
