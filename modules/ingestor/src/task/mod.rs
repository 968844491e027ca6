//! The stages of an ingestion, and the primitives they share.
//!
//! Every task reads some fields of the occurrence maps and writes others. Writes go to the
//! database in bulk, one statement per chunk, never one per map.

mod ingest_component_versions;
mod ingest_components;
mod ingest_occurrence_refs;
mod ingest_occurrences;
mod ingest_occurrences_vulnerabilities;
mod ingest_source_packages;
mod ingest_sources;
mod update_security_policy_dismissals;
pub mod validate;

pub use ingest_component_versions::IngestComponentVersions;
pub use ingest_components::{component_uuid, IngestComponents};
pub use ingest_occurrence_refs::{IngestOccurrenceRefs, RefsOutcome};
pub use ingest_occurrences::{occurrence_uuid, IngestOccurrences};
pub use ingest_occurrences_vulnerabilities::{IngestOccurrencesVulnerabilities, LinksOutcome};
pub use ingest_source_packages::IngestSourcePackages;
pub use ingest_sources::IngestSources;
pub use update_security_policy_dismissals::UpdateSecurityPolicyDismissals;

use crate::{
    error::{ConfigError, Error},
    model::{Field, OccurrenceMap, PipelineContext},
};
use itertools::Itertools;
use sbomgraph_common::db::chunk::EntityChunkedIter;
use sea_orm::{
    sea_query::{OnConflict, ValueType},
    ActiveModelTrait, ActiveValue, ConnectionTrait, EntityTrait, IdenStatic, IntoActiveModel,
    ModelTrait, Value,
};
use std::{collections::HashMap, future::Future};
use tracing::instrument;

pub trait Task {
    const NAME: &'static str;
    /// The occurrence map fields the task reads.
    const READS: &'static [Field];
    /// The occurrence map fields the task writes. No two tasks write the same field.
    const WRITES: &'static [Field];

    type Output;

    fn execute<C: ConnectionTrait>(
        &self,
        db: &C,
        pipeline: &PipelineContext,
        maps: &mut Vec<OccurrenceMap>,
    ) -> impl Future<Output = Result<Self::Output, Error>>;
}

/// How a task writes one entity.
///
/// `unique_by` is the conflict target of upserts and what returned rows are paired with
/// occurrence maps by. Returned rows are projected on the `uses` columns, which therefore
/// must contain all `unique_by` columns.
#[derive(Clone, Debug)]
pub struct TaskDescriptor<E: EntityTrait> {
    task: &'static str,
    unique_by: Vec<E::Column>,
    uses: Vec<E::Column>,
    update: Vec<E::Column>,
}

impl<E: EntityTrait> TaskDescriptor<E> {
    pub fn new(
        task: &'static str,
        unique_by: impl IntoIterator<Item = E::Column>,
        uses: impl IntoIterator<Item = E::Column>,
    ) -> Result<Self, ConfigError> {
        let unique_by = unique_by.into_iter().collect::<Vec<_>>();
        let uses = uses.into_iter().collect::<Vec<_>>();

        if let Some(column) = unique_by
            .iter()
            .find(|column| !contains::<E>(&uses, **column))
        {
            return Err(ConfigError::UniqueByNotInUses {
                task,
                column: column.as_str().to_string(),
            });
        }

        Ok(Self {
            task,
            unique_by,
            uses,
            update: vec![],
        })
    }

    /// The columns an upsert overwrites on conflict.
    pub fn with_update(mut self, update: impl IntoIterator<Item = E::Column>) -> Self {
        self.update = update.into_iter().collect();
        self
    }

    /// Insert objects, silently skipping those conflicting with existing rows.
    ///
    /// Returns the rows which were written. When the descriptor has `unique_by` columns the
    /// rows are in the order of the objects.
    #[instrument(skip_all, fields(task = self.task, objects = objects.len()), err)]
    pub async fn bulk_insert<C, A>(&self, db: &C, objects: Vec<A>) -> Result<Vec<Row<E>>, Error>
    where
        C: ConnectionTrait,
        A: ActiveModelTrait<Entity = E> + Send,
        E::Model: IntoActiveModel<A>,
    {
        let on_conflict = match self.unique_by.is_empty() {
            true => None,
            false => Some(
                OnConflict::columns(self.unique_by.iter().copied())
                    .do_nothing()
                    .to_owned(),
            ),
        };

        self.write(db, objects, on_conflict).await
    }

    /// Insert objects, updating the declared columns of rows which already exist.
    ///
    /// Returns one row per distinct object, in the order of the objects.
    #[instrument(skip_all, fields(task = self.task, objects = objects.len()), err)]
    pub async fn bulk_upsert<C, A>(&self, db: &C, objects: Vec<A>) -> Result<Vec<Row<E>>, Error>
    where
        C: ConnectionTrait,
        A: ActiveModelTrait<Entity = E> + Send,
        E::Model: IntoActiveModel<A>,
    {
        if self.unique_by.is_empty() {
            return Err(ConfigError::MissingUniqueBy { task: self.task }.into());
        }

        // an update is required for conflicting rows to be returned
        let update = match self.update.is_empty() {
            true => &self.unique_by,
            false => &self.update,
        };
        let on_conflict = OnConflict::columns(self.unique_by.iter().copied())
            .update_columns(update.iter().copied())
            .to_owned();

        self.write(db, objects, Some(on_conflict)).await
    }

    async fn write<C, A>(
        &self,
        db: &C,
        objects: Vec<A>,
        on_conflict: Option<OnConflict>,
    ) -> Result<Vec<Row<E>>, Error>
    where
        C: ConnectionTrait,
        A: ActiveModelTrait<Entity = E> + Send,
        E::Model: IntoActiveModel<A>,
    {
        // a single statement must not affect the same row twice
        let objects = self.unique_objects(objects);
        let order = objects
            .iter()
            .enumerate()
            .map(|(index, object)| (self.object_key(object), index))
            .collect::<HashMap<_, _>>();

        let batches = objects
            .chunked()
            .into_iter()
            .map(|batch| batch.collect::<Vec<_>>())
            .collect::<Vec<_>>();

        let mut rows = Vec::with_capacity(order.len());

        for batch in batches {
            let mut insert = E::insert_many(batch);
            if let Some(on_conflict) = &on_conflict {
                insert = insert.on_conflict(on_conflict.clone());
            }

            for model in insert.exec_with_returning_many(db).await? {
                rows.push(Row::project(&model, &self.uses));
            }
        }

        if !self.unique_by.is_empty() {
            rows.sort_by_cached_key(|row| {
                order
                    .get(&self.row_key(row))
                    .copied()
                    .unwrap_or(usize::MAX)
            });
        }

        log::debug!("{}: wrote {} row(s)", self.task, rows.len());

        Ok(rows)
    }

    /// Drop objects sharing their `unique_by` values with a preceding one.
    pub fn unique_objects<A>(&self, objects: Vec<A>) -> Vec<A>
    where
        A: ActiveModelTrait<Entity = E>,
    {
        if self.unique_by.is_empty() {
            return objects;
        }

        objects
            .into_iter()
            .unique_by(|object| self.object_key(object))
            .collect()
    }

    /// Call `f` for every occurrence map with the row written for its object.
    ///
    /// `pending` holds the objects with the index of the map they were built from. Maps and
    /// rows are paired by their `unique_by` values, so every map sharing a key receives the
    /// same row. Maps whose object was not written are left alone.
    pub fn each_pair<A, F>(
        &self,
        maps: &mut [OccurrenceMap],
        pending: &[(usize, A)],
        rows: &[Row<E>],
        mut f: F,
    ) -> Result<(), Error>
    where
        A: ActiveModelTrait<Entity = E>,
        F: FnMut(&mut OccurrenceMap, &Row<E>) -> Result<(), Error>,
    {
        if self.unique_by.is_empty() {
            return Err(ConfigError::MissingUniqueBy { task: self.task }.into());
        }

        let rows = rows
            .iter()
            .map(|row| (self.row_key(row), row))
            .collect::<HashMap<_, _>>();

        for (index, object) in pending {
            let Some(row) = rows.get(&self.object_key(object)) else {
                continue;
            };
            if let Some(map) = maps.get_mut(*index) {
                f(map, row)?;
            }
        }

        Ok(())
    }

    fn object_key<A>(&self, object: &A) -> String
    where
        A: ActiveModelTrait<Entity = E>,
    {
        self.unique_by
            .iter()
            .map(|column| match object.get(*column).into_value() {
                Some(value) => format!("{value:?}"),
                None => "-".to_string(),
            })
            .join("|")
    }

    fn row_key(&self, row: &Row<E>) -> String {
        self.unique_by
            .iter()
            .map(|column| match row.get(*column) {
                Some(value) => format!("{value:?}"),
                None => "-".to_string(),
            })
            .join("|")
    }

    /// Fetch a value of a returned row.
    pub fn value<T: ValueType>(&self, row: &Row<E>, column: E::Column) -> Result<T, Error> {
        match row.get(column) {
            Some(value) => Ok(<T as ValueType>::try_from(value.clone())?),
            None => Err(ConfigError::ColumnNotInUses {
                task: self.task,
                column: column.as_str().to_string(),
            }
            .into()),
        }
    }
}

/// A written row, projected on the columns a task uses.
#[derive(Clone, Debug)]
pub struct Row<E: EntityTrait> {
    values: Vec<(E::Column, Value)>,
}

impl<E: EntityTrait> Row<E> {
    fn project(model: &E::Model, columns: &[E::Column]) -> Self {
        Self {
            values: columns
                .iter()
                .map(|column| (*column, model.get(*column)))
                .collect(),
        }
    }

    pub fn get(&self, column: E::Column) -> Option<&Value> {
        self.values
            .iter()
            .find(|(c, _)| c.as_str() == column.as_str())
            .map(|(_, value)| value)
    }
}

/// The value of an active model field, unless it is not set.
pub(crate) fn active<V: Into<Value>>(value: &ActiveValue<V>) -> Option<&V> {
    match value {
        ActiveValue::Set(value) | ActiveValue::Unchanged(value) => Some(value),
        ActiveValue::NotSet => None,
    }
}

fn contains<E: EntityTrait>(columns: &[E::Column], column: E::Column) -> bool {
    columns.iter().any(|c| c.as_str() == column.as_str())
}

#[cfg(test)]
mod test {
    use super::*;
    use sbomgraph_entity::sbom_component;
    use sea_orm::ActiveValue::Set;

    fn component(name: &str) -> sbom_component::ActiveModel {
        sbom_component::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn unique_by_must_be_used() {
        let result = TaskDescriptor::<sbom_component::Entity>::new(
            "test",
            [sbom_component::Column::Uuid],
            [sbom_component::Column::Id],
        );

        assert_eq!(
            result.err(),
            Some(ConfigError::UniqueByNotInUses {
                task: "test",
                column: "uuid".into()
            })
        );
    }

    #[test]
    fn pairing_requires_unique_by() {
        let descriptor = TaskDescriptor::<sbom_component::Entity>::new(
            "test",
            [],
            [sbom_component::Column::Id],
        )
        .unwrap();

        let pending: Vec<(usize, sbom_component::ActiveModel)> = vec![];
        let result = descriptor.each_pair(&mut [], &pending, &[], |_, _| Ok(()));

        assert!(matches!(
            result,
            Err(Error::Configuration(ConfigError::MissingUniqueBy { task: "test" }))
        ));
    }

    #[test]
    fn unique_objects_keep_first() {
        let descriptor = TaskDescriptor::<sbom_component::Entity>::new(
            "test",
            [sbom_component::Column::Name],
            [sbom_component::Column::Id, sbom_component::Column::Name],
        )
        .unwrap();

        let objects = descriptor.unique_objects(vec![
            component("rack"),
            component("rails"),
            component("rack"),
        ]);

        let names = objects
            .iter()
            .map(|object| object.name.clone().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["rack", "rails"]);
    }

    #[test]
    fn value_of_unused_column() {
        let descriptor = TaskDescriptor::<sbom_component::Entity>::new(
            "test",
            [],
            [sbom_component::Column::Id],
        )
        .unwrap();
        let row = Row::<sbom_component::Entity> {
            values: vec![(sbom_component::Column::Id, Value::BigInt(Some(7)))],
        };

        assert_eq!(
            descriptor.value::<i64>(&row, sbom_component::Column::Id).unwrap(),
            7
        );
        assert!(matches!(
            descriptor.value::<String>(&row, sbom_component::Column::Name),
            Err(Error::Configuration(ConfigError::ColumnNotInUses { .. }))
        ));
    }
}
