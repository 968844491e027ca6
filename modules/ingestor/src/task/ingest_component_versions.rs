use super::{validate::filter_invalid_objects, Task, TaskDescriptor};
use crate::{
    error::{ConfigError, Error},
    model::{Field, OccurrenceMap, PipelineContext},
};
use sbomgraph_entity::sbom_component_version::{self, Column};
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use time::OffsetDateTime;
use tracing::instrument;

/// Resolve the component version of occurrence maps reporting a version.
pub struct IngestComponentVersions {
    descriptor: TaskDescriptor<sbom_component_version::Entity>,
}

impl IngestComponentVersions {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            descriptor: TaskDescriptor::new(
                Self::NAME,
                [Column::ComponentId, Column::Version],
                [Column::Id, Column::ComponentId, Column::Version],
            )?
            .with_update([Column::UpdatedAt]),
        })
    }
}

impl Task for IngestComponentVersions {
    const NAME: &'static str = "IngestComponentVersions";
    const READS: &'static [Field] = &[Field::ReportComponent, Field::ComponentId];
    const WRITES: &'static [Field] = &[Field::ComponentVersionId];

    type Output = ();

    #[instrument(skip_all, fields(maps = maps.len()), err)]
    async fn execute<C: ConnectionTrait>(
        &self,
        db: &C,
        _pipeline: &PipelineContext,
        maps: &mut Vec<OccurrenceMap>,
    ) -> Result<(), Error> {
        let now = OffsetDateTime::now_utc();

        let pending = maps
            .iter()
            .enumerate()
            .filter_map(|(index, map)| {
                let object = sbom_component_version::ActiveModel {
                    component_id: Set(map.component_id?),
                    version: Set(map.version()?.to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                Some((index, object))
            })
            .collect::<Vec<_>>();

        if pending.is_empty() {
            return Ok(());
        }

        let pending = filter_invalid_objects(Self::NAME, pending);
        let objects = pending
            .iter()
            .map(|(_, object)| object.clone())
            .collect::<Vec<_>>();

        let rows = self.descriptor.bulk_upsert(db, objects).await?;

        self.descriptor.each_pair(maps, &pending, &rows, |map, row| {
            map.component_version_id = Some(self.descriptor.value(row, Column::Id)?);
            Ok(())
        })
    }
}
