use super::{validate::filter_invalid_objects, Task, TaskDescriptor};
use crate::{
    error::{ConfigError, Error},
    model::{Field, OccurrenceMap, PipelineContext},
};
use sbomgraph_entity::sbom_source_package::{self, Column};
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use time::OffsetDateTime;
use tracing::instrument;

/// Resolve the source package of operating system components.
pub struct IngestSourcePackages {
    descriptor: TaskDescriptor<sbom_source_package::Entity>,
}

impl IngestSourcePackages {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            descriptor: TaskDescriptor::new(
                Self::NAME,
                [Column::Name, Column::PurlType],
                [Column::Id, Column::Name, Column::PurlType],
            )?
            .with_update([Column::UpdatedAt]),
        })
    }
}

impl Task for IngestSourcePackages {
    const NAME: &'static str = "IngestSourcePackages";
    const READS: &'static [Field] = &[Field::ReportComponent];
    const WRITES: &'static [Field] = &[Field::SourcePackageId];

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
                let component = &map.report_component;
                let object = sbom_source_package::ActiveModel {
                    name: Set(component.source_package_name.clone()?),
                    purl_type: Set(component.purl_type()?.to_string()),
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
            map.source_package_id = Some(self.descriptor.value(row, Column::Id)?);
            Ok(())
        })
    }
}
