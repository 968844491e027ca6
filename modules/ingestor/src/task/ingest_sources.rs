use super::{Task, TaskDescriptor};
use crate::{
    error::{ConfigError, Error},
    model::{Field, OccurrenceMap, PipelineContext},
};
use sbomgraph_entity::sbom_source::{self, Column};
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use time::OffsetDateTime;
use tracing::instrument;

/// Resolve the source of occurrence maps carrying a report source.
pub struct IngestSources {
    descriptor: TaskDescriptor<sbom_source::Entity>,
}

impl IngestSources {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            descriptor: TaskDescriptor::new(
                Self::NAME,
                [Column::SourceType, Column::Fingerprint],
                [Column::Id, Column::SourceType, Column::Fingerprint],
            )?
            .with_update([Column::Details, Column::UpdatedAt]),
        })
    }
}

impl Task for IngestSources {
    const NAME: &'static str = "IngestSources";
    const READS: &'static [Field] = &[Field::ReportSource];
    const WRITES: &'static [Field] = &[Field::SourceId];

    type Output = ();

    #[instrument(skip_all, fields(maps = maps.len()), err)]
    async fn execute<C: ConnectionTrait>(
        &self,
        db: &C,
        _pipeline: &PipelineContext,
        maps: &mut Vec<OccurrenceMap>,
    ) -> Result<(), Error> {
        let now = OffsetDateTime::now_utc();

        let mut pending = Vec::new();
        for (index, map) in maps.iter().enumerate() {
            let Some(source) = &map.report_source else {
                continue;
            };

            let object = sbom_source::ActiveModel {
                source_type: Set(source.source_type),
                fingerprint: Set(source.fingerprint()?),
                details: Set(source.details()),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            pending.push((index, object));
        }

        if pending.is_empty() {
            return Ok(());
        }

        let objects = pending
            .iter()
            .map(|(_, object)| object.clone())
            .collect::<Vec<_>>();

        let rows = self.descriptor.bulk_upsert(db, objects).await?;

        self.descriptor.each_pair(maps, &pending, &rows, |map, row| {
            map.source_id = Some(self.descriptor.value(row, Column::Id)?);
            Ok(())
        })
    }
}
