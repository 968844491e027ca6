use super::{Task, TaskDescriptor};
use crate::{
    error::{ConfigError, Error},
    model::{Field, OccurrenceMap, PipelineContext},
    service::VulnerabilityIndex,
};
use sbomgraph_common::db::chunk::chunked_with;
use sbomgraph_entity::sbom_occurrences_vulnerability::{self, Column};
use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::Arc,
};
use time::OffsetDateTime;
use tracing::instrument;

/// Link occurrences with their vulnerabilities, removing links which no longer apply.
pub struct IngestOccurrencesVulnerabilities {
    descriptor: TaskDescriptor<sbom_occurrences_vulnerability::Entity>,
    index: Arc<dyn VulnerabilityIndex>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinksOutcome {
    pub created: usize,
    pub deleted: usize,
}

impl IngestOccurrencesVulnerabilities {
    pub fn new(index: Arc<dyn VulnerabilityIndex>) -> Result<Self, ConfigError> {
        Ok(Self {
            descriptor: TaskDescriptor::new(
                Self::NAME,
                [Column::OccurrenceId, Column::VulnerabilityId],
                [Column::Id, Column::OccurrenceId, Column::VulnerabilityId],
            )?
            .with_update([Column::ProjectId]),
            index,
        })
    }
}

impl Task for IngestOccurrencesVulnerabilities {
    const NAME: &'static str = "IngestOccurrencesVulnerabilities";
    const READS: &'static [Field] = &[Field::OccurrenceId, Field::VulnerabilityIds];
    const WRITES: &'static [Field] = &[];

    type Output = LinksOutcome;

    #[instrument(skip_all, fields(project = pipeline.project.id, maps = maps.len()), err)]
    async fn execute<C: ConnectionTrait>(
        &self,
        db: &C,
        pipeline: &PipelineContext,
        maps: &mut Vec<OccurrenceMap>,
    ) -> Result<LinksOutcome, Error> {
        // the vulnerabilities of every occurrence processed in this run

        let mut wanted = BTreeMap::<i64, BTreeSet<i64>>::new();
        for map in maps.iter() {
            if let Some(occurrence_id) = map.occurrence_id {
                wanted
                    .entry(occurrence_id)
                    .or_default()
                    .extend(map.vulnerability_ids.iter().copied());
            }
        }

        if wanted.is_empty() {
            return Ok(LinksOutcome::default());
        }

        let existing = existing(db, wanted.keys().copied().collect()).await?;

        // links to create

        let known = existing
            .iter()
            .map(|link| (link.occurrence_id, link.vulnerability_id))
            .collect::<HashSet<_>>();

        let now = OffsetDateTime::now_utc();
        let mut created = BTreeSet::new();
        let mut links_created = 0;
        let mut objects = Vec::new();

        for (occurrence_id, vulnerability_ids) in &wanted {
            for vulnerability_id in vulnerability_ids {
                if !known.contains(&(*occurrence_id, *vulnerability_id)) {
                    created.insert(*vulnerability_id);
                    links_created += 1;
                }

                objects.push(sbom_occurrences_vulnerability::ActiveModel {
                    occurrence_id: Set(*occurrence_id),
                    vulnerability_id: Set(*vulnerability_id),
                    project_id: Set(pipeline.project.id),
                    created_at: Set(now),
                    ..Default::default()
                });
            }
        }

        self.descriptor.bulk_upsert(db, objects).await?;

        // links which no longer apply, other occurrences keep theirs

        let stale = existing
            .iter()
            .filter(|link| {
                !wanted
                    .get(&link.occurrence_id)
                    .is_some_and(|ids| ids.contains(&link.vulnerability_id))
            })
            .collect::<Vec<_>>();

        let deleted = stale
            .iter()
            .map(|link| link.vulnerability_id)
            .collect::<BTreeSet<_>>();

        let batches = chunked_with(1, stale.iter().map(|link| link.id))
            .into_iter()
            .map(|batch| batch.collect::<Vec<_>>())
            .collect::<Vec<_>>();
        for batch in batches {
            sbom_occurrences_vulnerability::Entity::delete_many()
                .filter(Column::Id.is_in(batch))
                .exec(db)
                .await?;
        }

        // sync the search index, once

        let affected = created.union(&deleted).copied().collect::<Vec<_>>();
        if !affected.is_empty() {
            log::debug!("re-indexing {} vulnerabilities", affected.len());
            self.index.enqueue(affected);
        }

        Ok(LinksOutcome {
            created: links_created,
            deleted: stale.len(),
        })
    }
}

async fn existing<C: ConnectionTrait>(
    db: &C,
    occurrence_ids: Vec<i64>,
) -> Result<Vec<sbom_occurrences_vulnerability::Model>, Error> {
    let batches = chunked_with(1, occurrence_ids)
        .into_iter()
        .map(|batch| batch.collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut result = Vec::new();
    for batch in batches {
        result.extend(
            sbom_occurrences_vulnerability::Entity::find()
                .filter(Column::OccurrenceId.is_in(batch))
                .all(db)
                .await?,
        );
    }

    Ok(result)
}
