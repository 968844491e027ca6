use super::{active, validate::filter_invalid_objects, Task, TaskDescriptor};
use crate::{
    error::{ConfigError, Error},
    model::{Field, OccurrenceMap, PipelineContext, NAMESPACE},
    service::LicenseSource,
};
use sbomgraph_common::db::chunk::chunked_with;
use sbomgraph_entity::{
    license::Licenses,
    sbom_occurrence::{self, Ancestors, Column, TraversalIds},
    vulnerability::{self, Severity},
};
use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

/// Upsert the occurrence of every occurrence map with a resolved component.
///
/// Also derives the vulnerabilities of each occurrence, for the vulnerability links to be
/// reconciled by the next task.
pub struct IngestOccurrences {
    descriptor: TaskDescriptor<sbom_occurrence::Entity>,
    licenses: Arc<dyn LicenseSource>,
}

impl IngestOccurrences {
    pub fn new(licenses: Arc<dyn LicenseSource>) -> Result<Self, ConfigError> {
        Ok(Self {
            descriptor: TaskDescriptor::new(Self::NAME, [Column::Uuid], [Column::Id, Column::Uuid])?
                .with_update([
                    Column::ProjectId,
                    Column::PipelineId,
                    Column::CommitSha,
                    Column::ComponentId,
                    Column::ComponentVersionId,
                    Column::SourceId,
                    Column::SourcePackageId,
                    Column::ComponentName,
                    Column::InputFilePath,
                    Column::PackageManager,
                    Column::Licenses,
                    Column::Ancestors,
                    Column::TraversalIds,
                    Column::Archived,
                    Column::VulnerabilityCount,
                    Column::HighestSeverity,
                    Column::UpdatedAt,
                ]),
            licenses,
        })
    }
}

/// The id of an occurrence, derived from what identifies it.
pub fn occurrence_uuid(
    project_id: i64,
    component_id: i64,
    component_version_id: Option<i64>,
    source_id: Option<i64>,
) -> Uuid {
    let name = format!(
        "{project_id}-{component_id}-{}-{}",
        component_version_id.map(|id| id.to_string()).unwrap_or_default(),
        source_id.map(|id| id.to_string()).unwrap_or_default(),
    );
    Uuid::new_v5(&NAMESPACE, name.as_bytes())
}

/// The attributes which make a change of an occurrence visible through `updated_at`.
///
/// Pipeline and commit change with every run, and so are left out.
#[derive(PartialEq, Eq)]
struct Tracked<'a> {
    project_id: i64,
    component_id: i64,
    component_version_id: Option<i64>,
    source_id: Option<i64>,
    source_package_id: Option<i64>,
    component_name: &'a str,
    input_file_path: Option<&'a str>,
    package_manager: Option<&'a str>,
    licenses: &'a Licenses,
    ancestors: &'a Ancestors,
    traversal_ids: &'a TraversalIds,
    archived: bool,
    vulnerability_count: i32,
    highest_severity: Option<Severity>,
}

impl<'a> From<&'a sbom_occurrence::Model> for Tracked<'a> {
    fn from(model: &'a sbom_occurrence::Model) -> Self {
        Self {
            project_id: model.project_id,
            component_id: model.component_id,
            component_version_id: model.component_version_id,
            source_id: model.source_id,
            source_package_id: model.source_package_id,
            component_name: &model.component_name,
            input_file_path: model.input_file_path.as_deref(),
            package_manager: model.package_manager.as_deref(),
            licenses: &model.licenses,
            ancestors: &model.ancestors,
            traversal_ids: &model.traversal_ids,
            archived: model.archived,
            vulnerability_count: model.vulnerability_count,
            highest_severity: model.highest_severity,
        }
    }
}

/// Vulnerabilities of a pipeline, by what they are matched with occurrences on.
struct Vulnerabilities {
    by_package: HashMap<(Option<String>, String, Option<String>), Vec<(i64, Severity)>>,
}

impl Vulnerabilities {
    async fn load<C: ConnectionTrait>(db: &C, pipeline: &PipelineContext) -> Result<Self, Error> {
        let mut by_package: HashMap<_, Vec<_>> = HashMap::new();

        for vulnerability in vulnerability::Entity::find()
            .filter(vulnerability::Column::ProjectId.eq(pipeline.project.id))
            .filter(vulnerability::Column::LatestPipelineId.eq(pipeline.pipeline.id))
            .all(db)
            .await?
        {
            by_package
                .entry((
                    vulnerability.file,
                    vulnerability.package_name,
                    vulnerability.package_version,
                ))
                .or_default()
                .push((vulnerability.id, vulnerability.severity));
        }

        Ok(Self { by_package })
    }

    fn matching(&self, map: &OccurrenceMap) -> &[(i64, Severity)] {
        let key = (
            map.input_file_path().map(ToString::to_string),
            map.name().to_string(),
            map.version().map(ToString::to_string),
        );
        self.by_package
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Task for IngestOccurrences {
    const NAME: &'static str = "IngestOccurrences";
    const READS: &'static [Field] = &[
        Field::ReportComponent,
        Field::ReportSource,
        Field::ComponentId,
        Field::ComponentVersionId,
        Field::SourceId,
        Field::SourcePackageId,
    ];
    const WRITES: &'static [Field] = &[Field::Uuid, Field::OccurrenceId, Field::VulnerabilityIds];

    /// The occurrence ids, in the order of the maps.
    type Output = Vec<i64>;

    #[instrument(skip_all, fields(project = pipeline.project.id, pipeline = pipeline.pipeline.id, maps = maps.len()), err)]
    async fn execute<C: ConnectionTrait>(
        &self,
        db: &C,
        pipeline: &PipelineContext,
        maps: &mut Vec<OccurrenceMap>,
    ) -> Result<Vec<i64>, Error> {
        let project = &pipeline.project;
        let now = OffsetDateTime::now_utc();

        // identity, dropping maps which resolve to an already seen occurrence

        let mut seen = HashSet::new();
        maps.retain_mut(|map| {
            let Some(component_id) = map.component_id else {
                return true;
            };
            if map.version().is_some() && map.component_version_id.is_none() {
                // the version was dropped as invalid, so the identity can't be derived
                return true;
            }
            let uuid = occurrence_uuid(
                project.id,
                component_id,
                map.component_version_id,
                map.source_id,
            );
            map.uuid = Some(uuid);
            seen.insert(uuid)
        });

        // licenses, with a single lookup

        let identities = maps
            .iter()
            .filter(|map| map.uuid.is_some())
            .filter_map(OccurrenceMap::identity)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let licenses = match identities.is_empty() {
            true => HashMap::new(),
            false => self.licenses.licenses(&identities).await?,
        };

        // vulnerabilities

        let vulnerabilities = Vulnerabilities::load(db, pipeline).await?;

        let mut pending = Vec::new();
        for (index, map) in maps.iter_mut().enumerate() {
            let (Some(component_id), Some(uuid)) = (map.component_id, map.uuid) else {
                continue;
            };

            let matching = vulnerabilities.matching(map);
            map.vulnerability_ids = matching.iter().map(|(id, _)| *id).collect();
            let highest_severity = matching.iter().map(|(_, severity)| *severity).max();

            let component_licenses = map
                .identity()
                .and_then(|identity| licenses.get(&identity))
                .cloned()
                .unwrap_or_default();

            let object = sbom_occurrence::ActiveModel {
                uuid: Set(uuid),
                project_id: Set(project.id),
                pipeline_id: Set(pipeline.pipeline.id),
                commit_sha: Set(pipeline.pipeline.sha.clone()),
                component_id: Set(component_id),
                component_version_id: Set(map.component_version_id),
                source_id: Set(map.source_id),
                source_package_id: Set(map.source_package_id),
                component_name: Set(map.name().to_string()),
                input_file_path: Set(map.input_file_path().map(ToString::to_string)),
                package_manager: Set(map.package_manager().map(ToString::to_string)),
                licenses: Set(Licenses(component_licenses)),
                ancestors: Set(Ancestors(map.report_component.ancestors.clone())),
                traversal_ids: Set(TraversalIds(project.traversal_ids.clone())),
                archived: Set(project.archived),
                vulnerability_count: Set(vulnerability_count(map.vulnerability_ids.len())),
                highest_severity: Set(highest_severity),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            pending.push((index, object));
        }

        if pending.is_empty() {
            return Ok(vec![]);
        }

        // keep the timestamp of occurrences which did not change

        let uuids = pending
            .iter()
            .filter_map(|(index, _)| maps.get(*index).and_then(|map| map.uuid))
            .collect::<Vec<_>>();
        let existing = existing(db, uuids).await?;

        for (_, object) in &mut pending {
            let Some(current) = active(&object.uuid).and_then(|uuid| existing.get(uuid)) else {
                continue;
            };
            if unchanged(object, current) {
                object.updated_at = Set(current.updated_at);
            }
        }

        let pending = filter_invalid_objects(Self::NAME, pending);
        let objects = pending
            .iter()
            .map(|(_, object)| object.clone())
            .collect::<Vec<_>>();

        let rows = self.descriptor.bulk_upsert(db, objects).await?;

        self.descriptor.each_pair(maps, &pending, &rows, |map, row| {
            map.occurrence_id = Some(self.descriptor.value(row, Column::Id)?);
            Ok(())
        })?;

        log::info!(
            "ingested {} occurrence(s) for pipeline {}",
            rows.len(),
            pipeline.pipeline.id
        );

        Ok(maps.iter().filter_map(|map| map.occurrence_id).collect())
    }
}

/// The stored count of vulnerabilities, saturating at the column's maximum.
fn vulnerability_count(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

async fn existing<C: ConnectionTrait>(
    db: &C,
    uuids: Vec<Uuid>,
) -> Result<HashMap<Uuid, sbom_occurrence::Model>, Error> {
    let batches = chunked_with(1, uuids)
        .into_iter()
        .map(|batch| batch.collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut result = HashMap::new();
    for batch in batches {
        for model in sbom_occurrence::Entity::find()
            .filter(Column::Uuid.is_in(batch))
            .all(db)
            .await?
        {
            result.insert(model.uuid, model);
        }
    }

    Ok(result)
}

fn tracked(object: &sbom_occurrence::ActiveModel) -> Option<Tracked<'_>> {
    Some(Tracked {
        project_id: *active(&object.project_id)?,
        component_id: *active(&object.component_id)?,
        component_version_id: *active(&object.component_version_id)?,
        source_id: *active(&object.source_id)?,
        source_package_id: *active(&object.source_package_id)?,
        component_name: active(&object.component_name)?,
        input_file_path: active(&object.input_file_path)?.as_deref(),
        package_manager: active(&object.package_manager)?.as_deref(),
        licenses: active(&object.licenses)?,
        ancestors: active(&object.ancestors)?,
        traversal_ids: active(&object.traversal_ids)?,
        archived: *active(&object.archived)?,
        vulnerability_count: *active(&object.vulnerability_count)?,
        highest_severity: *active(&object.highest_severity)?,
    })
}

/// Check if writing `object` would leave the tracked attributes of `current` as they are.
fn unchanged(object: &sbom_occurrence::ActiveModel, current: &sbom_occurrence::Model) -> bool {
    tracked(object).is_some_and(|next| next == Tracked::from(current))
}
