use super::{Task, TaskDescriptor};
use crate::{
    error::{ConfigError, Error},
    model::{Field, OccurrenceMap, PipelineContext},
    service::Repository,
};
use sbomgraph_entity::{
    sbom_occurrence_ref::{self, Column},
    sbom_tracked_context::{self, ContextType, MAX_CONTEXTS_PER_PROJECT},
};
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter,
};
use std::{collections::BTreeSet, sync::Arc};
use time::OffsetDateTime;
use tracing::instrument;

/// Record the tracked ref a pipeline ran for with its occurrences.
pub struct IngestOccurrenceRefs {
    descriptor: TaskDescriptor<sbom_occurrence_ref::Entity>,
    repository: Arc<dyn Repository>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefsOutcome {
    pub tracked_context_id: Option<i64>,
    pub created: usize,
}

impl IngestOccurrenceRefs {
    pub fn new(repository: Arc<dyn Repository>) -> Result<Self, ConfigError> {
        Ok(Self {
            descriptor: TaskDescriptor::new(
                Self::NAME,
                [
                    Column::OccurrenceId,
                    Column::TrackedContextId,
                    Column::PipelineId,
                ],
                [
                    Column::Id,
                    Column::OccurrenceId,
                    Column::TrackedContextId,
                    Column::PipelineId,
                ],
            )?,
            repository,
        })
    }

    /// The context type and commit of the pipeline's ref, unless the ref is gone.
    async fn resolve_ref(
        &self,
        pipeline: &PipelineContext,
    ) -> Result<Option<(ContextType, String)>, Error> {
        let project_id = pipeline.project.id;
        let name = &pipeline.pipeline.ref_name;

        if pipeline.pipeline.tag {
            let tag = self.repository.find_tag(project_id, name).await?;
            Ok(tag.map(|tag| {
                log::debug!("tag '{}' points to {}", tag.name, tag.target_sha);
                (ContextType::Tag, tag.target_sha)
            }))
        } else if self.repository.branch_exists(project_id, name).await? {
            Ok(Some((ContextType::Branch, pipeline.pipeline.sha.clone())))
        } else {
            Ok(None)
        }
    }

    /// Find the tracked context of the ref, tracking the default branch on first sight.
    async fn tracked_context<C: ConnectionTrait>(
        &self,
        db: &C,
        project_id: i64,
        name: &str,
        context_type: ContextType,
    ) -> Result<Option<sbom_tracked_context::Model>, Error> {
        let find = || {
            sbom_tracked_context::Entity::find()
                .filter(sbom_tracked_context::Column::ProjectId.eq(project_id))
                .filter(sbom_tracked_context::Column::ContextName.eq(name))
                .filter(sbom_tracked_context::Column::ContextType.eq(context_type))
        };

        if let Some(context) = find().one(db).await? {
            return Ok(Some(context));
        }

        if context_type != ContextType::Branch {
            return Ok(None);
        }
        let default_branch = self.repository.default_branch(project_id).await?;
        if default_branch.as_deref() != Some(name) {
            return Ok(None);
        }

        let tracked = sbom_tracked_context::Entity::find()
            .filter(sbom_tracked_context::Column::ProjectId.eq(project_id))
            .count(db)
            .await?;
        if tracked >= MAX_CONTEXTS_PER_PROJECT {
            return Err(Error::Validation(format!(
                "project {project_id} already tracks the maximum of {MAX_CONTEXTS_PER_PROJECT} refs"
            )));
        }

        log::info!("tracking default branch '{name}' of project {project_id}");

        // a concurrent run may have created it in the meantime
        sbom_tracked_context::Entity::insert(sbom_tracked_context::ActiveModel {
            project_id: Set(project_id),
            context_name: Set(name.to_string()),
            context_type: Set(context_type),
            is_default: Set(true),
            created_at: Set(OffsetDateTime::now_utc()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([
                sbom_tracked_context::Column::ProjectId,
                sbom_tracked_context::Column::ContextName,
                sbom_tracked_context::Column::ContextType,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

        match find().one(db).await? {
            Some(context) => Ok(Some(context)),
            None => Err(DbErr::RecordNotFound(format!(
                "tracked context '{name}' of project {project_id}"
            ))
            .into()),
        }
    }
}

impl Task for IngestOccurrenceRefs {
    const NAME: &'static str = "IngestOccurrenceRefs";
    const READS: &'static [Field] = &[Field::OccurrenceId];
    const WRITES: &'static [Field] = &[];

    type Output = RefsOutcome;

    #[instrument(skip_all, fields(project = pipeline.project.id, ref_name = %pipeline.pipeline.ref_name), err)]
    async fn execute<C: ConnectionTrait>(
        &self,
        db: &C,
        pipeline: &PipelineContext,
        maps: &mut Vec<OccurrenceMap>,
    ) -> Result<RefsOutcome, Error> {
        let Some((context_type, commit_sha)) = self.resolve_ref(pipeline).await? else {
            log::info!(
                "ref '{}' of project {} not found, skipping refs",
                pipeline.pipeline.ref_name,
                pipeline.project.id
            );
            return Ok(RefsOutcome::default());
        };

        let Some(context) = self
            .tracked_context(
                db,
                pipeline.project.id,
                &pipeline.pipeline.ref_name,
                context_type,
            )
            .await?
        else {
            log::debug!(
                "{context_type} '{}' is not tracked, skipping refs",
                pipeline.pipeline.ref_name
            );
            return Ok(RefsOutcome::default());
        };

        let now = OffsetDateTime::now_utc();
        let objects = maps
            .iter()
            .filter_map(|map| map.occurrence_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|occurrence_id| sbom_occurrence_ref::ActiveModel {
                occurrence_id: Set(occurrence_id),
                tracked_context_id: Set(context.id),
                pipeline_id: Set(pipeline.pipeline.id),
                project_id: Set(pipeline.project.id),
                commit_sha: Set(commit_sha.clone()),
                created_at: Set(now),
                ..Default::default()
            })
            .collect::<Vec<_>>();

        let rows = self.descriptor.bulk_insert(db, objects).await?;

        Ok(RefsOutcome {
            tracked_context_id: Some(context.id),
            created: rows.len(),
        })
    }
}
