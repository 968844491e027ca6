use super::Task;
use crate::{
    error::Error,
    model::{Field, OccurrenceMap, PipelineContext},
    service::{LicenseSource, MergeRequests},
};
use sbomgraph_entity::security_policy_dismissal::{self, Column};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use std::{collections::BTreeSet, sync::Arc};
use time::OffsetDateTime;
use tracing::instrument;

/// Attach ingested occurrences to the license policy dismissals of the pipeline's merge requests.
pub struct UpdateSecurityPolicyDismissals {
    enabled: bool,
    licenses: Arc<dyn LicenseSource>,
    merge_requests: Arc<dyn MergeRequests>,
}

impl UpdateSecurityPolicyDismissals {
    pub fn new(
        enabled: bool,
        licenses: Arc<dyn LicenseSource>,
        merge_requests: Arc<dyn MergeRequests>,
    ) -> Self {
        Self {
            enabled,
            licenses,
            merge_requests,
        }
    }
}

impl Task for UpdateSecurityPolicyDismissals {
    const NAME: &'static str = "UpdateSecurityPolicyDismissals";
    const READS: &'static [Field] = &[Field::ReportComponent, Field::OccurrenceId, Field::Uuid];
    const WRITES: &'static [Field] = &[];

    /// The number of updated dismissals.
    type Output = usize;

    #[instrument(skip_all, fields(project = pipeline.project.id, enabled = self.enabled), err)]
    async fn execute<C: ConnectionTrait>(
        &self,
        db: &C,
        pipeline: &PipelineContext,
        maps: &mut Vec<OccurrenceMap>,
    ) -> Result<usize, Error> {
        if !self.enabled {
            return Ok(0);
        }

        let project_id = pipeline.project.id;

        let merge_requests = self
            .merge_requests
            .for_commit(project_id, &pipeline.pipeline.sha)
            .await?;
        if merge_requests.is_empty() {
            return Ok(0);
        }

        let dismissals = security_policy_dismissal::Entity::find()
            .filter(Column::ProjectId.eq(project_id))
            .filter(Column::MergeRequestId.is_in(merge_requests))
            .all(db)
            .await?;
        if dismissals.is_empty() {
            return Ok(0);
        }

        // occurrences which made it into the database

        let candidates = maps
            .iter()
            .filter(|map| map.occurrence_id.is_some())
            .filter_map(|map| Some((map, map.uuid?)))
            .collect::<Vec<_>>();

        let identities = candidates
            .iter()
            .filter_map(|(map, _)| map.identity())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        if identities.is_empty() {
            return Ok(0);
        }
        let licenses = self.licenses.licenses(&identities).await?;

        let now = OffsetDateTime::now_utc();
        let mut updated = 0;

        for dismissal in dismissals {
            let mut uuids = dismissal.license_occurrence_uuids.clone();
            let mut changed = false;

            for (map, uuid) in &candidates {
                let Some(component_licenses) = map.identity().and_then(|id| licenses.get(&id))
                else {
                    continue;
                };

                let covered = component_licenses
                    .iter()
                    .filter_map(|license| license.name.as_deref())
                    .any(|name| dismissal.licenses.covers(name, map.name()));
                if covered {
                    changed |= uuids.add(uuid.to_string());
                }
            }

            if changed {
                let mut dismissal: security_policy_dismissal::ActiveModel = dismissal.into();
                dismissal.license_occurrence_uuids = Set(uuids);
                dismissal.updated_at = Set(now);
                dismissal.update(db).await?;
                updated += 1;
            }
        }

        log::debug!("updated {updated} policy dismissal(s)");

        Ok(updated)
    }
}
