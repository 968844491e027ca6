mod index;
mod license;
mod repository;

pub use index::{IndexQueue, SearchBackend, VulnerabilityIndex};
pub use license::{LicenseSource, PackageLicenseSource};
pub use repository::{MergeRequests, Repository, Tag};

use crate::{
    config::IngestorConfig,
    error::Error,
    model::{IngestResult, OccurrenceMap, PipelineContext},
    task::{
        IngestComponentVersions, IngestComponents, IngestOccurrenceRefs, IngestOccurrences,
        IngestOccurrencesVulnerabilities, IngestSourcePackages, IngestSources, Task,
        UpdateSecurityPolicyDismissals,
    },
};
use sbomgraph_common::db::Database;
use std::{sync::Arc, time::Instant};
use tracing::instrument;

/// Runs the tasks of an ingestion, in order.
#[derive(Clone)]
pub struct IngestionService {
    db: Database,
    config: IngestorConfig,
    licenses: Arc<dyn LicenseSource>,
    repository: Arc<dyn Repository>,
    merge_requests: Arc<dyn MergeRequests>,
    index: Arc<dyn VulnerabilityIndex>,
}

impl IngestionService {
    /// Create a new service, looking up licenses in the `package_licenses` table.
    pub fn new(
        db: Database,
        config: IngestorConfig,
        repository: Arc<dyn Repository>,
        merge_requests: Arc<dyn MergeRequests>,
        index: Arc<dyn VulnerabilityIndex>,
    ) -> Self {
        Self {
            licenses: Arc::new(PackageLicenseSource::new(db.clone())),
            db,
            config,
            repository,
            merge_requests,
            index,
        }
    }

    pub fn with_license_source(mut self, licenses: Arc<dyn LicenseSource>) -> Self {
        self.licenses = licenses;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Ingest the occurrence maps of a pipeline.
    ///
    /// The first failing task ends the ingestion. What earlier tasks wrote stays, re-running
    /// the ingestion is safe.
    ///
    /// Returns the result and the occurrence maps, without duplicates and with all ids
    /// resolved.
    #[instrument(skip_all, fields(project = pipeline.project.id, pipeline = pipeline.pipeline.id, maps = maps.len()), err)]
    pub async fn ingest(
        &self,
        pipeline: &PipelineContext,
        mut maps: Vec<OccurrenceMap>,
    ) -> Result<(IngestResult, Vec<OccurrenceMap>), Error> {
        let start = Instant::now();
        let db = &self.db;

        IngestComponents::new()?
            .execute(db, pipeline, &mut maps)
            .await?;
        IngestComponentVersions::new()?
            .execute(db, pipeline, &mut maps)
            .await?;
        IngestSources::new()?
            .execute(db, pipeline, &mut maps)
            .await?;
        IngestSourcePackages::new()?
            .execute(db, pipeline, &mut maps)
            .await?;

        let occurrence_ids = IngestOccurrences::new(self.licenses.clone())?
            .execute(db, pipeline, &mut maps)
            .await?;

        let links = IngestOccurrencesVulnerabilities::new(self.index.clone())?
            .execute(db, pipeline, &mut maps)
            .await?;

        let refs = IngestOccurrenceRefs::new(self.repository.clone())?
            .execute(db, pipeline, &mut maps)
            .await?;

        let dismissals_updated = UpdateSecurityPolicyDismissals::new(
            self.config.update_policy_dismissals,
            self.licenses.clone(),
            self.merge_requests.clone(),
        )
        .execute(db, pipeline, &mut maps)
        .await?;

        let result = IngestResult {
            occurrence_ids,
            vulnerability_links_created: links.created,
            vulnerability_links_deleted: links.deleted,
            tracked_context_id: refs.tracked_context_id,
            refs_created: refs.created,
            dismissals_updated,
        };

        log::info!(
            "ingested {} occurrence(s) of pipeline {} in {:?}",
            result.occurrence_ids.len(),
            pipeline.pipeline.id,
            start.elapsed()
        );

        Ok((result, maps))
    }
}
