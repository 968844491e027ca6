#![allow(clippy::expect_used)]

mod collaborators;

pub use collaborators::{RecordingIndex, StaticLicenses, StaticMergeRequests, StaticRepository};

use sbomgraph_common::{config, db::Database};
use sbomgraph_entity::{
    license::Licenses, package_license, sbom_occurrence, sbom_occurrences_vulnerability,
    security_policy_dismissal, vulnerability,
};
use sbomgraph_module_ingestor::{
    config::IngestorConfig,
    model::{Pipeline, PipelineContext, Project},
    service::IngestionService,
};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder};
use std::{env, sync::Arc};
use test_context::AsyncTestContext;
use time::OffsetDateTime;
use tracing::instrument;

pub const PROJECT_ID: i64 = 1;
pub const DEFAULT_BRANCH: &str = "main";
pub const SHA: &str = "b83d6e391c22777fca1ed3012fce84f633d7fed0";

/// A migrated database, plus collaborators whose state tests control.
pub struct IngestionContext {
    pub db: Database,
    pub repository: Arc<StaticRepository>,
    pub merge_requests: Arc<StaticMergeRequests>,
    pub index: Arc<RecordingIndex>,
}

impl IngestionContext {
    fn new(db: Database) -> Self {
        let repository = StaticRepository::default();
        repository.set_default_branch(DEFAULT_BRANCH);
        repository.add_branch(DEFAULT_BRANCH);

        Self {
            db,
            repository: Arc::new(repository),
            merge_requests: Default::default(),
            index: Default::default(),
        }
    }

    pub fn service(&self) -> IngestionService {
        self.service_with(IngestorConfig::default())
    }

    pub fn service_with(&self, config: IngestorConfig) -> IngestionService {
        IngestionService::new(
            self.db.clone(),
            config,
            self.repository.clone(),
            self.merge_requests.clone(),
            self.index.clone(),
        )
    }

    /// A pipeline of the default branch.
    pub fn pipeline(&self, id: i64) -> PipelineContext {
        PipelineContext {
            project: Project {
                id: PROJECT_ID,
                archived: false,
                traversal_ids: vec![100, PROJECT_ID],
            },
            pipeline: Pipeline {
                id,
                sha: SHA.to_string(),
                ref_name: DEFAULT_BRANCH.to_string(),
                tag: false,
            },
        }
    }

    pub async fn add_package_license(
        &self,
        purl_type: &str,
        name: &str,
        version: Option<&str>,
        licenses: Licenses,
    ) -> Result<package_license::Model, anyhow::Error> {
        Ok(package_license::ActiveModel {
            purl_type: Set(purl_type.to_string()),
            name: Set(name.to_string()),
            version: Set(version.map(ToString::to_string)),
            licenses: Set(licenses),
            ..Default::default()
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn add_vulnerability(
        &self,
        pipeline_id: i64,
        severity: vulnerability::Severity,
        file: &str,
        package_name: &str,
        package_version: &str,
    ) -> Result<vulnerability::Model, anyhow::Error> {
        Ok(vulnerability::ActiveModel {
            project_id: Set(PROJECT_ID),
            latest_pipeline_id: Set(pipeline_id),
            severity: Set(severity),
            file: Set(Some(file.to_string())),
            package_name: Set(package_name.to_string()),
            package_version: Set(Some(package_version.to_string())),
            ..Default::default()
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn add_dismissal(
        &self,
        merge_request_id: i64,
        licenses: security_policy_dismissal::DismissedLicenses,
    ) -> Result<security_policy_dismissal::Model, anyhow::Error> {
        Ok(security_policy_dismissal::ActiveModel {
            project_id: Set(PROJECT_ID),
            merge_request_id: Set(Some(merge_request_id)),
            licenses: Set(licenses),
            license_occurrence_uuids: Set(Default::default()),
            updated_at: Set(OffsetDateTime::now_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn occurrences(&self) -> Result<Vec<sbom_occurrence::Model>, anyhow::Error> {
        Ok(sbom_occurrence::Entity::find()
            .order_by_asc(sbom_occurrence::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// All vulnerability links, as `(occurrence, vulnerability)` pairs.
    pub async fn vulnerability_links(&self) -> Result<Vec<(i64, i64)>, anyhow::Error> {
        Ok(sbom_occurrences_vulnerability::Entity::find()
            .order_by_asc(sbom_occurrences_vulnerability::Column::OccurrenceId)
            .order_by_asc(sbom_occurrences_vulnerability::Column::VulnerabilityId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|link| (link.occurrence_id, link.vulnerability_id))
            .collect())
    }
}

impl AsyncTestContext for IngestionContext {
    #[instrument]
    async fn setup() -> IngestionContext {
        if env::var("EXTERNAL_TEST_DB").is_ok() {
            log::warn!("Using external database from 'DB_*' env vars");
            let config = config::Database::from_env().expect("DB config from env");
            let db = Database::new(&config)
                .await
                .expect("Configuring the database");
            db.refresh().await.expect("Resetting the database");

            return IngestionContext::new(db);
        }

        let db = Database::new(&config::Database::in_memory())
            .await
            .expect("Create an in-memory database");
        db.migrate().await.expect("Migrating the database");

        IngestionContext::new(db)
    }

    async fn teardown(self) {
        if let Err(err) = self.db.close().await {
            log::warn!("failed to close the database: {err}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sea_orm::PaginatorTrait;
    use test_context::test_context;
    use test_log::test;

    #[test_context(IngestionContext)]
    #[test(tokio::test)]
    async fn starts_empty(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
        assert_eq!(sbom_occurrence::Entity::find().count(&ctx.db).await?, 0);
        ctx.db.ping().await?;
        Ok(())
    }
}
