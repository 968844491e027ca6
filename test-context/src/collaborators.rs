use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use sbomgraph_entity::license::License;
use sbomgraph_module_ingestor::{
    model::PackageIdentity,
    service::{LicenseSource, MergeRequests, Repository, Tag, VulnerabilityIndex},
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A repository with branches and tags defined by the test.
#[derive(Debug, Default)]
pub struct StaticRepository {
    state: RwLock<RepositoryState>,
}

#[derive(Debug, Default)]
struct RepositoryState {
    default_branch: Option<String>,
    branches: BTreeSet<String>,
    tags: BTreeMap<String, String>,
}

impl StaticRepository {
    pub fn set_default_branch(&self, name: &str) {
        self.state.write().default_branch = Some(name.to_string());
    }

    pub fn add_branch(&self, name: &str) {
        self.state.write().branches.insert(name.to_string());
    }

    pub fn add_tag(&self, name: &str, target_sha: &str) {
        self.state
            .write()
            .tags
            .insert(name.to_string(), target_sha.to_string());
    }
}

#[async_trait]
impl Repository for StaticRepository {
    async fn default_branch(&self, _project_id: i64) -> Result<Option<String>, anyhow::Error> {
        Ok(self.state.read().default_branch.clone())
    }

    async fn branch_exists(&self, _project_id: i64, name: &str) -> Result<bool, anyhow::Error> {
        Ok(self.state.read().branches.contains(name))
    }

    async fn find_tag(&self, _project_id: i64, name: &str) -> Result<Option<Tag>, anyhow::Error> {
        Ok(self.state.read().tags.get(name).map(|target_sha| Tag {
            name: name.to_string(),
            target_sha: target_sha.clone(),
        }))
    }
}

/// Merge requests by the commit they contain.
#[derive(Debug, Default)]
pub struct StaticMergeRequests {
    by_commit: Mutex<BTreeMap<String, Vec<i64>>>,
}

impl StaticMergeRequests {
    pub fn associate(&self, sha: &str, merge_request_id: i64) {
        self.by_commit
            .lock()
            .entry(sha.to_string())
            .or_default()
            .push(merge_request_id);
    }
}

#[async_trait]
impl MergeRequests for StaticMergeRequests {
    async fn for_commit(&self, _project_id: i64, sha: &str) -> Result<Vec<i64>, anyhow::Error> {
        Ok(self.by_commit.lock().get(sha).cloned().unwrap_or_default())
    }
}

/// Records what would have been sent to the search index.
#[derive(Debug, Default)]
pub struct RecordingIndex {
    calls: Mutex<Vec<Vec<i64>>>,
}

impl RecordingIndex {
    pub fn calls(&self) -> Vec<Vec<i64>> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl VulnerabilityIndex for RecordingIndex {
    fn enqueue(&self, vulnerability_ids: Vec<i64>) {
        self.calls.lock().push(vulnerability_ids);
    }
}

/// Fixed license data, counting the lookups.
#[derive(Debug, Default)]
pub struct StaticLicenses {
    licenses: HashMap<PackageIdentity, Vec<License>>,
    lookups: AtomicUsize,
}

impl StaticLicenses {
    pub fn with(mut self, package: PackageIdentity, licenses: Vec<License>) -> Self {
        self.licenses.insert(package, licenses);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LicenseSource for StaticLicenses {
    async fn licenses(
        &self,
        packages: &[PackageIdentity],
    ) -> Result<HashMap<PackageIdentity, Vec<License>>, anyhow::Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(packages
            .iter()
            .filter_map(|package| {
                self.licenses
                    .get(package)
                    .map(|licenses| (package.clone(), licenses.clone()))
            })
            .collect())
    }
}
