/// A tag of a project repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    /// The commit the tag points to.
    pub target_sha: String,
}

/// Read access to the git repositories of projects.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    async fn default_branch(&self, project_id: i64) -> Result<Option<String>, anyhow::Error>;

    async fn branch_exists(&self, project_id: i64, name: &str) -> Result<bool, anyhow::Error>;

    async fn find_tag(&self, project_id: i64, name: &str) -> Result<Option<Tag>, anyhow::Error>;
}

#[async_trait::async_trait]
pub trait MergeRequests: Send + Sync {
    /// The merge requests of a project containing the commit `sha`.
    async fn for_commit(&self, project_id: i64, sha: &str) -> Result<Vec<i64>, anyhow::Error>;
}
