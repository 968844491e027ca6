use sea_orm::{sea_query::ValueTypeErr, DbErr};

/// A task definition which can never work, independent of the data it is run with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{task}: unique_by column '{column}' must be part of the used columns")]
    UniqueByNotInUses { task: &'static str, column: String },
    #[error("{task}: pairing rows with occurrence maps requires unique_by columns")]
    MissingUniqueBy { task: &'static str },
    #[error("{task}: column '{column}' is not part of the used columns")]
    ColumnNotInUses { task: &'static str, column: String },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unexpected column value: {0}")]
    Value(#[from] ValueTypeErr),
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}
