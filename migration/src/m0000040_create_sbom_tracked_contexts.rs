use crate::m0000020_create_sbom_occurrences::SbomOccurrences;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SbomTrackedContexts::Table)
                    .col(
                        ColumnDef::new(SbomTrackedContexts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SbomTrackedContexts::ProjectId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomTrackedContexts::ContextName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomTrackedContexts::ContextType)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomTrackedContexts::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SbomTrackedContexts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("sbom_tracked_contexts_project_id_context_name_context_type_key")
                    .table(SbomTrackedContexts::Table)
                    .col(SbomTrackedContexts::ProjectId)
                    .col(SbomTrackedContexts::ContextName)
                    .col(SbomTrackedContexts::ContextType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SbomOccurrenceRefs::Table)
                    .col(
                        ColumnDef::new(SbomOccurrenceRefs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrenceRefs::OccurrenceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrenceRefs::TrackedContextId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrenceRefs::PipelineId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrenceRefs::ProjectId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrenceRefs::CommitSha)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrenceRefs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(SbomOccurrenceRefs::OccurrenceId)
                            .to(SbomOccurrences::Table, SbomOccurrences::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(SbomOccurrenceRefs::TrackedContextId)
                            .to(SbomTrackedContexts::Table, SbomTrackedContexts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("sbom_occurrence_refs_occurrence_context_pipeline_key")
                    .table(SbomOccurrenceRefs::Table)
                    .col(SbomOccurrenceRefs::OccurrenceId)
                    .col(SbomOccurrenceRefs::TrackedContextId)
                    .col(SbomOccurrenceRefs::PipelineId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SbomOccurrenceRefs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SbomTrackedContexts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SbomTrackedContexts {
    Table,
    Id,
    ProjectId,
    ContextName,
    ContextType,
    IsDefault,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum SbomOccurrenceRefs {
    Table,
    Id,
    OccurrenceId,
    TrackedContextId,
    PipelineId,
    ProjectId,
    CommitSha,
    CreatedAt,
}
