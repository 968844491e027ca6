use crate::m0000010_create_sbom_components::SbomComponents;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SbomOccurrences::Table)
                    .col(
                        ColumnDef::new(SbomOccurrences::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrences::Uuid)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrences::ProjectId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrences::PipelineId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SbomOccurrences::CommitSha).string().not_null())
                    .col(
                        ColumnDef::new(SbomOccurrences::ComponentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SbomOccurrences::ComponentVersionId).big_integer())
                    .col(ColumnDef::new(SbomOccurrences::SourceId).big_integer())
                    .col(ColumnDef::new(SbomOccurrences::SourcePackageId).big_integer())
                    .col(
                        ColumnDef::new(SbomOccurrences::ComponentName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SbomOccurrences::InputFilePath).text())
                    .col(ColumnDef::new(SbomOccurrences::PackageManager).string())
                    .col(
                        ColumnDef::new(SbomOccurrences::Licenses)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrences::Ancestors)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrences::TraversalIds)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrences::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrences::VulnerabilityCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SbomOccurrences::HighestSeverity).integer())
                    .col(
                        ColumnDef::new(SbomOccurrences::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrences::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(SbomOccurrences::ComponentId)
                            .to(SbomComponents::Table, SbomComponents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("sbom_occurrences_project_id_component_id_idx")
                    .table(SbomOccurrences::Table)
                    .col(SbomOccurrences::ProjectId)
                    .col(SbomOccurrences::ComponentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SbomOccurrences::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SbomOccurrences {
    Table,
    Id,
    Uuid,
    ProjectId,
    PipelineId,
    CommitSha,
    ComponentId,
    ComponentVersionId,
    SourceId,
    SourcePackageId,
    ComponentName,
    InputFilePath,
    PackageManager,
    Licenses,
    Ancestors,
    TraversalIds,
    Archived,
    VulnerabilityCount,
    HighestSeverity,
    CreatedAt,
    UpdatedAt,
}
