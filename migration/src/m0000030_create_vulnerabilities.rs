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
                    .table(Vulnerabilities::Table)
                    .col(
                        ColumnDef::new(Vulnerabilities::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Vulnerabilities::ProjectId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vulnerabilities::LatestPipelineId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Vulnerabilities::Severity).integer().not_null())
                    .col(ColumnDef::new(Vulnerabilities::File).text())
                    .col(
                        ColumnDef::new(Vulnerabilities::PackageName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Vulnerabilities::PackageVersion).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("vulnerabilities_project_id_latest_pipeline_id_idx")
                    .table(Vulnerabilities::Table)
                    .col(Vulnerabilities::ProjectId)
                    .col(Vulnerabilities::LatestPipelineId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SbomOccurrencesVulnerabilities::Table)
                    .col(
                        ColumnDef::new(SbomOccurrencesVulnerabilities::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrencesVulnerabilities::OccurrenceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrencesVulnerabilities::VulnerabilityId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrencesVulnerabilities::ProjectId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrencesVulnerabilities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(SbomOccurrencesVulnerabilities::OccurrenceId)
                            .to(SbomOccurrences::Table, SbomOccurrences::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("sbom_occurrences_vulnerabilities_occurrence_id_vulnerability_id_key")
                    .table(SbomOccurrencesVulnerabilities::Table)
                    .col(SbomOccurrencesVulnerabilities::OccurrenceId)
                    .col(SbomOccurrencesVulnerabilities::VulnerabilityId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(SbomOccurrencesVulnerabilities::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Vulnerabilities::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Vulnerabilities {
    Table,
    Id,
    ProjectId,
    LatestPipelineId,
    Severity,
    File,
    PackageName,
    PackageVersion,
}

#[derive(DeriveIden)]
pub enum SbomOccurrencesVulnerabilities {
    Table,
    Id,
    OccurrenceId,
    VulnerabilityId,
    ProjectId,
    CreatedAt,
}
