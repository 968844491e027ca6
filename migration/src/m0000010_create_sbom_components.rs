use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SbomComponents::Table)
                    .col(
                        ColumnDef::new(SbomComponents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SbomComponents::Uuid)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SbomComponents::Name).string().not_null())
                    .col(ColumnDef::new(SbomComponents::PurlType).string())
                    .col(
                        ColumnDef::new(SbomComponents::ComponentType)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomComponents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomComponents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SbomComponentVersions::Table)
                    .col(
                        ColumnDef::new(SbomComponentVersions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SbomComponentVersions::ComponentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomComponentVersions::Version)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomComponentVersions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomComponentVersions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(SbomComponentVersions::ComponentId)
                            .to(SbomComponents::Table, SbomComponents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("sbom_component_versions_component_id_version_key")
                    .table(SbomComponentVersions::Table)
                    .col(SbomComponentVersions::ComponentId)
                    .col(SbomComponentVersions::Version)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SbomSources::Table)
                    .col(
                        ColumnDef::new(SbomSources::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SbomSources::SourceType).integer().not_null())
                    .col(ColumnDef::new(SbomSources::Fingerprint).string().not_null())
                    .col(ColumnDef::new(SbomSources::Details).json_binary().not_null())
                    .col(
                        ColumnDef::new(SbomSources::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomSources::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("sbom_sources_source_type_fingerprint_key")
                    .table(SbomSources::Table)
                    .col(SbomSources::SourceType)
                    .col(SbomSources::Fingerprint)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SbomSourcePackages::Table)
                    .col(
                        ColumnDef::new(SbomSourcePackages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SbomSourcePackages::Name).string().not_null())
                    .col(
                        ColumnDef::new(SbomSourcePackages::PurlType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomSourcePackages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomSourcePackages::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("sbom_source_packages_name_purl_type_key")
                    .table(SbomSourcePackages::Table)
                    .col(SbomSourcePackages::Name)
                    .col(SbomSourcePackages::PurlType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SbomSourcePackages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SbomSources::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SbomComponentVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SbomComponents::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum SbomComponents {
    Table,
    Id,
    Uuid,
    Name,
    PurlType,
    ComponentType,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum SbomComponentVersions {
    Table,
    Id,
    ComponentId,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum SbomSources {
    Table,
    Id,
    SourceType,
    Fingerprint,
    Details,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum SbomSourcePackages {
    Table,
    Id,
    Name,
    PurlType,
    CreatedAt,
    UpdatedAt,
}
