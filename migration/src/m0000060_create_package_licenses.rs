use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PackageLicenses::Table)
                    .col(
                        ColumnDef::new(PackageLicenses::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PackageLicenses::PurlType).string().not_null())
                    .col(ColumnDef::new(PackageLicenses::Name).string().not_null())
                    .col(ColumnDef::new(PackageLicenses::Version).string())
                    .col(
                        ColumnDef::new(PackageLicenses::Licenses)
                            .json_binary()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("package_licenses_purl_type_name_idx")
                    .table(PackageLicenses::Table)
                    .col(PackageLicenses::PurlType)
                    .col(PackageLicenses::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PackageLicenses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PackageLicenses {
    Table,
    Id,
    PurlType,
    Name,
    Version,
    Licenses,
}
