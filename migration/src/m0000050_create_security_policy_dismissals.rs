use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SecurityPolicyDismissals::Table)
                    .col(
                        ColumnDef::new(SecurityPolicyDismissals::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SecurityPolicyDismissals::ProjectId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SecurityPolicyDismissals::MergeRequestId).big_integer())
                    .col(
                        ColumnDef::new(SecurityPolicyDismissals::Licenses)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SecurityPolicyDismissals::LicenseOccurrenceUuids)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SecurityPolicyDismissals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("security_policy_dismissals_project_id_merge_request_id_idx")
                    .table(SecurityPolicyDismissals::Table)
                    .col(SecurityPolicyDismissals::ProjectId)
                    .col(SecurityPolicyDismissals::MergeRequestId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(SecurityPolicyDismissals::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
pub enum SecurityPolicyDismissals {
    Table,
    Id,
    ProjectId,
    MergeRequestId,
    Licenses,
    LicenseOccurrenceUuids,
    UpdatedAt,
}
