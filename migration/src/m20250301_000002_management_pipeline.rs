use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum ManagementClient {
    Table,
    Id,
    EmployeeId,
    CompanyName,
    CustomerName,
    IndustryType,
    Website,
    Address,
    City,
    State,
    Reference,
    Requirements,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ManagementContact {
    Table,
    Id,
    ManagementClientId,
    Name,
    Phone,
    Email,
    Designation,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ManagementFollowup {
    Table,
    Id,
    ClientId,
    MarketingClientId,
    IsMarketing,
    ContactId,
    EmployeeId,
    Status,
    Remarks,
    NextFollowupDate,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Client {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ManagementClient::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ManagementClient::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ManagementClient::EmployeeId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ManagementClient::CompanyName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ManagementClient::CustomerName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ManagementClient::IndustryType).string_len(128))
                    .col(ColumnDef::new(ManagementClient::Website).string_len(255))
                    .col(ColumnDef::new(ManagementClient::Address).text())
                    .col(ColumnDef::new(ManagementClient::City).string_len(128))
                    .col(ColumnDef::new(ManagementClient::State).string_len(128))
                    .col(ColumnDef::new(ManagementClient::Reference).string_len(255))
                    .col(ColumnDef::new(ManagementClient::Requirements).text())
                    .col(
                        ColumnDef::new(ManagementClient::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ManagementClient::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ManagementClient::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ManagementContact::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ManagementContact::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ManagementContact::ManagementClientId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ManagementContact::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ManagementContact::Phone).string_len(64))
                    .col(ColumnDef::new(ManagementContact::Email).string_len(255))
                    .col(ColumnDef::new(ManagementContact::Designation).string_len(128))
                    .col(
                        ColumnDef::new(ManagementContact::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_management_contact_client")
                            .from(ManagementContact::Table, ManagementContact::ManagementClientId)
                            .to(ManagementClient::Table, ManagementClient::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ManagementFollowup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ManagementFollowup::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ManagementFollowup::ClientId).integer())
                    .col(ColumnDef::new(ManagementFollowup::MarketingClientId).integer())
                    .col(
                        ColumnDef::new(ManagementFollowup::IsMarketing)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ManagementFollowup::ContactId).integer())
                    .col(
                        ColumnDef::new(ManagementFollowup::EmployeeId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ManagementFollowup::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ManagementFollowup::Remarks).text())
                    .col(ColumnDef::new(ManagementFollowup::NextFollowupDate).string_len(64))
                    .col(
                        ColumnDef::new(ManagementFollowup::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_management_followup_client")
                            .from(ManagementFollowup::Table, ManagementFollowup::ClientId)
                            .to(ManagementClient::Table, ManagementClient::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_management_followup_marketing_client")
                            .from(ManagementFollowup::Table, ManagementFollowup::MarketingClientId)
                            .to(Client::Table, Client::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_management_followup_contact")
                            .from(ManagementFollowup::Table, ManagementFollowup::ContactId)
                            .to(ManagementContact::Table, ManagementContact::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_management_followup_client_created")
                    .table(ManagementFollowup::Table)
                    .col(ManagementFollowup::ClientId)
                    .col(ManagementFollowup::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_management_followup_marketing_created")
                    .table(ManagementFollowup::Table)
                    .col(ManagementFollowup::MarketingClientId)
                    .col(ManagementFollowup::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ManagementFollowup::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(ManagementContact::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(ManagementClient::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}
