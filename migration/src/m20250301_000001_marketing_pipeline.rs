use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Client {
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
enum ContactPerson {
    Table,
    Id,
    ClientId,
    Name,
    Phone,
    Email,
    Designation,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Followup {
    Table,
    Id,
    ClientId,
    ContactPersonId,
    EmployeeId,
    Status,
    Remarks,
    NextFollowupDate,
    Shared,
    Following,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Meeting {
    Table,
    Id,
    FollowupId,
    ClientId,
    EmployeeId,
    Title,
    MeetingDate,
    StartTime,
    EndTime,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Client::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Client::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Client::EmployeeId).integer().not_null())
                    .col(ColumnDef::new(Client::CompanyName).string_len(255).not_null())
                    .col(ColumnDef::new(Client::CustomerName).string_len(255).not_null())
                    .col(ColumnDef::new(Client::IndustryType).string_len(128))
                    .col(ColumnDef::new(Client::Website).string_len(255))
                    .col(ColumnDef::new(Client::Address).text())
                    .col(ColumnDef::new(Client::City).string_len(128))
                    .col(ColumnDef::new(Client::State).string_len(128))
                    .col(ColumnDef::new(Client::Reference).string_len(255))
                    .col(ColumnDef::new(Client::Requirements).text())
                    .col(
                        ColumnDef::new(Client::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Client::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Client::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_client_employee_active")
                    .table(Client::Table)
                    .col(Client::EmployeeId)
                    .col(Client::Active)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContactPerson::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContactPerson::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ContactPerson::ClientId).integer().not_null())
                    .col(ColumnDef::new(ContactPerson::Name).string_len(255).not_null())
                    .col(ColumnDef::new(ContactPerson::Phone).string_len(64))
                    .col(ColumnDef::new(ContactPerson::Email).string_len(255))
                    .col(ColumnDef::new(ContactPerson::Designation).string_len(128))
                    .col(
                        ColumnDef::new(ContactPerson::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contact_person_client")
                            .from(ContactPerson::Table, ContactPerson::ClientId)
                            .to(Client::Table, Client::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Followup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Followup::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Followup::ClientId).integer().not_null())
                    .col(ColumnDef::new(Followup::ContactPersonId).integer())
                    .col(ColumnDef::new(Followup::EmployeeId).integer().not_null())
                    .col(ColumnDef::new(Followup::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Followup::Remarks).text())
                    .col(ColumnDef::new(Followup::NextFollowupDate).string_len(64))
                    .col(
                        ColumnDef::new(Followup::Shared)
                            .string_len(16)
                            .not_null()
                            .default("none"),
                    )
                    .col(
                        ColumnDef::new(Followup::Following)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Followup::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_followup_client")
                            .from(Followup::Table, Followup::ClientId)
                            .to(Client::Table, Client::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_followup_contact_person")
                            .from(Followup::Table, Followup::ContactPersonId)
                            .to(ContactPerson::Table, ContactPerson::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Latest-per-client lookups group by client and order on created_at.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_followup_client_created")
                    .table(Followup::Table)
                    .col(Followup::ClientId)
                    .col(Followup::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Meeting::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Meeting::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Meeting::FollowupId).integer().not_null())
                    .col(ColumnDef::new(Meeting::ClientId).integer().not_null())
                    .col(ColumnDef::new(Meeting::EmployeeId).integer().not_null())
                    .col(ColumnDef::new(Meeting::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Meeting::MeetingDate).string_len(64).not_null())
                    .col(ColumnDef::new(Meeting::StartTime).string_len(32).not_null())
                    .col(ColumnDef::new(Meeting::EndTime).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Meeting::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meeting_followup")
                            .from(Meeting::Table, Meeting::FollowupId)
                            .to(Followup::Table, Followup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_meeting_client")
                    .table(Meeting::Table)
                    .col(Meeting::ClientId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Meeting::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Followup::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContactPerson::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Client::Table).if_exists().to_owned())
            .await
    }
}
