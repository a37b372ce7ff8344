use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_uniq(Users::Login))
                    .col(string_uniq(Users::Email))
                    .col(string(Users::PasswordHash))
                    .col(string_null(Users::Phone))
                    .col(boolean(Users::IsActive).default(true))
                    .col(boolean(Users::IsSuperuser).default(false))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Shops::Table)
                    .if_not_exists()
                    .col(pk_auto(Shops::Id))
                    .col(integer_uniq(Shops::OwnerId))
                    .col(string(Shops::Name))
                    .col(string_null(Shops::Address))
                    .col(timestamp_with_time_zone(Shops::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shops_owner")
                            .from(Shops::Table, Shops::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(pk_auto(Invoices::Id))
                    .col(integer(Invoices::ShopId))
                    .col(integer(Invoices::UserId))
                    .col(string(Invoices::ContactInfo))
                    .col(text_null(Invoices::AdditionalInfo))
                    .col(decimal_len(Invoices::TotalAmount, 14, 2))
                    .col(boolean(Invoices::IsPaid).default(false))
                    .col(timestamp_with_time_zone(Invoices::CreatedAt))
                    .col(timestamp_with_time_zone(Invoices::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_shop")
                            .from(Invoices::Table, Invoices::ShopId)
                            .to(Shops::Table, Shops::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_user")
                            .from(Invoices::Table, Invoices::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_shop_created")
                    .table(Invoices::Table)
                    .col(Invoices::ShopId)
                    .col(Invoices::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InvoiceItems::Table)
                    .if_not_exists()
                    .col(pk_auto(InvoiceItems::Id))
                    .col(integer(InvoiceItems::InvoiceId))
                    .col(integer(InvoiceItems::Position))
                    .col(string(InvoiceItems::Name))
                    .col(decimal_len(InvoiceItems::Quantity, 14, 3))
                    .col(decimal_len(InvoiceItems::Price, 14, 2))
                    .col(decimal_len(InvoiceItems::Sum, 14, 2))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoice_items_invoice")
                            .from(InvoiceItems::Table, InvoiceItems::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(pk_uuid(AuditLogs::Id))
                    .col(integer_null(AuditLogs::UserId))
                    .col(string(AuditLogs::Action))
                    .col(string_null(AuditLogs::Resource))
                    .col(json_null(AuditLogs::Metadata))
                    .col(timestamp_with_time_zone(AuditLogs::CreatedAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InvoiceItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Shops::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Login,
    Email,
    PasswordHash,
    Phone,
    IsActive,
    IsSuperuser,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Shops {
    Table,
    Id,
    OwnerId,
    Name,
    Address,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    Id,
    ShopId,
    UserId,
    ContactInfo,
    AdditionalInfo,
    TotalAmount,
    IsPaid,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InvoiceItems {
    Table,
    Id,
    InvoiceId,
    Position,
    Name,
    Quantity,
    Price,
    Sum,
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    UserId,
    Action,
    Resource,
    Metadata,
    CreatedAt,
}
