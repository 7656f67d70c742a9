use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_reference_tables::Migration),
            Box::new(m20250301_000002_create_opportunities_tables::Migration),
            Box::new(m20250301_000003_create_offers_tables::Migration),
            Box::new(m20250301_000004_create_affaire_tables::Migration),
            Box::new(m20250301_000005_create_courriers_table::Migration),
            Box::new(m20250301_000006_create_sequence_counters_table::Migration),
            Box::new(m20250301_000007_create_history_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20250301_000001_create_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Entities::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Entities::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Entities::Code).string_len(3).not_null())
                        .col(ColumnDef::new(Entities::Name).string().not_null())
                        .col(
                            ColumnDef::new(Entities::CreatedAt)
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
                        .name("uq_entities_code")
                        .table(Entities::Table)
                        .col(Entities::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Categories::Code).string_len(3).not_null())
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(ColumnDef::new(Categories::EntityId).uuid().not_null())
                        .col(
                            ColumnDef::new(Categories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Code).string_len(8).not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::CategoryId).uuid().not_null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Clients::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Clients::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Clients::CNum).string().not_null())
                        .col(ColumnDef::new(Clients::Name).string().not_null())
                        .col(
                            ColumnDef::new(Clients::CreatedAt)
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
                        .name("uq_clients_c_num")
                        .table(Clients::Table)
                        .col(Clients::CNum)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Contacts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Contacts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Contacts::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Contacts::Name).string().not_null())
                        .col(ColumnDef::new(Contacts::Email).string().null())
                        .col(
                            ColumnDef::new(Contacts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Contacts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Clients::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Entities::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Entities {
        Table,
        Id,
        Code,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Code,
        Name,
        EntityId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Code,
        Name,
        CategoryId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Clients {
        Table,
        Id,
        CNum,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Contacts {
        Table,
        Id,
        ClientId,
        Name,
        Email,
        CreatedAt,
    }
}

mod m20250301_000002_create_opportunities_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_opportunities_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Opportunities::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Opportunities::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Opportunities::Reference).string().not_null())
                        .col(
                            ColumnDef::new(Opportunities::SequenceNumber)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Opportunities::EntityId).uuid().not_null())
                        .col(ColumnDef::new(Opportunities::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Opportunities::ContactId).uuid().not_null())
                        .col(
                            ColumnDef::new(Opportunities::PrincipalProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Opportunities::EstimatedAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Opportunities::Probability)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Opportunities::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Opportunities::StatusDates).json().not_null())
                        .col(ColumnDef::new(Opportunities::Description).string().null())
                        .col(ColumnDef::new(Opportunities::ClientNeeds).string().null())
                        .col(
                            ColumnDef::new(Opportunities::Relance)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Opportunities::ClosedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Opportunities::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Opportunities::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Opportunities::CreatedBy).string().null())
                        .col(
                            ColumnDef::new(Opportunities::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_opportunities_reference")
                        .table(Opportunities::Table)
                        .col(Opportunities::Reference)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_opportunities_relance")
                        .table(Opportunities::Table)
                        .col(Opportunities::Relance)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_opportunities_status")
                        .table(Opportunities::Table)
                        .col(Opportunities::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OpportunityProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OpportunityProducts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OpportunityProducts::OpportunityId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OpportunityProducts::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_opportunity_products_pair")
                        .table(OpportunityProducts::Table)
                        .col(OpportunityProducts::OpportunityId)
                        .col(OpportunityProducts::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OpportunityProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Opportunities::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Opportunities {
        Table,
        Id,
        Reference,
        SequenceNumber,
        EntityId,
        ClientId,
        ContactId,
        PrincipalProductId,
        EstimatedAmount,
        Probability,
        Status,
        StatusDates,
        Description,
        ClientNeeds,
        Relance,
        ClosedAt,
        CreatedAt,
        UpdatedAt,
        CreatedBy,
        Version,
    }

    #[derive(DeriveIden)]
    enum OpportunityProducts {
        Table,
        Id,
        OpportunityId,
        ProductId,
    }
}

mod m20250301_000003_create_offers_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_offers_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Offers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Offers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Offers::Reference).string().not_null())
                        .col(ColumnDef::new(Offers::SequenceNumber).integer().not_null())
                        .col(ColumnDef::new(Offers::EntityId).uuid().not_null())
                        .col(ColumnDef::new(Offers::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Offers::ContactId).uuid().null())
                        .col(
                            ColumnDef::new(Offers::PrincipalProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Offers::Amount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Offers::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Offers::StatusDates).json().not_null())
                        .col(ColumnDef::new(Offers::Notes).string().null())
                        .col(
                            ColumnDef::new(Offers::ValidatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Offers::Relance)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Offers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Offers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Offers::CreatedBy).string().null())
                        .col(
                            ColumnDef::new(Offers::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_offers_reference")
                        .table(Offers::Table)
                        .col(Offers::Reference)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_offers_relance")
                        .table(Offers::Table)
                        .col(Offers::Relance)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_offers_status")
                        .table(Offers::Table)
                        .col(Offers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OfferProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OfferProducts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OfferProducts::OfferId).uuid().not_null())
                        .col(ColumnDef::new(OfferProducts::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(OfferProducts::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_offer_products_pair")
                        .table(OfferProducts::Table)
                        .col(OfferProducts::OfferId)
                        .col(OfferProducts::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OfferProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Offers::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Offers {
        Table,
        Id,
        Reference,
        SequenceNumber,
        EntityId,
        ClientId,
        ContactId,
        PrincipalProductId,
        Amount,
        Status,
        StatusDates,
        Notes,
        ValidatedAt,
        Relance,
        CreatedAt,
        UpdatedAt,
        CreatedBy,
        Version,
    }

    #[derive(DeriveIden)]
    enum OfferProducts {
        Table,
        Id,
        OfferId,
        ProductId,
        UnitPrice,
    }
}

mod m20250301_000004_create_affaire_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_affaire_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Proformas::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Proformas::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Proformas::Reference).string().not_null())
                        .col(
                            ColumnDef::new(Proformas::SequenceNumber)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Proformas::EntityId).uuid().not_null())
                        .col(ColumnDef::new(Proformas::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Proformas::OfferId).uuid().not_null())
                        .col(ColumnDef::new(Proformas::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Proformas::StatusDates).json().not_null())
                        .col(
                            ColumnDef::new(Proformas::ValidatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Proformas::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Proformas::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Proformas::CreatedBy).string().null())
                        .col(
                            ColumnDef::new(Proformas::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_proformas_reference")
                        .table(Proformas::Table)
                        .col(Proformas::Reference)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_proformas_offer_id")
                        .table(Proformas::Table)
                        .col(Proformas::OfferId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Affaires::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Affaires::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Affaires::Reference).string().not_null())
                        .col(
                            ColumnDef::new(Affaires::SequenceNumber)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Affaires::EntityId).uuid().not_null())
                        .col(ColumnDef::new(Affaires::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Affaires::OfferId).uuid().not_null())
                        .col(ColumnDef::new(Affaires::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Affaires::StatusDates).json().not_null())
                        .col(
                            ColumnDef::new(Affaires::StartDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Affaires::ExpectedEndDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Affaires::ActualEndDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Affaires::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Affaires::InvoicedAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Affaires::PaidAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Affaires::Progress)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Affaires::Notes).string().null())
                        .col(ColumnDef::new(Affaires::Responsable).string().null())
                        .col(
                            ColumnDef::new(Affaires::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Affaires::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Affaires::CreatedBy).string().null())
                        .col(
                            ColumnDef::new(Affaires::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_affaires_reference")
                        .table(Affaires::Table)
                        .col(Affaires::Reference)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_affaires_offer_id")
                        .table(Affaires::Table)
                        .col(Affaires::OfferId)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_affaires_status")
                        .table(Affaires::Table)
                        .col(Affaires::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Reports::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Reports::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Reports::Reference).string().not_null())
                        .col(ColumnDef::new(Reports::SequenceNumber).integer().not_null())
                        .col(ColumnDef::new(Reports::EntityId).uuid().not_null())
                        .col(ColumnDef::new(Reports::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Reports::AffaireId).uuid().not_null())
                        .col(ColumnDef::new(Reports::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Reports::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Reports::StatusDates).json().not_null())
                        .col(
                            ColumnDef::new(Reports::ValidatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Reports::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reports::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Reports::CreatedBy).string().null())
                        .col(
                            ColumnDef::new(Reports::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_reports_reference")
                        .table(Reports::Table)
                        .col(Reports::Reference)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_reports_affaire_product")
                        .table(Reports::Table)
                        .col(Reports::AffaireId)
                        .col(Reports::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Formations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Formations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Formations::Title).string().not_null())
                        .col(ColumnDef::new(Formations::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Formations::AffaireId).uuid().not_null())
                        .col(ColumnDef::new(Formations::ReportId).uuid().not_null())
                        .col(
                            ColumnDef::new(Formations::StartDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Formations::EndDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Formations::Description).string().null())
                        .col(
                            ColumnDef::new(Formations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Formations::CreatedBy).string().null())
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_formations_report_id")
                        .table(Formations::Table)
                        .col(Formations::ReportId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Participants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Participants::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Participants::LastName).string().not_null())
                        .col(ColumnDef::new(Participants::FirstName).string().not_null())
                        .col(ColumnDef::new(Participants::Email).string().null())
                        .col(ColumnDef::new(Participants::Phone).string().null())
                        .col(ColumnDef::new(Participants::Function).string().null())
                        .col(ColumnDef::new(Participants::FormationId).uuid().not_null())
                        .col(
                            ColumnDef::new(Participants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Attestations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Attestations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Attestations::Reference).string().not_null())
                        .col(
                            ColumnDef::new(Attestations::SequenceNumber)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Attestations::EntityId).uuid().not_null())
                        .col(ColumnDef::new(Attestations::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Attestations::AffaireId).uuid().not_null())
                        .col(ColumnDef::new(Attestations::FormationId).uuid().not_null())
                        .col(
                            ColumnDef::new(Attestations::ParticipantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Attestations::ReportId).uuid().not_null())
                        .col(
                            ColumnDef::new(Attestations::DetailsFormation)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Attestations::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Attestations::StatusDates).json().not_null())
                        .col(
                            ColumnDef::new(Attestations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Attestations::CreatedBy).string().null())
                        .col(
                            ColumnDef::new(Attestations::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_attestations_reference")
                        .table(Attestations::Table)
                        .col(Attestations::Reference)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_attestations_formation_participant")
                        .table(Attestations::Table)
                        .col(Attestations::FormationId)
                        .col(Attestations::ParticipantId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Invoices::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Invoices::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Invoices::Reference).string().not_null())
                        .col(
                            ColumnDef::new(Invoices::SequenceNumber)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Invoices::EntityId).uuid().not_null())
                        .col(ColumnDef::new(Invoices::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Invoices::AffaireId).uuid().not_null())
                        .col(
                            ColumnDef::new(Invoices::Amount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Invoices::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Invoices::StatusDates).json().not_null())
                        .col(
                            ColumnDef::new(Invoices::ValidatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Invoices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Invoices::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Invoices::CreatedBy).string().null())
                        .col(
                            ColumnDef::new(Invoices::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_invoices_reference")
                        .table(Invoices::Table)
                        .col(Invoices::Reference)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_invoices_affaire_id")
                        .table(Invoices::Table)
                        .col(Invoices::AffaireId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                Table::drop().table(Invoices::Table).to_owned(),
                Table::drop().table(Attestations::Table).to_owned(),
                Table::drop().table(Participants::Table).to_owned(),
                Table::drop().table(Formations::Table).to_owned(),
                Table::drop().table(Reports::Table).to_owned(),
                Table::drop().table(Affaires::Table).to_owned(),
                Table::drop().table(Proformas::Table).to_owned(),
            ] {
                manager.drop_table(table).await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Proformas {
        Table,
        Id,
        Reference,
        SequenceNumber,
        EntityId,
        ClientId,
        OfferId,
        Status,
        StatusDates,
        ValidatedAt,
        CreatedAt,
        UpdatedAt,
        CreatedBy,
        Version,
    }

    #[derive(DeriveIden)]
    enum Affaires {
        Table,
        Id,
        Reference,
        SequenceNumber,
        EntityId,
        ClientId,
        OfferId,
        Status,
        StatusDates,
        StartDate,
        ExpectedEndDate,
        ActualEndDate,
        TotalAmount,
        InvoicedAmount,
        PaidAmount,
        Progress,
        Notes,
        Responsable,
        CreatedAt,
        UpdatedAt,
        CreatedBy,
        Version,
    }

    #[derive(DeriveIden)]
    enum Reports {
        Table,
        Id,
        Reference,
        SequenceNumber,
        EntityId,
        ClientId,
        AffaireId,
        ProductId,
        Status,
        StatusDates,
        ValidatedAt,
        CreatedAt,
        UpdatedAt,
        CreatedBy,
        Version,
    }

    #[derive(DeriveIden)]
    enum Formations {
        Table,
        Id,
        Title,
        ClientId,
        AffaireId,
        ReportId,
        StartDate,
        EndDate,
        Description,
        CreatedAt,
        CreatedBy,
    }

    #[derive(DeriveIden)]
    enum Participants {
        Table,
        Id,
        LastName,
        FirstName,
        Email,
        Phone,
        Function,
        FormationId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Attestations {
        Table,
        Id,
        Reference,
        SequenceNumber,
        EntityId,
        ClientId,
        AffaireId,
        FormationId,
        ParticipantId,
        ReportId,
        DetailsFormation,
        Status,
        StatusDates,
        CreatedAt,
        CreatedBy,
        Version,
    }

    #[derive(DeriveIden)]
    enum Invoices {
        Table,
        Id,
        Reference,
        SequenceNumber,
        EntityId,
        ClientId,
        AffaireId,
        Amount,
        Status,
        StatusDates,
        ValidatedAt,
        CreatedAt,
        UpdatedAt,
        CreatedBy,
        Version,
    }
}

mod m20250301_000005_create_courriers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_courriers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Courriers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Courriers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Courriers::Reference).string().not_null())
                        .col(
                            ColumnDef::new(Courriers::SequenceNumber)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Courriers::EntityId).uuid().not_null())
                        .col(ColumnDef::new(Courriers::DocType).string_len(3).not_null())
                        .col(ColumnDef::new(Courriers::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Courriers::Notes).string().null())
                        .col(
                            ColumnDef::new(Courriers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Courriers::CreatedBy).string().null())
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_courriers_reference")
                        .table(Courriers::Table)
                        .col(Courriers::Reference)
                        .unique()
                        .to_owned(),
                )
                .await?;
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Courriers::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Courriers {
        Table,
        Id,
        Reference,
        SequenceNumber,
        EntityId,
        DocType,
        ClientId,
        Notes,
        CreatedAt,
        CreatedBy,
    }
}

mod m20250301_000006_create_sequence_counters_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000006_create_sequence_counters_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SequenceCounters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SequenceCounters::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SequenceCounters::EntityCode)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SequenceCounters::DocType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SequenceCounters::Scope).string().not_null())
                        .col(
                            ColumnDef::new(SequenceCounters::LastValue)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SequenceCounters::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;
            // The backstop for every allocation: one counter row per scope.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_sequence_counters_scope")
                        .table(SequenceCounters::Table)
                        .col(SequenceCounters::EntityCode)
                        .col(SequenceCounters::DocType)
                        .col(SequenceCounters::Scope)
                        .unique()
                        .to_owned(),
                )
                .await?;
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SequenceCounters::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum SequenceCounters {
        Table,
        Id,
        EntityCode,
        DocType,
        Scope,
        LastValue,
        UpdatedAt,
    }
}

mod m20250301_000007_create_history_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000007_create_history_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AuditLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AuditLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AuditLogs::EntityKind)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(AuditLogs::EntityId).uuid().not_null())
                        .col(ColumnDef::new(AuditLogs::Action).string_len(16).not_null())
                        .col(ColumnDef::new(AuditLogs::Actor).string().null())
                        .col(ColumnDef::new(AuditLogs::Changes).json().null())
                        .col(
                            ColumnDef::new(AuditLogs::CreatedAt)
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
                        .name("idx_audit_logs_entity")
                        .table(AuditLogs::Table)
                        .col(AuditLogs::EntityKind)
                        .col(AuditLogs::EntityId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StatusChanges::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StatusChanges::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StatusChanges::EntityKind)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StatusChanges::EntityId).uuid().not_null())
                        .col(ColumnDef::new(StatusChanges::OldStatus).string().not_null())
                        .col(ColumnDef::new(StatusChanges::NewStatus).string().not_null())
                        .col(ColumnDef::new(StatusChanges::Actor).string().null())
                        .col(ColumnDef::new(StatusChanges::Comment).string().null())
                        .col(
                            ColumnDef::new(StatusChanges::CreatedAt)
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
                        .name("idx_status_changes_entity")
                        .table(StatusChanges::Table)
                        .col(StatusChanges::EntityKind)
                        .col(StatusChanges::EntityId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StatusChanges::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum AuditLogs {
        Table,
        Id,
        EntityKind,
        EntityId,
        Action,
        Actor,
        Changes,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum StatusChanges {
        Table,
        Id,
        EntityKind,
        EntityId,
        OldStatus,
        NewStatus,
        Actor,
        Comment,
        CreatedAt,
    }
}
