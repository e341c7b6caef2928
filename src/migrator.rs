use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_resources_table::Migration),
            Box::new(m20240601_000002_create_assignments_table::Migration),
            Box::new(m20240601_000003_create_stock_movements_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240601_000001_create_resources_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_resources_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Resources::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Resources::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Resources::Category).string().not_null())
                        .col(ColumnDef::new(Resources::Name).string().not_null())
                        .col(
                            ColumnDef::new(Resources::TotalQuantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Resources::Vendor).string().null())
                        .col(
                            ColumnDef::new(Resources::ExpiresAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Resources::MinStockThreshold)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(Resources::SerialNumber).string().null())
                        .col(ColumnDef::new(Resources::Notes).string().null())
                        .col(
                            ColumnDef::new(Resources::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Resources::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_resources_category")
                        .table(Resources::Table)
                        .col(Resources::Category)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_resources_expires_at")
                        .table(Resources::Table)
                        .col(Resources::ExpiresAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Resources::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Resources {
        Table,
        Id,
        Category,
        Name,
        TotalQuantity,
        Vendor,
        ExpiresAt,
        MinStockThreshold,
        SerialNumber,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_assignments_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_assignments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No FK to resources: assignment history outlives a deleted
            // catalog entry.
            manager
                .create_table(
                    Table::create()
                        .table(Assignments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Assignments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Assignments::ResourceId).uuid().not_null())
                        .col(ColumnDef::new(Assignments::EmployeeId).uuid().null())
                        .col(ColumnDef::new(Assignments::DeviceId).uuid().null())
                        .col(
                            ColumnDef::new(Assignments::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Assignments::Status).string().not_null())
                        .col(
                            ColumnDef::new(Assignments::AssignedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Assignments::ReturnedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Assignments::ConditionOnReturn)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Assignments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Assignments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            // The availability aggregate filters on (resource_id, status).
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assignments_resource_status")
                        .table(Assignments::Table)
                        .col(Assignments::ResourceId)
                        .col(Assignments::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assignments_employee")
                        .table(Assignments::Table)
                        .col(Assignments::EmployeeId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assignments_device")
                        .table(Assignments::Table)
                        .col(Assignments::DeviceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Assignments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Assignments {
        Table,
        Id,
        ResourceId,
        EmployeeId,
        DeviceId,
        Quantity,
        Status,
        AssignedAt,
        ReturnedAt,
        ConditionOnReturn,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_stock_movements_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_stock_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::ResourceId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Delta).integer().not_null())
                        .col(
                            ColumnDef::new(StockMovements::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Reason).string().null())
                        .col(ColumnDef::new(StockMovements::Actor).string().null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
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
                        .name("idx_stock_movements_resource_created")
                        .table(StockMovements::Table)
                        .col(StockMovements::ResourceId)
                        .col(StockMovements::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        ResourceId,
        Delta,
        MovementType,
        Reason,
        Actor,
        CreatedAt,
    }
}
