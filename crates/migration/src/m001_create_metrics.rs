use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_create_metrics"
    }
}

#[derive(DeriveIden)]
enum Metrics {
    Table,
    Id,
    MetricType,
    Delta,
    Gauge,
    Hash,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // exactly one of delta / gauge is set, matching metric_type
        manager
            .create_table(
                Table::create()
                    .table(Metrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Metrics::Id)
                            .string_len(255)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Metrics::MetricType).string_len(16).not_null())
                    .col(ColumnDef::new(Metrics::Delta).big_integer().null())
                    .col(ColumnDef::new(Metrics::Gauge).double().null())
                    // hex HMAC-SHA256
                    .col(ColumnDef::new(Metrics::Hash).string_len(64).null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Metrics::Table).if_exists().to_owned())
            .await
    }
}
