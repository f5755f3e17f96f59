use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrendQueries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrendQueries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrendQueries::Keyword).string().not_null())
                    .col(
                        ColumnDef::new(TrendQueries::Country)
                            .string_len(2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrendQueries::WindowDays)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrendQueries::BaselineDays)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrendQueries::Status).string().not_null())
                    .col(ColumnDef::new(TrendQueries::CreatedAt).string().not_null())
                    .col(ColumnDef::new(TrendQueries::FinishedAt).string())
                    .col(ColumnDef::new(TrendQueries::ErrorMessage).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TrendResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrendResults::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrendResults::QueryId).string().not_null())
                    .col(ColumnDef::new(TrendResults::TrendScore).double().not_null())
                    .col(
                        ColumnDef::new(TrendResults::Growth7Vs30)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrendResults::Slope14d).double().not_null())
                    .col(
                        ColumnDef::new(TrendResults::RecentPeak30d)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrendResults::Explanations).text().not_null())
                    .col(ColumnDef::new(TrendResults::SourcesUsed).text().not_null())
                    .col(ColumnDef::new(TrendResults::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trend_results_query_id")
                    .table(TrendResults::Table)
                    .col(TrendResults::QueryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SeriesPoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SeriesPoints::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SeriesPoints::QueryId).string().not_null())
                    .col(ColumnDef::new(SeriesPoints::Date).string().not_null())
                    .col(ColumnDef::new(SeriesPoints::Value).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_series_points_query_id")
                    .table(SeriesPoints::Table)
                    .col(SeriesPoints::QueryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CountryPoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CountryPoints::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CountryPoints::QueryId).string().not_null())
                    .col(
                        ColumnDef::new(CountryPoints::Country)
                            .string_len(2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CountryPoints::Value).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_country_points_query_id")
                    .table(CountryPoints::Table)
                    .col(CountryPoints::QueryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CacheEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CacheEntries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CacheEntries::CacheKey).string().not_null())
                    .col(ColumnDef::new(CacheEntries::Payload).text().not_null())
                    .col(ColumnDef::new(CacheEntries::CachedAt).string().not_null())
                    .col(ColumnDef::new(CacheEntries::ExpiresAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cache_entries_key")
                    .table(CacheEntries::Table)
                    .col(CacheEntries::CacheKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CacheEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CountryPoints::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SeriesPoints::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TrendResults::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TrendQueries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TrendQueries {
    Table,
    Id,
    Keyword,
    Country,
    WindowDays,
    BaselineDays,
    Status,
    CreatedAt,
    FinishedAt,
    ErrorMessage,
}

#[derive(DeriveIden)]
enum TrendResults {
    Table,
    Id,
    QueryId,
    TrendScore,
    #[sea_orm(iden = "growth_7_vs_30")]
    Growth7Vs30,
    #[sea_orm(iden = "slope_14d")]
    Slope14d,
    #[sea_orm(iden = "recent_peak_30d")]
    RecentPeak30d,
    Explanations,
    SourcesUsed,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SeriesPoints {
    Table,
    Id,
    QueryId,
    Date,
    Value,
}

#[derive(DeriveIden)]
enum CountryPoints {
    Table,
    Id,
    QueryId,
    Country,
    Value,
}

#[derive(DeriveIden)]
enum CacheEntries {
    Table,
    Id,
    CacheKey,
    Payload,
    CachedAt,
    ExpiresAt,
}
