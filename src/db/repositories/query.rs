use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::entities::{country_points, prelude::*, series_points, trend_queries, trend_results};
use crate::models::{QueryStatus, TrendParams, TrendResponse};

/// A persisted series datum, as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesPointRow {
    pub date: String,
    pub value: i32,
}

/// A persisted country-comparison datum, as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryPointRow {
    pub country: String,
    pub value: i32,
}

pub struct QueryRepository {
    conn: DatabaseConnection,
}

impl QueryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a new query row in the Running state and returns its id.
    pub async fn create_running(&self, params: &TrendParams) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();

        let active_model = trend_queries::ActiveModel {
            id: Set(id.clone()),
            keyword: Set(params.keyword.clone()),
            country: Set(params.country.clone()),
            window_days: Set(params.window_days),
            baseline_days: Set(params.baseline_days),
            status: Set(QueryStatus::Running.as_str().to_string()),
            created_at: Set(Utc::now().to_rfc3339()),
            finished_at: Set(None),
            error_message: Set(None),
        };

        TrendQueries::insert(active_model).exec(&self.conn).await?;

        Ok(id)
    }

    /// Writes the scored result plus all series and country points in a
    /// single transaction. Either everything lands or nothing does.
    pub async fn persist_result(&self, query_id: &str, response: &TrendResponse) -> Result<()> {
        let explanations = serde_json::to_string(&response.explain)?;
        let sources_used = serde_json::to_string(&response.sources_used)?;
        let now = Utc::now().to_rfc3339();

        let txn = self.conn.begin().await?;

        let result_model = trend_results::ActiveModel {
            query_id: Set(query_id.to_string()),
            trend_score: Set(response.trend_score),
            growth_7_vs_30: Set(response.signals.growth_7_vs_30),
            slope_14d: Set(response.signals.slope_14d),
            recent_peak_30d: Set(response.signals.recent_peak_30d),
            explanations: Set(explanations),
            sources_used: Set(sources_used),
            created_at: Set(now),
            ..Default::default()
        };

        TrendResults::insert(result_model).exec(&txn).await?;

        if !response.series.is_empty() {
            let rows = response.series.iter().map(|p| series_points::ActiveModel {
                query_id: Set(query_id.to_string()),
                date: Set(p.date.format("%Y-%m-%d").to_string()),
                value: Set(p.value),
                ..Default::default()
            });
            SeriesPoints::insert_many(rows).exec(&txn).await?;
        }

        if !response.by_country.is_empty() {
            let rows = response
                .by_country
                .iter()
                .map(|p| country_points::ActiveModel {
                    query_id: Set(query_id.to_string()),
                    country: Set(p.country.clone()),
                    value: Set(p.value),
                    ..Default::default()
                });
            CountryPoints::insert_many(rows).exec(&txn).await?;
        }

        txn.commit().await?;

        Ok(())
    }

    pub async fn mark_done(&self, query_id: &str) -> Result<()> {
        self.finish(query_id, QueryStatus::Done, None).await
    }

    pub async fn mark_error(&self, query_id: &str, message: &str) -> Result<()> {
        self.finish(query_id, QueryStatus::Error, Some(message.to_string()))
            .await
    }

    /// Transitions a Running query into a terminal state. Rows already in a
    /// terminal state are left untouched.
    async fn finish(
        &self,
        query_id: &str,
        status: QueryStatus,
        error_message: Option<String>,
    ) -> Result<()> {
        TrendQueries::update_many()
            .col_expr(trend_queries::Column::Status, Expr::value(status.as_str()))
            .col_expr(
                trend_queries::Column::FinishedAt,
                Expr::value(Some(Utc::now().to_rfc3339())),
            )
            .col_expr(trend_queries::Column::ErrorMessage, Expr::value(error_message))
            .filter(trend_queries::Column::Id.eq(query_id))
            .filter(trend_queries::Column::Status.eq(QueryStatus::Running.as_str()))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn get_query(&self, query_id: &str) -> Result<Option<trend_queries::Model>> {
        let row = TrendQueries::find_by_id(query_id).one(&self.conn).await?;
        Ok(row)
    }

    pub async fn list_queries(&self) -> Result<Vec<trend_queries::Model>> {
        let rows = TrendQueries::find()
            .order_by_asc(trend_queries::Column::CreatedAt)
            .all(&self.conn)
            .await?;
        Ok(rows)
    }

    pub async fn get_result(&self, query_id: &str) -> Result<Option<trend_results::Model>> {
        let row = TrendResults::find()
            .filter(trend_results::Column::QueryId.eq(query_id))
            .one(&self.conn)
            .await?;
        Ok(row)
    }

    pub async fn get_series(&self, query_id: &str) -> Result<Vec<SeriesPointRow>> {
        let rows = SeriesPoints::find()
            .filter(series_points::Column::QueryId.eq(query_id))
            .order_by_asc(series_points::Column::Date)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|m| SeriesPointRow {
                date: m.date,
                value: m.value,
            })
            .collect())
    }

    pub async fn get_country_points(&self, query_id: &str) -> Result<Vec<CountryPointRow>> {
        let rows = CountryPoints::find()
            .filter(country_points::Column::QueryId.eq(query_id))
            .order_by_desc(country_points::Column::Value)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|m| CountryPointRow {
                country: m.country,
                value: m.value,
            })
            .collect())
    }
}
