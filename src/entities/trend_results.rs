use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trend_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub query_id: String,
    pub trend_score: f64,
    pub growth_7_vs_30: f64,
    pub slope_14d: f64,
    pub recent_peak_30d: f64,
    #[sea_orm(column_type = "Text")]
    pub explanations: String, // JSON array of strings
    #[sea_orm(column_type = "Text")]
    pub sources_used: String, // JSON array of strings
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
