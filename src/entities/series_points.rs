use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "series_points")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub query_id: String,
    pub date: String, // YYYY-MM-DD
    pub value: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
