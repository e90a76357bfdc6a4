use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// Per-user points balance. Created lazily with zero balances, never deleted.
/// - total_points_earned: lifetime earning, never decreases on redemption
/// - current_balance: spendable points, never negative
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "user_points")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub user_id: i64,
    pub total_points_earned: i64,
    pub current_balance: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
