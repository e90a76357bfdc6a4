use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PointTransactionType {
    #[sea_orm(string_value = "earned")]
    Earned,
    #[sea_orm(string_value = "redeemed")]
    Redeemed,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "bonus")]
    Bonus,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

impl std::fmt::Display for PointTransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointTransactionType::Earned => write!(f, "earned"),
            PointTransactionType::Redeemed => write!(f, "redeemed"),
            PointTransactionType::Expired => write!(f, "expired"),
            PointTransactionType::Bonus => write!(f, "bonus"),
            PointTransactionType::Adjustment => write!(f, "adjustment"),
        }
    }
}

impl std::str::FromStr for PointTransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earned" => Ok(PointTransactionType::Earned),
            "redeemed" => Ok(PointTransactionType::Redeemed),
            "expired" => Ok(PointTransactionType::Expired),
            "bonus" => Ok(PointTransactionType::Bonus),
            "adjustment" => Ok(PointTransactionType::Adjustment),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// Append-only ledger entry. Rows are never updated or deleted.
/// points is signed: positive for earned/bonus, negative for redeemed/expired.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "point_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub points: i64,
    pub transaction_type: PointTransactionType,
    pub order_id: Option<i64>,
    pub promotion_id: Option<i64>,
    pub promotion_name: Option<String>,
    pub redemption_id: Option<i64>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
