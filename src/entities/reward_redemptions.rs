use super::rewards::RewardType;
use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Frozen copy of a reward's terms taken at redemption time.
/// Later catalog edits never change an already redeemed reward.
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct RewardSnapshot {
    pub name: String,
    pub reward_type: RewardType,
    pub discount_value: Option<i64>,
    pub min_order_value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_item_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

/// A user's spend of points on a reward.
/// Only used_at / order_id ever change after insert, exactly once.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "reward_redemptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub reward_id: i64,
    pub points_spent: i64,
    #[sea_orm(column_type = "JsonBinary")]
    pub reward_snapshot: RewardSnapshot,
    pub redeemed_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub order_id: Option<i64>,
}

impl Model {
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
