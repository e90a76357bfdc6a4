use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{RewardType, reward_entity};

/// Reward catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewardResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub reward_type: RewardType,
    pub points_cost: i64,
    /// Cents for fixed_discount, percent for percentage_discount
    pub discount_value: Option<i64>,
    pub menu_item_id: Option<i64>,
    /// Menu item name for free_product rewards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_item_name: Option<String>,
    /// Cents
    pub min_order_value: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Present when the caller's balance is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_afford: Option<bool>,
}

impl From<reward_entity::Model> for RewardResponse {
    fn from(m: reward_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            reward_type: m.reward_type,
            points_cost: m.points_cost,
            discount_value: m.discount_value,
            menu_item_id: m.menu_item_id,
            menu_item_name: None,
            min_order_value: m.min_order_value,
            valid_from: m.valid_from,
            valid_until: m.valid_until,
            can_afford: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateRewardRequest {
    pub name: String,
    pub description: Option<String>,
    pub reward_type: RewardType,
    pub points_cost: i64,
    pub discount_value: Option<i64>,
    pub menu_item_id: Option<i64>,
    pub min_order_value: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}
