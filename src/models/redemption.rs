use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{RewardSnapshot, reward_redemption_entity};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RedemptionResponse {
    pub id: i64,
    pub reward_id: i64,
    pub points_spent: i64,
    /// Reward terms at redemption time
    pub reward_snapshot: RewardSnapshot,
    /// Coupon minted for discount rewards
    pub coupon_code: Option<String>,
    pub redeemed_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub order_id: Option<i64>,
}

impl From<reward_redemption_entity::Model> for RedemptionResponse {
    fn from(m: reward_redemption_entity::Model) -> Self {
        Self {
            id: m.id,
            reward_id: m.reward_id,
            points_spent: m.points_spent,
            coupon_code: m.reward_snapshot.coupon_code.clone(),
            reward_snapshot: m.reward_snapshot,
            redeemed_at: m.redeemed_at,
            used_at: m.used_at,
            order_id: m.order_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RedeemRewardRequest {
    pub reward_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RedeemRewardResponse {
    pub redemption: RedemptionResponse,
    pub points_spent: i64,
    pub remaining_balance: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct RedemptionQuery {
    /// Only redemptions not yet used by an order
    pub unused: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UseRedemptionRequest {
    pub redemption_id: Option<i64>,
    pub order_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UseRedemptionResponse {
    pub success: bool,
    pub redemption_id: i64,
    pub order_id: i64,
    pub coupon_code: Option<String>,
}
