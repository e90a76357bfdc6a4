use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    PointTransactionResponse, PromotionResponse, RedemptionResponse, RewardResponse,
    UserPointsResponse,
};

/// Everything the rewards page shows in one call
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoyaltyDashboardResponse {
    pub points: UserPointsResponse,
    pub active_promotions: Vec<PromotionResponse>,
    pub available_rewards: Vec<RewardResponse>,
    pub recent_transactions: Vec<PointTransactionResponse>,
    pub pending_redemptions: Vec<RedemptionResponse>,
}
