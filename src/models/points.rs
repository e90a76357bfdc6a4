use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{
    PointTransactionType, point_transaction_entity as tx_entity,
    user_points_entity as points_entity,
};

/// Points balance of the current user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPointsResponse {
    pub user_id: i64,
    /// Lifetime points earned
    pub total_points_earned: i64,
    /// Spendable points
    pub current_balance: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<points_entity::Model> for UserPointsResponse {
    fn from(m: points_entity::Model) -> Self {
        Self {
            user_id: m.user_id,
            total_points_earned: m.total_points_earned,
            current_balance: m.current_balance,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PointTransactionResponse {
    pub id: i64,
    /// Signed delta: positive for earned/bonus, negative for redeemed/expired
    pub points: i64,
    pub transaction_type: PointTransactionType,
    pub order_id: Option<i64>,
    pub promotion_id: Option<i64>,
    pub promotion_name: Option<String>,
    pub redemption_id: Option<i64>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<tx_entity::Model> for PointTransactionResponse {
    fn from(m: tx_entity::Model) -> Self {
        Self {
            id: m.id,
            points: m.points,
            transaction_type: m.transaction_type,
            order_id: m.order_id,
            promotion_id: m.promotion_id,
            promotion_name: m.promotion_name,
            redemption_id: m.redemption_id,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct TransactionQuery {
    /// Max rows to return (default 50)
    pub limit: Option<u64>,
    /// earned / redeemed / expired / bonus / adjustment
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
}

/// Called by the order placement flow once an order is committed.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct EarnPointsRequest {
    pub order_id: Option<i64>,
    /// Order total in currency units, e.g. 99.99
    pub order_total: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct PointsEarnedResponse {
    pub points_earned: i64,
    pub base_points: i64,
    pub bonus_multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_applied: Option<String>,
    pub new_balance: i64,
}

/// Manual balance change by an administrator.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PointsAdjustmentRequest {
    pub user_id: i64,
    /// Signed delta
    pub points: i64,
    /// bonus or adjustment (default adjustment)
    pub transaction_type: Option<PointTransactionType>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PointsAdjustmentResponse {
    pub transaction: PointTransactionResponse,
    pub balance: UserPointsResponse,
}
