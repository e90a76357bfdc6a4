use crate::config::LoyaltyConfig;
use crate::error::AppResult;
use crate::models::{LoyaltyDashboardResponse, RedemptionQuery, TransactionQuery};
use crate::services::{PointsService, PromotionService, RedemptionService, RewardService};
use chrono::{DateTime, Utc};

/// Aggregates the rewards page. First touch creates the user's points row.
#[derive(Clone)]
pub struct DashboardService {
    points_service: PointsService,
    promotion_service: PromotionService,
    reward_service: RewardService,
    redemption_service: RedemptionService,
    config: LoyaltyConfig,
}

impl DashboardService {
    pub fn new(
        points_service: PointsService,
        promotion_service: PromotionService,
        reward_service: RewardService,
        redemption_service: RedemptionService,
        config: LoyaltyConfig,
    ) -> Self {
        Self {
            points_service,
            promotion_service,
            reward_service,
            redemption_service,
            config,
        }
    }

    pub async fn dashboard(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<LoyaltyDashboardResponse> {
        let points = self.points_service.ensure(user_id).await?;

        let active_promotions = self
            .promotion_service
            .active_promotions(now)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        let available_rewards = self
            .reward_service
            .list_available(now, Some(points.current_balance))
            .await?;
        let recent_transactions = self
            .points_service
            .list_transactions(
                user_id,
                &TransactionQuery {
                    limit: Some(self.config.dashboard_transactions),
                    transaction_type: None,
                },
            )
            .await?;
        let pending_redemptions = self
            .redemption_service
            .list_redemptions(user_id, &RedemptionQuery { unused: Some(true) })
            .await?;

        Ok(LoyaltyDashboardResponse {
            points,
            active_promotions,
            available_rewards,
            recent_transactions,
            pending_redemptions,
        })
    }
}
