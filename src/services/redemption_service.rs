use crate::config::LoyaltyConfig;
use crate::entities::{PointTransactionType, RewardSnapshot, reward_redemption_entity as redemptions};
use crate::error::{AppError, AppResult};
use crate::models::{
    RedeemRewardResponse, RedemptionQuery, RedemptionResponse, UseRedemptionResponse,
};
use crate::services::coupon_service::{CouponService, consume_coupon};
use crate::services::points_service::{
    NewTransaction, append_transaction, apply_points_delta, lock_points_row,
};
use crate::services::reward_service::{find_available_reward, menu_item_name};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

/// Spends points on rewards and later marks those redemptions as used by an order.
#[derive(Clone)]
pub struct RedemptionService {
    pool: DatabaseConnection,
    config: LoyaltyConfig,
    coupon_service: CouponService,
}

impl RedemptionService {
    pub fn new(
        pool: DatabaseConnection,
        config: LoyaltyConfig,
        coupon_service: CouponService,
    ) -> Self {
        Self {
            pool,
            config,
            coupon_service,
        }
    }

    /// Redeems a reward for the user. Validation, the balance deduction, the
    /// ledger entry and the optional coupon all commit together or not at all.
    pub async fn redeem(
        &self,
        user_id: i64,
        reward_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<RedeemRewardResponse> {
        let txn = self.pool.begin().await?;

        let reward = find_available_reward(&txn, reward_id, now)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Reward not found or no longer available".to_string())
            })?;

        let balance = lock_points_row(&txn, user_id)
            .await?
            .ok_or_else(|| AppError::InvalidState("No points record for user".to_string()))?;
        if balance.current_balance < reward.points_cost {
            return Err(AppError::InsufficientPoints {
                required: reward.points_cost,
                available: balance.current_balance,
            });
        }

        let mut snapshot = RewardSnapshot {
            name: reward.name.clone(),
            reward_type: reward.reward_type,
            discount_value: reward.discount_value,
            min_order_value: reward.min_order_value,
            menu_item_id: reward.menu_item_id,
            menu_item_name: menu_item_name(&txn, reward.menu_item_id).await?,
            coupon_code: None,
        };

        let mut redemption = redemptions::ActiveModel {
            user_id: Set(user_id),
            reward_id: Set(reward.id),
            points_spent: Set(reward.points_cost),
            reward_snapshot: Set(snapshot.clone()),
            redeemed_at: Set(now),
            used_at: Set(None),
            order_id: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let updated = apply_points_delta(&txn, balance, -reward.points_cost, false, now).await?;

        let mut entry =
            NewTransaction::new(user_id, -reward.points_cost, PointTransactionType::Redeemed);
        entry.redemption_id = Some(redemption.id);
        entry.description = Some(format!("Redeemed reward: {}", reward.name));
        append_transaction(&txn, entry, now).await?;

        if reward.reward_type.mints_coupon() {
            let coupon = self
                .coupon_service
                .mint_for_reward(&txn, &reward, now)
                .await?;
            snapshot.coupon_code = Some(coupon.coupon_code);
            let mut am = redemption.into_active_model();
            am.reward_snapshot = Set(snapshot);
            redemption = am.update(&txn).await?;
        }

        txn.commit().await?;

        log::info!(
            "Reward redeemed: user={} reward={} redemption={} points={} balance={}",
            user_id,
            reward.id,
            redemption.id,
            reward.points_cost,
            updated.current_balance
        );

        Ok(RedeemRewardResponse {
            points_spent: redemption.points_spent,
            remaining_balance: updated.current_balance,
            redemption: redemption.into(),
        })
    }

    /// Newest first.
    pub async fn list_redemptions(
        &self,
        user_id: i64,
        query: &RedemptionQuery,
    ) -> AppResult<Vec<RedemptionResponse>> {
        let mut select =
            redemptions::Entity::find().filter(redemptions::Column::UserId.eq(user_id));
        if query.unused == Some(true) {
            select = select.filter(redemptions::Column::UsedAt.is_null());
        }
        let rows = select
            .order_by_desc(redemptions::Column::RedeemedAt)
            .order_by_desc(redemptions::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Marks a redemption as used by an order and counts a use of its coupon.
    ///
    /// With `atomic_redemption_use` (the default) a coupon that can no longer be
    /// consumed rolls the whole call back. Otherwise the redemption stays used and
    /// the coupon failure is only logged.
    pub async fn use_redemption(
        &self,
        user_id: i64,
        redemption_id: i64,
        order_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<UseRedemptionResponse> {
        let txn = self.pool.begin().await?;

        let redemption = redemptions::Entity::find_by_id(redemption_id)
            .filter(redemptions::Column::UserId.eq(user_id))
            .filter(redemptions::Column::UsedAt.is_null())
            .one(&txn)
            .await?
            .ok_or_else(not_found_or_used)?;

        // Guarded on used_at so a concurrent call cannot mark it twice.
        let marked = redemptions::Entity::update_many()
            .col_expr(redemptions::Column::UsedAt, Expr::value(now))
            .col_expr(redemptions::Column::OrderId, Expr::value(order_id))
            .filter(redemptions::Column::Id.eq(redemption.id))
            .filter(redemptions::Column::UsedAt.is_null())
            .exec(&txn)
            .await?;
        if marked.rows_affected == 0 {
            return Err(not_found_or_used());
        }

        let coupon_code = redemption.reward_snapshot.coupon_code.clone();
        match coupon_code.as_deref() {
            Some(code) if self.config.atomic_redemption_use => {
                consume_coupon(&txn, code, now).await?;
                txn.commit().await?;
            }
            Some(code) => {
                txn.commit().await?;
                if let Err(err) = consume_coupon(&self.pool, code, now).await {
                    log::error!(
                        "Redemption {} used but coupon {code} was not counted: {err}",
                        redemption.id
                    );
                }
            }
            None => txn.commit().await?,
        }

        log::info!(
            "Redemption used: user={} redemption={} order={}",
            user_id,
            redemption.id,
            order_id
        );

        Ok(UseRedemptionResponse {
            success: true,
            redemption_id: redemption.id,
            order_id,
            coupon_code,
        })
    }
}

fn not_found_or_used() -> AppError {
    AppError::NotFound("Redemption not found or already used".to_string())
}
