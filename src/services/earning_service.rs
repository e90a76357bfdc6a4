use crate::config::LoyaltyConfig;
use crate::entities::{
    PointTransactionType, order_entity as orders, point_transaction_entity as txs,
    user_points_entity as points,
};
use crate::error::{AppError, AppResult};
use crate::models::PointsEarnedResponse;
use crate::services::points_service::{
    NewTransaction, append_transaction, apply_points_delta, ensure_points_row, lock_points_row,
};
use crate::services::promotion_service::PromotionService;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, SqlErr, TransactionTrait,
};

async fn already_awarded<C: ConnectionTrait>(conn: &C, order_id: i64) -> Result<bool, DbErr> {
    let count = txs::Entity::find()
        .filter(txs::Column::OrderId.eq(order_id))
        .filter(txs::Column::TransactionType.eq(PointTransactionType::Earned))
        .count(conn)
        .await?;
    Ok(count > 0)
}

fn already_awarded_error() -> AppError {
    AppError::Conflict("Points already awarded for this order".to_string())
}

/// Appends the earned row. The partial unique index on earned order ids
/// rejects a second one even if the pre-check was raced.
async fn append_earned<C: ConnectionTrait>(
    conn: &C,
    entry: NewTransaction,
    now: DateTime<Utc>,
) -> AppResult<txs::Model> {
    append_transaction(conn, entry, now)
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => already_awarded_error(),
            _ => AppError::from(err),
        })
}

/// Credits points for a committed order, at most once per order.
#[derive(Clone)]
pub struct EarningService {
    pool: DatabaseConnection,
    config: LoyaltyConfig,
    promotion_service: PromotionService,
}

impl EarningService {
    pub fn new(
        pool: DatabaseConnection,
        config: LoyaltyConfig,
        promotion_service: PromotionService,
    ) -> Self {
        Self {
            pool,
            config,
            promotion_service,
        }
    }

    /// One point per `points_divisor_cents` of the order total, truncated.
    pub fn base_points(&self, order_total_cents: i64) -> i64 {
        order_total_cents.max(0) / self.config.points_divisor_cents.max(1)
    }

    pub async fn earn_points(
        &self,
        user_id: i64,
        order_id: i64,
        order_total_cents: i64,
        now: DateTime<Utc>,
    ) -> AppResult<PointsEarnedResponse> {
        let txn = self.pool.begin().await?;

        let order = orders::Entity::find_by_id(order_id)
            .filter(orders::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        // Never credit more than the order was recorded at.
        let credited_cents = order_total_cents.min(order.total_amount);
        let base_points = self.base_points(credited_cents);
        if base_points <= 0 {
            if already_awarded(&txn, order_id).await? {
                return Err(already_awarded_error());
            }
            let balance = points::Entity::find()
                .filter(points::Column::UserId.eq(user_id))
                .one(&txn)
                .await?
                .map(|row| row.current_balance)
                .unwrap_or(0);
            txn.commit().await?;
            return Ok(PointsEarnedResponse {
                points_earned: 0,
                base_points: 0,
                bonus_multiplier: 1.0,
                promotion_applied: None,
                new_balance: balance,
            });
        }

        ensure_points_row(&txn, user_id).await?;
        let row = lock_points_row(&txn, user_id)
            .await?
            .ok_or_else(|| AppError::InternalError("Points row vanished after insert".into()))?;

        // Checked under the balance lock so retries of the same order serialize here.
        if already_awarded(&txn, order_id).await? {
            return Err(already_awarded_error());
        }

        let best = self.promotion_service.best_multiplier_in(&txn, now).await?;
        let points_earned = best
            .apply(base_points)
            .ok_or_else(|| AppError::ValidationError("Order total is too large".to_string()))?;

        let updated = apply_points_delta(&txn, row, points_earned, true, now).await?;

        let mut entry = NewTransaction::new(user_id, points_earned, PointTransactionType::Earned);
        entry.order_id = Some(order_id);
        entry.promotion_id = best.promotion_id;
        entry.promotion_name = best.promotion_name.clone();
        entry.description = Some(match best.promotion_name.as_deref() {
            Some(name) => format!("Earned from order #{order_id} ({name})"),
            None => format!("Earned from order #{order_id}"),
        });
        append_earned(&txn, entry, now).await?;

        txn.commit().await?;

        log::info!(
            "Points earned: user={} order={} base={} multiplier={} points={} balance={}",
            user_id,
            order_id,
            base_points,
            best.multiplier(),
            points_earned,
            updated.current_balance
        );

        Ok(PointsEarnedResponse {
            points_earned,
            base_points,
            bonus_multiplier: best.multiplier(),
            promotion_applied: best.promotion_name,
            new_balance: updated.current_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{insert_order, insert_promotion, memory_db};

    fn service(db: DatabaseConnection) -> EarningService {
        let config = LoyaltyConfig::default();
        let promotions = PromotionService::new(db.clone(), config.clone());
        EarningService::new(db, config, promotions)
    }

    #[test]
    fn base_points_truncate() {
        let db = DatabaseConnection::Disconnected;
        let svc = service(db);
        assert_eq!(svc.base_points(9_999), 9);
        assert_eq!(svc.base_points(10_000), 10);
        assert_eq!(svc.base_points(999), 0);
    }

    #[tokio::test]
    async fn earns_without_promotion() {
        let db = memory_db().await;
        let order_id = insert_order(&db, 1, 9_999).await;
        let svc = service(db.clone());

        let result = svc.earn_points(1, order_id, 9_999, Utc::now()).await.unwrap();
        assert_eq!(result.base_points, 9);
        assert_eq!(result.points_earned, 9);
        assert_eq!(result.bonus_multiplier, 1.0);
        assert!(result.promotion_applied.is_none());
        assert_eq!(result.new_balance, 9);

        let log = txs::Entity::find().all(&db).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].order_id, Some(order_id));
        assert_eq!(log[0].transaction_type, PointTransactionType::Earned);
    }

    #[tokio::test]
    async fn promotion_multiplies_and_is_recorded() {
        let db = memory_db().await;
        let now = Utc::now();
        let promo = insert_promotion(&db, "Double Points", 20_000, now, None).await;
        let order_id = insert_order(&db, 1, 10_000).await;
        let svc = service(db.clone());

        let result = svc.earn_points(1, order_id, 10_000, now).await.unwrap();
        assert_eq!(result.base_points, 10);
        assert_eq!(result.points_earned, 20);
        assert_eq!(result.bonus_multiplier, 2.0);
        assert_eq!(result.promotion_applied.as_deref(), Some("Double Points"));

        let log = txs::Entity::find().all(&db).await.unwrap();
        assert_eq!(log[0].promotion_id, Some(promo.id));
        assert_eq!(log[0].promotion_name.as_deref(), Some("Double Points"));

        let row = points::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(row.total_points_earned, 20);
    }

    #[tokio::test]
    async fn second_earn_for_same_order_conflicts() {
        let db = memory_db().await;
        let order_id = insert_order(&db, 1, 10_000).await;
        let svc = service(db.clone());

        svc.earn_points(1, order_id, 10_000, Utc::now()).await.unwrap();
        let err = svc
            .earn_points(1, order_id, 10_000, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let row = points::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(row.current_balance, 10);
        assert_eq!(txs::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn someone_elses_order_is_not_found() {
        let db = memory_db().await;
        let order_id = insert_order(&db, 1, 10_000).await;
        let svc = service(db);
        assert!(matches!(
            svc.earn_points(2, order_id, 10_000, Utc::now()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn tiny_order_earns_zero_and_leaves_no_trace() {
        let db = memory_db().await;
        let order_id = insert_order(&db, 1, 950).await;
        let svc = service(db.clone());

        let result = svc.earn_points(1, order_id, 950, Utc::now()).await.unwrap();
        assert_eq!(result.points_earned, 0);
        assert_eq!(result.new_balance, 0);
        assert_eq!(txs::Entity::find().count(&db).await.unwrap(), 0);
        assert!(points::Entity::find().one(&db).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn credited_total_is_capped_at_the_recorded_order() {
        let db = memory_db().await;
        let order_id = insert_order(&db, 1, 10_000).await;
        let svc = service(db.clone());

        let result = svc
            .earn_points(1, order_id, 5_000_000, Utc::now())
            .await
            .unwrap();
        assert_eq!(result.base_points, 10);
        assert_eq!(result.points_earned, 10);
    }

    #[tokio::test]
    async fn oversized_total_under_promotion_is_rejected() {
        let db = memory_db().await;
        let now = Utc::now();
        insert_promotion(&db, "Double Points", 20_000, now, None).await;
        let order_id = insert_order(&db, 1, i64::MAX).await;
        let config = LoyaltyConfig {
            points_divisor_cents: 1,
            ..LoyaltyConfig::default()
        };
        let promotions = PromotionService::new(db.clone(), config.clone());
        let svc = EarningService::new(db.clone(), config, promotions);

        let err = svc.earn_points(1, order_id, i64::MAX, now).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(txs::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unique_index_backs_up_the_earn_once_check() {
        let db = memory_db().await;
        let order_id = insert_order(&db, 1, 10_000).await;
        let now = Utc::now();

        let mut first = NewTransaction::new(1, 10, PointTransactionType::Earned);
        first.order_id = Some(order_id);
        append_earned(&db, first, now).await.unwrap();

        let mut second = NewTransaction::new(1, 10, PointTransactionType::Earned);
        second.order_id = Some(order_id);
        let err = append_earned(&db, second, now).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Other transaction types may reference the same order.
        let mut bonus = NewTransaction::new(1, 5, PointTransactionType::Bonus);
        bonus.order_id = Some(order_id);
        append_earned(&db, bonus, now).await.unwrap();
    }

    #[tokio::test]
    async fn ledger_sum_matches_balance_after_earn_and_redeem() {
        use crate::database::test_support::insert_reward;
        use crate::entities::RewardType;
        use crate::services::{CouponService, RedemptionService};
        use sea_orm::{QuerySelect, sea_query::Expr};

        let db = memory_db().await;
        let config = LoyaltyConfig::default();
        let svc = service(db.clone());
        let redemptions = RedemptionService::new(
            db.clone(),
            config.clone(),
            CouponService::new(db.clone(), config),
        );
        let reward = insert_reward(&db, "Free Drink", RewardType::FreeProduct, 15, None).await;
        let now = Utc::now();

        for total in [10_000, 25_000, 4_000] {
            let order_id = insert_order(&db, 1, total).await;
            svc.earn_points(1, order_id, total, now).await.unwrap();
        }
        redemptions.redeem(1, reward.id, now).await.unwrap();
        redemptions.redeem(1, reward.id, now).await.unwrap();
        let order_id = insert_order(&db, 1, 12_000).await;
        svc.earn_points(1, order_id, 12_000, now).await.unwrap();

        let sum: Option<i64> = txs::Entity::find()
            .select_only()
            .column_as(Expr::col(txs::Column::Points).sum(), "total")
            .filter(txs::Column::UserId.eq(1))
            .into_tuple::<Option<i64>>()
            .one(&db)
            .await
            .unwrap()
            .flatten();
        let row = points::Entity::find().one(&db).await.unwrap().unwrap();
        // 10 + 25 + 4 - 15 - 15 + 12
        assert_eq!(row.current_balance, 21);
        assert_eq!(sum, Some(row.current_balance));
        assert_eq!(row.total_points_earned, 51);
    }
}
