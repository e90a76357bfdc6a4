use crate::config::LoyaltyConfig;
use crate::entities::{DiscountType, RewardType, coupon_code_entity as coupons, reward_entity};
use crate::error::{AppError, AppResult, CouponRejection};
use crate::models::{CouponQuoteRequest, CouponQuoteResponse};
use crate::utils::{generate_coupon_code, to_cents};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, QueryFilter, Set, SqlErr, TransactionTrait,
};

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Counts one use of a coupon and, in the same statement, turns it off when that
/// use reaches max_uses. The WHERE clause is the same usability predicate as
/// `check_usable`, so two concurrent consumers of the last use cannot both
/// succeed and a coupon outside its window is never counted.
pub(crate) async fn consume_coupon<C: ConnectionTrait>(
    conn: &C,
    coupon_code: &str,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let exhausted_after_use = Condition::all()
        .add(coupons::Column::MaxUses.is_not_null())
        .add(
            Expr::expr(Expr::col(coupons::Column::CurrentUses).add(1))
                .gte(Expr::col(coupons::Column::MaxUses)),
        );

    let result = coupons::Entity::update_many()
        .col_expr(
            coupons::Column::CurrentUses,
            Expr::col(coupons::Column::CurrentUses).add(1),
        )
        .col_expr(
            coupons::Column::IsActive,
            Expr::case(exhausted_after_use, Expr::val(false))
                .finally(Expr::col(coupons::Column::IsActive))
                .into(),
        )
        .filter(coupons::Column::CouponCode.eq(coupon_code))
        .filter(coupons::Column::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(coupons::Column::MaxUses.is_null())
                .add(Expr::col(coupons::Column::CurrentUses).lt(Expr::col(coupons::Column::MaxUses))),
        )
        .filter(
            Condition::any()
                .add(coupons::Column::StartDate.is_null())
                .add(coupons::Column::StartDate.lte(now)),
        )
        .filter(
            Condition::any()
                .add(coupons::Column::EndDate.is_null())
                .add(coupons::Column::EndDate.gte(now)),
        )
        .exec(conn)
        .await?;

    if result.rows_affected == 1 {
        return Ok(());
    }

    // Nothing updated: report why.
    let coupon = coupons::Entity::find()
        .filter(coupons::Column::CouponCode.eq(coupon_code))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Coupon code not found".to_string()))?;
    let reason = coupon
        .check_usable(now)
        .err()
        .unwrap_or(CouponRejection::CouponExhausted);
    Err(AppError::CouponRejected(reason))
}

#[derive(Clone)]
pub struct CouponService {
    pool: DatabaseConnection,
    config: LoyaltyConfig,
    generate_code: fn(usize) -> String,
}

impl CouponService {
    pub fn new(pool: DatabaseConnection, config: LoyaltyConfig) -> Self {
        Self {
            pool,
            config,
            generate_code: generate_coupon_code,
        }
    }

    #[cfg(test)]
    pub fn with_code_generator(mut self, generate_code: fn(usize) -> String) -> Self {
        self.generate_code = generate_code;
        self
    }

    /// Checkout-time check. Read only: usage is counted when the order consumes it.
    pub async fn validate(&self, code: &str, now: DateTime<Utc>) -> AppResult<coupons::Model> {
        let coupon = self.find_by_code(code).await?;
        coupon.check_usable(now).map_err(AppError::CouponRejected)?;
        Ok(coupon)
    }

    /// Prices a coupon typed into the order form against a restaurant and order total.
    /// Coupons scoped to another restaurant are reported as not found.
    pub async fn quote(
        &self,
        request: CouponQuoteRequest,
        now: DateTime<Utc>,
    ) -> AppResult<CouponQuoteResponse> {
        let order_total = to_cents(request.order_total)?;
        let coupon = self.find_by_code(&request.code).await?;
        if !coupon.is_valid_for_restaurant(request.restaurant_id) {
            return Err(AppError::NotFound("Coupon code not found".to_string()));
        }
        coupon.check_usable(now).map_err(AppError::CouponRejected)?;
        if order_total < coupon.min_order_value {
            return Err(AppError::ValidationError(format!(
                "Minimum order value of {} cents not met",
                coupon.min_order_value
            )));
        }

        let discount_amount = coupon.discount_for(order_total);
        Ok(CouponQuoteResponse {
            coupon: coupon.into(),
            order_total,
            discount_amount,
            final_total: order_total - discount_amount,
        })
    }

    /// Usage count for a coupon applied directly by the order placement flow,
    /// which calls this in-process once the order is committed. No route.
    pub async fn consume(&self, code: &str, now: DateTime<Utc>) -> AppResult<()> {
        let code = normalize(code);
        consume_coupon(&self.pool, &code, now).await?;
        log::info!("Coupon consumed: code={code}");
        Ok(())
    }

    /// Mints the single-use coupon for a discount reward inside the redemption
    /// transaction. Each attempt runs in a savepoint so a code collision does not
    /// poison the outer transaction.
    pub(crate) async fn mint_for_reward(
        &self,
        txn: &DatabaseTransaction,
        reward: &reward_entity::Model,
        now: DateTime<Utc>,
    ) -> AppResult<coupons::Model> {
        let discount_type = match reward.reward_type {
            RewardType::FixedDiscount => DiscountType::Fixed,
            RewardType::PercentageDiscount => DiscountType::Percentage,
            RewardType::FreeProduct => {
                return Err(AppError::InternalError(
                    "Free product rewards do not mint coupons".to_string(),
                ));
            }
        };

        let attempts = self.config.coupon_mint_attempts.max(1);
        let mut last_err = None;
        for attempt in 1..=attempts {
            let code = (self.generate_code)(self.config.coupon_code_length);
            let savepoint = txn.begin().await?;
            let inserted = coupons::ActiveModel {
                coupon_code: Set(code.clone()),
                description: Set(Some(format!("Reward redemption: {}", reward.name))),
                discount_type: Set(discount_type),
                discount_value: Set(reward.discount_value.unwrap_or(0)),
                min_order_value: Set(reward.min_order_value),
                max_uses: Set(Some(1)),
                current_uses: Set(0),
                is_active: Set(true),
                start_date: Set(None),
                end_date: Set(None),
                restaurant_id: Set(None),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&savepoint)
            .await;

            match inserted {
                Ok(coupon) => {
                    savepoint.commit().await?;
                    log::info!(
                        "Coupon minted: code={} reward={}",
                        coupon.coupon_code,
                        reward.id
                    );
                    return Ok(coupon);
                }
                Err(err) if is_unique_violation(&err) => {
                    savepoint.rollback().await?;
                    log::warn!("Coupon code collision on attempt {attempt}/{attempts}: {code}");
                    last_err = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        log::error!(
            "Could not mint a unique coupon code for reward {} after {attempts} attempts",
            reward.id
        );
        Err(last_err.map(AppError::from).unwrap_or_else(|| {
            AppError::InternalError("Coupon code generation failed".to_string())
        }))
    }

    async fn find_by_code(&self, code: &str) -> AppResult<coupons::Model> {
        coupons::Entity::find()
            .filter(coupons::Column::CouponCode.eq(normalize(code)))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Coupon code not found".to_string()))
    }
}

/// Codes are stored uppercase; lookups tolerate surrounding spaces and lowercase input.
fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{insert_coupon, insert_reward, memory_db};
    use chrono::Duration;
    use sea_orm::IntoActiveModel;

    fn service(db: DatabaseConnection) -> CouponService {
        CouponService::new(db, LoyaltyConfig::default())
    }

    #[tokio::test]
    async fn validate_reports_each_rejection() {
        let db = memory_db().await;
        let now = Utc::now();
        let svc = service(db.clone());

        assert!(matches!(
            svc.validate("NOPE1234", now).await,
            Err(AppError::NotFound(_))
        ));

        let fresh = insert_coupon(&db, "WELCOME1", Some(2), None).await;
        assert_eq!(svc.validate("welcome1", now).await.unwrap().id, fresh.id);

        let mut am = fresh.clone().into_active_model();
        am.start_date = Set(Some(now + Duration::days(1)));
        am.update(&db).await.unwrap();
        assert!(matches!(
            svc.validate("WELCOME1", now).await,
            Err(AppError::CouponRejected(CouponRejection::CouponNotStarted))
        ));

        let mut am = fresh.clone().into_active_model();
        am.start_date = Set(None);
        am.end_date = Set(Some(now - Duration::days(1)));
        am.update(&db).await.unwrap();
        assert!(matches!(
            svc.validate("WELCOME1", now).await,
            Err(AppError::CouponRejected(CouponRejection::CouponExpired))
        ));

        let mut am = fresh.into_active_model();
        am.end_date = Set(None);
        am.is_active = Set(false);
        am.update(&db).await.unwrap();
        assert!(matches!(
            svc.validate("WELCOME1", now).await,
            Err(AppError::CouponRejected(CouponRejection::CouponInactive))
        ));
    }

    #[tokio::test]
    async fn consume_flips_inactive_on_last_use() {
        let db = memory_db().await;
        let now = Utc::now();
        insert_coupon(&db, "TWICE000", Some(2), None).await;
        let svc = service(db.clone());

        svc.consume("TWICE000", now).await.unwrap();
        let after_first = svc.validate("TWICE000", now).await.unwrap();
        assert_eq!(after_first.current_uses, 1);
        assert!(after_first.is_active);

        svc.consume("TWICE000", now).await.unwrap();
        let stored = coupons::Entity::find()
            .filter(coupons::Column::CouponCode.eq("TWICE000"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.current_uses, 2);
        assert!(!stored.is_active);

        let third = svc.consume("TWICE000", now).await;
        assert!(matches!(
            third,
            Err(AppError::CouponRejected(CouponRejection::CouponExhausted))
        ));
    }

    #[tokio::test]
    async fn unlimited_coupon_stays_active() {
        let db = memory_db().await;
        let now = Utc::now();
        insert_coupon(&db, "FOREVER1", None, None).await;
        let svc = service(db);

        for _ in 0..3 {
            svc.consume("FOREVER1", now).await.unwrap();
        }
        let coupon = svc.validate("FOREVER1", now).await.unwrap();
        assert_eq!(coupon.current_uses, 3);
        assert!(coupon.is_active);
    }

    #[tokio::test]
    async fn consume_skips_coupons_outside_their_window() {
        let db = memory_db().await;
        let now = Utc::now();
        let svc = service(db.clone());

        let expired = insert_coupon(&db, "LASTWEEK", Some(5), None).await;
        let mut am = expired.into_active_model();
        am.end_date = Set(Some(now - Duration::days(3)));
        am.update(&db).await.unwrap();

        let early = insert_coupon(&db, "NEXTWEEK", Some(5), None).await;
        let mut am = early.into_active_model();
        am.start_date = Set(Some(now + Duration::days(3)));
        am.update(&db).await.unwrap();

        assert!(matches!(
            svc.consume("LASTWEEK", now).await,
            Err(AppError::CouponRejected(CouponRejection::CouponExpired))
        ));
        assert!(matches!(
            svc.consume("nextweek", now).await,
            Err(AppError::CouponRejected(CouponRejection::CouponNotStarted))
        ));

        let stored = coupons::Entity::find().all(&db).await.unwrap();
        assert!(stored.iter().all(|c| c.current_uses == 0 && c.is_active));
    }

    #[tokio::test]
    async fn quote_applies_scope_minimum_and_discount() {
        let db = memory_db().await;
        let now = Utc::now();
        // 10% off, minimum 15.00, only at restaurant 2
        insert_coupon(&db, "CURRY10", Some(100), Some(2)).await;
        let svc = service(db);

        let elsewhere = svc
            .quote(
                CouponQuoteRequest {
                    code: "CURRY10".into(),
                    restaurant_id: 1,
                    order_total: 40.0,
                },
                now,
            )
            .await;
        assert!(matches!(elsewhere, Err(AppError::NotFound(_))));

        let too_small = svc
            .quote(
                CouponQuoteRequest {
                    code: "CURRY10".into(),
                    restaurant_id: 2,
                    order_total: 12.5,
                },
                now,
            )
            .await;
        assert!(matches!(too_small, Err(AppError::ValidationError(_))));

        let quote = svc
            .quote(
                CouponQuoteRequest {
                    code: "curry10".into(),
                    restaurant_id: 2,
                    order_total: 42.35,
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(quote.order_total, 4235);
        assert_eq!(quote.discount_amount, 423);
        assert_eq!(quote.final_total, 3812);
        // quoting never counts a use
        assert_eq!(quote.coupon.current_uses, 0);
    }

    fn colliding_code(_len: usize) -> String {
        "TAKEN000".to_string()
    }

    #[tokio::test]
    async fn mint_gives_up_after_configured_attempts() {
        let db = memory_db().await;
        let now = Utc::now();
        insert_coupon(&db, "TAKEN000", Some(1), None).await;
        let reward = insert_reward(&db, "$3 off", RewardType::FixedDiscount, 30, Some(300)).await;
        let svc = service(db.clone()).with_code_generator(colliding_code);

        let txn = db.begin().await.unwrap();
        let err = svc.mint_for_reward(&txn, &reward, now).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
        txn.rollback().await.unwrap();

        let count = coupons::Entity::find().all(&db).await.unwrap().len();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn mint_creates_single_use_coupon_from_reward_terms() {
        let db = memory_db().await;
        let now = Utc::now();
        let reward =
            insert_reward(&db, "15% off", RewardType::PercentageDiscount, 80, Some(15)).await;
        let svc = service(db.clone());

        let txn = db.begin().await.unwrap();
        let coupon = svc.mint_for_reward(&txn, &reward, now).await.unwrap();
        txn.commit().await.unwrap();

        assert_eq!(coupon.coupon_code.len(), 8);
        assert_eq!(coupon.discount_type, DiscountType::Percentage);
        assert_eq!(coupon.discount_value, 15);
        assert_eq!(coupon.max_uses, Some(1));
        assert_eq!(coupon.current_uses, 0);
        assert!(coupon.is_active);
        assert!(coupon.end_date.is_none());
        assert_eq!(
            coupon.description.as_deref(),
            Some("Reward redemption: 15% off")
        );
    }
}
