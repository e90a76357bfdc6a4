use crate::config::LoyaltyConfig;
use crate::entities::promotion_entity::{self as promotions, MULTIPLIER_SCALE};
use crate::error::{AppError, AppResult};
use crate::models::{BestMultiplier, CreatePromotionRequest, PromotionResponse};
use chrono::{DateTime, Datelike, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set,
};

#[derive(Clone)]
pub struct PromotionService {
    pool: DatabaseConnection,
    config: LoyaltyConfig,
}

impl PromotionService {
    pub fn new(pool: DatabaseConnection, config: LoyaltyConfig) -> Self {
        Self { pool, config }
    }

    /// Weekday (0 = Sunday) of `now` at the configured local offset.
    pub fn local_weekday(&self, now: DateTime<Utc>) -> u32 {
        let local = now + Duration::minutes(self.config.utc_offset_minutes as i64);
        local.weekday().num_days_from_sunday()
    }

    /// Promotions in effect at `now`, highest multiplier first.
    pub async fn active_promotions(&self, now: DateTime<Utc>) -> AppResult<Vec<promotions::Model>> {
        Ok(self.active_promotions_in(&self.pool, now).await?)
    }

    pub async fn best_multiplier(&self, now: DateTime<Utc>) -> AppResult<BestMultiplier> {
        Ok(self.best_multiplier_in(&self.pool, now).await?)
    }

    pub(crate) async fn active_promotions_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        now: DateTime<Utc>,
    ) -> Result<Vec<promotions::Model>, DbErr> {
        let weekday = self.local_weekday(now);

        // Window filtering happens in SQL, the weekday set is checked on the model.
        let mut list = promotions::Entity::find()
            .filter(promotions::Column::IsActive.eq(true))
            .filter(promotions::Column::StartDate.lte(now))
            .filter(promotions::Column::EndDate.gte(now))
            .order_by_desc(promotions::Column::MultiplierBp)
            .order_by_asc(promotions::Column::Id)
            .all(conn)
            .await?;

        list.retain(|p| p.applies_at(now, weekday));
        list.dedup_by_key(|p| p.id);
        Ok(list)
    }

    /// Highest multiplier wins; ties go to the lowest id.
    pub(crate) async fn best_multiplier_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        now: DateTime<Utc>,
    ) -> Result<BestMultiplier, DbErr> {
        let active = self.active_promotions_in(conn, now).await?;
        Ok(active
            .first()
            .map(BestMultiplier::from_promotion)
            .unwrap_or_else(BestMultiplier::none))
    }

    pub async fn list_all(&self) -> AppResult<Vec<PromotionResponse>> {
        let list = promotions::Entity::find()
            .order_by_desc(promotions::Column::StartDate)
            .order_by_asc(promotions::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn create_promotion(
        &self,
        request: CreatePromotionRequest,
    ) -> AppResult<PromotionResponse> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Promotion name is required".to_string(),
            ));
        }
        if !request.multiplier.is_finite() || request.multiplier < 1.0 {
            return Err(AppError::ValidationError(
                "Multiplier must be at least 1.0".to_string(),
            ));
        }
        if request.end_date < request.start_date {
            return Err(AppError::ValidationError(
                "Promotion ends before it starts".to_string(),
            ));
        }
        if request.applicable_days.is_some_and(|d| d.is_empty()) {
            return Err(AppError::ValidationError(
                "applicable_days must list at least one weekday".to_string(),
            ));
        }

        let now = Utc::now();
        let multiplier_bp = (request.multiplier * MULTIPLIER_SCALE as f64).round() as i32;
        let created = promotions::ActiveModel {
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            multiplier_bp: Set(multiplier_bp),
            start_date: Set(request.start_date),
            end_date: Set(request.end_date),
            is_active: Set(request.is_active.unwrap_or(true)),
            applicable_days: Set(request.applicable_days.map(|d| d.mask())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Promotion created: id={} name={} multiplier={}",
            created.id,
            created.name,
            created.multiplier()
        );
        Ok(created.into())
    }

    pub async fn deactivate(&self, promotion_id: i64) -> AppResult<PromotionResponse> {
        let promotion = promotions::Entity::find_by_id(promotion_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Promotion not found".to_string()))?;

        let mut am = promotion.into_active_model();
        am.is_active = Set(false);
        am.updated_at = Set(Utc::now());
        let updated = am.update(&self.pool).await?;
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{insert_promotion, memory_db};
    use chrono::TimeZone;

    // Saturday
    fn saturday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn no_promotion_means_identity_multiplier() {
        let db = memory_db().await;
        let svc = PromotionService::new(db, LoyaltyConfig::default());
        let best = svc.best_multiplier(saturday_noon()).await.unwrap();
        assert_eq!(best, BestMultiplier::none());
    }

    #[tokio::test]
    async fn highest_multiplier_wins() {
        let db = memory_db().await;
        let now = saturday_noon();
        insert_promotion(&db, "Happy Hour", 15_000, now, None).await;
        insert_promotion(&db, "Double Points", 20_000, now, None).await;

        let svc = PromotionService::new(db, LoyaltyConfig::default());
        let best = svc.best_multiplier(now).await.unwrap();
        assert_eq!(best.multiplier(), 2.0);
        assert_eq!(best.promotion_name.as_deref(), Some("Double Points"));

        let active = svc.active_promotions(now).await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].name, "Double Points");
    }

    #[tokio::test]
    async fn ties_go_to_lowest_id() {
        let db = memory_db().await;
        let now = saturday_noon();
        let first = insert_promotion(&db, "First", 20_000, now, None).await;
        insert_promotion(&db, "Second", 20_000, now, None).await;

        let svc = PromotionService::new(db, LoyaltyConfig::default());
        let best = svc.best_multiplier(now).await.unwrap();
        assert_eq!(best.promotion_id, Some(first.id));
    }

    #[tokio::test]
    async fn weekday_excluded_promotion_is_ignored() {
        let db = memory_db().await;
        let now = saturday_noon();
        insert_promotion(&db, "Midweek Treat", 30_000, now, Some(&[2, 3])).await;
        insert_promotion(&db, "Weekend", 12_000, now, Some(&[0, 6])).await;

        let svc = PromotionService::new(db, LoyaltyConfig::default());
        let active = svc.active_promotions(now).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Weekend");
    }

    #[tokio::test]
    async fn utc_offset_moves_the_weekday() {
        let db = memory_db().await;
        // 23:30 UTC Saturday is already Sunday at UTC+1
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 23, 30, 0).unwrap();
        insert_promotion(&db, "Sunday Brunch", 20_000, now, Some(&[0])).await;

        let utc = PromotionService::new(db.clone(), LoyaltyConfig::default());
        assert_eq!(utc.best_multiplier(now).await.unwrap().promotion_id, None);

        let shifted = PromotionService::new(
            db,
            LoyaltyConfig {
                utc_offset_minutes: 60,
                ..LoyaltyConfig::default()
            },
        );
        assert_eq!(
            shifted
                .best_multiplier(now)
                .await
                .unwrap()
                .promotion_name
                .as_deref(),
            Some("Sunday Brunch")
        );
    }

    #[tokio::test]
    async fn create_validates_multiplier_and_window() {
        let db = memory_db().await;
        let svc = PromotionService::new(db, LoyaltyConfig::default());
        let now = saturday_noon();

        let too_small = svc
            .create_promotion(CreatePromotionRequest {
                name: "Half".into(),
                description: None,
                multiplier: 0.5,
                start_date: now,
                end_date: now + Duration::days(1),
                is_active: None,
                applicable_days: None,
            })
            .await;
        assert!(matches!(too_small, Err(AppError::ValidationError(_))));

        let backwards = svc
            .create_promotion(CreatePromotionRequest {
                name: "Backwards".into(),
                description: None,
                multiplier: 2.0,
                start_date: now,
                end_date: now - Duration::days(1),
                is_active: None,
                applicable_days: None,
            })
            .await;
        assert!(matches!(backwards, Err(AppError::ValidationError(_))));

        let ok = svc
            .create_promotion(CreatePromotionRequest {
                name: "Triple Tuesday".into(),
                description: Some("3x on Tuesdays".into()),
                multiplier: 3.0,
                start_date: now,
                end_date: now + Duration::days(30),
                is_active: None,
                applicable_days: Some(crate::entities::WeekdaySet::from_days(&[2]).unwrap()),
            })
            .await
            .unwrap();
        assert_eq!(ok.multiplier, 3.0);
        assert_eq!(ok.applicable_days, Some(vec![2]));

        let deactivated = svc.deactivate(ok.id).await.unwrap();
        assert!(!deactivated.is_active);
    }
}
