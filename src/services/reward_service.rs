use crate::entities::{RewardType, menu_item_entity as menu_items, reward_entity as rewards};
use crate::error::{AppError, AppResult};
use crate::models::{CreateRewardRequest, RewardResponse};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;

/// Condition form of `rewards::Model::is_available_at`.
fn available_at(now: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(rewards::Column::IsActive.eq(true))
        .add(
            Condition::any()
                .add(rewards::Column::ValidFrom.is_null())
                .add(rewards::Column::ValidFrom.lte(now)),
        )
        .add(
            Condition::any()
                .add(rewards::Column::ValidUntil.is_null())
                .add(rewards::Column::ValidUntil.gte(now)),
        )
}

/// Loads a reward only if it is redeemable at `now`.
pub(crate) async fn find_available_reward<C: ConnectionTrait>(
    conn: &C,
    reward_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<rewards::Model>, DbErr> {
    rewards::Entity::find_by_id(reward_id)
        .filter(available_at(now))
        .one(conn)
        .await
}

pub(crate) async fn menu_item_name<C: ConnectionTrait>(
    conn: &C,
    menu_item_id: Option<i64>,
) -> Result<Option<String>, DbErr> {
    let Some(id) = menu_item_id else {
        return Ok(None);
    };
    Ok(menu_items::Entity::find_by_id(id)
        .one(conn)
        .await?
        .map(|m| m.name))
}

/// Read-only reward catalog plus the admin entry points that feed it.
#[derive(Clone)]
pub struct RewardService {
    pool: DatabaseConnection,
}

impl RewardService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Rewards redeemable at `now`, cheapest first. With a balance every entry
    /// carries `can_afford`.
    pub async fn list_available(
        &self,
        now: DateTime<Utc>,
        balance: Option<i64>,
    ) -> AppResult<Vec<RewardResponse>> {
        let list = rewards::Entity::find()
            .filter(available_at(now))
            .order_by_asc(rewards::Column::PointsCost)
            .order_by_asc(rewards::Column::Id)
            .all(&self.pool)
            .await?;

        let item_ids: Vec<i64> = list
            .iter()
            .filter(|r| r.reward_type == RewardType::FreeProduct)
            .filter_map(|r| r.menu_item_id)
            .collect();
        let names: HashMap<i64, String> = if item_ids.is_empty() {
            HashMap::new()
        } else {
            menu_items::Entity::find()
                .filter(menu_items::Column::Id.is_in(item_ids))
                .all(&self.pool)
                .await?
                .into_iter()
                .map(|m| (m.id, m.name))
                .collect()
        };

        Ok(list
            .into_iter()
            .map(|reward| {
                let cost = reward.points_cost;
                let item_id = reward.menu_item_id;
                let mut response = RewardResponse::from(reward);
                response.menu_item_name = item_id.and_then(|id| names.get(&id).cloned());
                response.can_afford = balance.map(|b| b >= cost);
                response
            })
            .collect())
    }

    pub async fn create_reward(&self, request: CreateRewardRequest) -> AppResult<RewardResponse> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Reward name is required".to_string(),
            ));
        }
        if request.points_cost <= 0 {
            return Err(AppError::ValidationError(
                "points_cost must be positive".to_string(),
            ));
        }
        match request.reward_type {
            RewardType::FixedDiscount => {
                if !request.discount_value.is_some_and(|v| v > 0) {
                    return Err(AppError::ValidationError(
                        "Fixed discount rewards need a positive discount_value".to_string(),
                    ));
                }
            }
            RewardType::PercentageDiscount => {
                if !request.discount_value.is_some_and(|v| (1..=100).contains(&v)) {
                    return Err(AppError::ValidationError(
                        "Percentage rewards need a discount_value between 1 and 100".to_string(),
                    ));
                }
            }
            RewardType::FreeProduct => {
                let Some(item_id) = request.menu_item_id else {
                    return Err(AppError::ValidationError(
                        "Free product rewards need a menu_item_id".to_string(),
                    ));
                };
                if menu_items::Entity::find_by_id(item_id)
                    .one(&self.pool)
                    .await?
                    .is_none()
                {
                    return Err(AppError::NotFound("Menu item not found".to_string()));
                }
            }
        }
        if let (Some(from), Some(until)) = (request.valid_from, request.valid_until)
            && until < from
        {
            return Err(AppError::ValidationError(
                "valid_until is before valid_from".to_string(),
            ));
        }

        let now = Utc::now();
        let created = rewards::ActiveModel {
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            reward_type: Set(request.reward_type),
            points_cost: Set(request.points_cost),
            discount_value: Set(request.discount_value),
            menu_item_id: Set(request.menu_item_id),
            min_order_value: Set(request.min_order_value.unwrap_or(0).max(0)),
            valid_from: Set(request.valid_from),
            valid_until: Set(request.valid_until),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Reward created: id={} name={} cost={}",
            created.id,
            created.name,
            created.points_cost
        );
        let item_name = menu_item_name(&self.pool, created.menu_item_id).await?;
        let mut response = RewardResponse::from(created);
        response.menu_item_name = item_name;
        Ok(response)
    }

    pub async fn deactivate(&self, reward_id: i64) -> AppResult<RewardResponse> {
        let reward = rewards::Entity::find_by_id(reward_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Reward not found".to_string()))?;

        let mut am = reward.into_active_model();
        am.is_active = Set(false);
        am.updated_at = Set(Utc::now());
        Ok(am.update(&self.pool).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{insert_menu_item, insert_reward, memory_db};
    use chrono::Duration;

    #[tokio::test]
    async fn lists_available_cheapest_first_with_affordability() {
        let db = memory_db().await;
        insert_reward(&db, "$5 off", RewardType::FixedDiscount, 50, Some(500)).await;
        insert_reward(&db, "10% off", RewardType::PercentageDiscount, 30, Some(10)).await;
        let retired = insert_reward(&db, "Old deal", RewardType::FixedDiscount, 5, Some(100)).await;

        let svc = RewardService::new(db);
        svc.deactivate(retired.id).await.unwrap();

        let list = svc.list_available(Utc::now(), Some(40)).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "10% off");
        assert_eq!(list[0].can_afford, Some(true));
        assert_eq!(list[1].name, "$5 off");
        assert_eq!(list[1].can_afford, Some(false));

        let anonymous = svc.list_available(Utc::now(), None).await.unwrap();
        assert!(anonymous.iter().all(|r| r.can_afford.is_none()));
    }

    #[tokio::test]
    async fn validity_window_is_respected() {
        let db = memory_db().await;
        let expired = insert_reward(&db, "Summer", RewardType::FixedDiscount, 10, Some(100)).await;
        let mut am = expired.into_active_model();
        am.valid_until = Set(Some(Utc::now() - Duration::days(1)));
        am.update(&db).await.unwrap();

        let upcoming = insert_reward(&db, "Winter", RewardType::FixedDiscount, 10, Some(100)).await;
        let mut am = upcoming.into_active_model();
        am.valid_from = Set(Some(Utc::now() + Duration::days(1)));
        am.update(&db).await.unwrap();

        let svc = RewardService::new(db);
        assert!(svc.list_available(Utc::now(), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn free_product_rewards_are_named_after_menu_item() {
        let db = memory_db().await;
        let item = insert_menu_item(&db, "Garlic Naan").await;
        let svc = RewardService::new(db);

        let created = svc
            .create_reward(CreateRewardRequest {
                name: "Free naan".into(),
                description: None,
                reward_type: RewardType::FreeProduct,
                points_cost: 25,
                discount_value: None,
                menu_item_id: Some(item.id),
                min_order_value: None,
                valid_from: None,
                valid_until: None,
            })
            .await
            .unwrap();
        assert_eq!(created.menu_item_name.as_deref(), Some("Garlic Naan"));

        let list = svc.list_available(Utc::now(), Some(100)).await.unwrap();
        assert_eq!(list[0].menu_item_name.as_deref(), Some("Garlic Naan"));
    }

    #[tokio::test]
    async fn create_rejects_inconsistent_rewards() {
        let db = memory_db().await;
        let svc = RewardService::new(db);

        let no_value = svc
            .create_reward(CreateRewardRequest {
                name: "Mystery".into(),
                description: None,
                reward_type: RewardType::PercentageDiscount,
                points_cost: 25,
                discount_value: Some(150),
                menu_item_id: None,
                min_order_value: None,
                valid_from: None,
                valid_until: None,
            })
            .await;
        assert!(matches!(no_value, Err(AppError::ValidationError(_))));

        let missing_item = svc
            .create_reward(CreateRewardRequest {
                name: "Free dessert".into(),
                description: None,
                reward_type: RewardType::FreeProduct,
                points_cost: 25,
                discount_value: None,
                menu_item_id: Some(404),
                min_order_value: None,
                valid_from: None,
                valid_until: None,
            })
            .await;
        assert!(matches!(missing_item, Err(AppError::NotFound(_))));
    }
}
