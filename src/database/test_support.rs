//! In-memory SQLite database with the schema derived from the entities, plus
//! small fixtures for orders, promotions and rewards.

use crate::entities::{
    DiscountType, RewardType, WeekdaySet, coupon_code_entity as coupons,
    menu_item_entity as menu_items, order_entity as orders, point_transaction_entity as txs,
    promotion_entity as promotions, reward_entity as rewards,
    reward_redemption_entity as redemptions, user_points_entity as user_points,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    EntityTrait, Schema, Set,
};

pub async fn memory_db() -> DatabaseConnection {
    // A single connection keeps every query on the same in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);
    create(&db, &schema, user_points::Entity).await;
    create(&db, &schema, txs::Entity).await;
    create(&db, &schema, promotions::Entity).await;
    create(&db, &schema, rewards::Entity).await;
    create(&db, &schema, redemptions::Entity).await;
    create(&db, &schema, coupons::Entity).await;
    create(&db, &schema, orders::Entity).await;
    create(&db, &schema, menu_items::Entity).await;
    db.execute_unprepared(
        "CREATE UNIQUE INDEX idx_point_transactions_earned_order \
         ON point_transactions (order_id) WHERE transaction_type = 'earned'",
    )
    .await
    .unwrap();
    db
}

async fn create<E: EntityTrait>(db: &DatabaseConnection, schema: &Schema, entity: E) {
    let stmt = db
        .get_database_backend()
        .build(&schema.create_table_from_entity(entity));
    db.execute(stmt).await.unwrap();
}

pub async fn insert_order(db: &DatabaseConnection, user_id: i64, total_amount: i64) -> i64 {
    orders::ActiveModel {
        user_id: Set(user_id),
        restaurant_id: Set(1),
        total_amount: Set(total_amount),
        status: Set("completed".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn insert_promotion(
    db: &DatabaseConnection,
    name: &str,
    multiplier_bp: i32,
    now: DateTime<Utc>,
    days: Option<&[u8]>,
) -> promotions::Model {
    promotions::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        multiplier_bp: Set(multiplier_bp),
        start_date: Set(now - Duration::days(1)),
        end_date: Set(now + Duration::days(1)),
        is_active: Set(true),
        applicable_days: Set(days.map(|d| WeekdaySet::from_days(d).unwrap().mask())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_reward(
    db: &DatabaseConnection,
    name: &str,
    reward_type: RewardType,
    points_cost: i64,
    discount_value: Option<i64>,
) -> rewards::Model {
    let now = Utc::now();
    rewards::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        reward_type: Set(reward_type),
        points_cost: Set(points_cost),
        discount_value: Set(discount_value),
        menu_item_id: Set(None),
        min_order_value: Set(0),
        valid_from: Set(None),
        valid_until: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_menu_item(db: &DatabaseConnection, name: &str) -> menu_items::Model {
    menu_items::ActiveModel {
        restaurant_id: Set(1),
        name: Set(name.to_string()),
        price: Set(450),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_coupon(
    db: &DatabaseConnection,
    code: &str,
    max_uses: Option<i32>,
    restaurant_id: Option<i64>,
) -> coupons::Model {
    coupons::ActiveModel {
        coupon_code: Set(code.to_string()),
        description: Set(Some("Opening week".to_string())),
        discount_type: Set(DiscountType::Percentage),
        discount_value: Set(10),
        min_order_value: Set(1_500),
        max_uses: Set(max_uses),
        current_uses: Set(0),
        is_active: Set(true),
        start_date: Set(None),
        end_date: Set(None),
        restaurant_id: Set(restaurant_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Sets a user's balance directly, bypassing the ledger.
pub async fn seed_balance(db: &DatabaseConnection, user_id: i64, balance: i64) {
    user_points::ActiveModel {
        user_id: Set(user_id),
        total_points_earned: Set(balance),
        current_balance: Set(balance),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}
