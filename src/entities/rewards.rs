use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    #[sea_orm(string_value = "fixed_discount")]
    FixedDiscount,
    #[sea_orm(string_value = "percentage_discount")]
    PercentageDiscount,
    #[sea_orm(string_value = "free_product")]
    FreeProduct,
}

impl RewardType {
    /// Discount rewards mint a coupon code when redeemed.
    pub fn mints_coupon(&self) -> bool {
        matches!(
            self,
            RewardType::FixedDiscount | RewardType::PercentageDiscount
        )
    }
}

impl std::fmt::Display for RewardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewardType::FixedDiscount => write!(f, "fixed_discount"),
            RewardType::PercentageDiscount => write!(f, "percentage_discount"),
            RewardType::FreeProduct => write!(f, "free_product"),
        }
    }
}

/// Redeemable reward in the catalog.
/// - discount_value: cents for fixed_discount, whole percent for percentage_discount
/// - min_order_value: cents
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "rewards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub reward_type: RewardType,
    pub points_cost: i64,
    pub discount_value: Option<i64>,
    pub menu_item_id: Option<i64>,
    pub min_order_value: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.valid_from.is_none_or(|from| from <= now)
            && self.valid_until.is_none_or(|until| until >= now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
